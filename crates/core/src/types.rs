//! Gemeinsame Identifikationstypen fuer voxgate
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Laenge einer Session-ID in Bytes (hex-kodiert doppelt so lang)
pub const SESSION_ID_LAENGE: usize = 16;

/// Opake Session-ID (16 Zufallsbytes, fuer den Transport hex-kodiert)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId([u8; SESSION_ID_LAENGE]);

impl SessionId {
    /// Erzeugt eine neue zufaellige Session-ID aus dem Betriebssystem-RNG
    pub fn generate() -> Result<Self, rand::Error> {
        let mut bytes = [0u8; SESSION_ID_LAENGE];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SESSION_ID_LAENGE]) -> Self {
        Self(bytes)
    }

    /// Parst eine hex-kodierte Session-ID (Gross- und Kleinschreibung erlaubt)
    ///
    /// Gibt `None` zurueck wenn der String kein gueltiges Hex ist oder die
    /// Laenge nicht exakt 16 Bytes ergibt.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; SESSION_ID_LAENGE] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Kleingeschriebene Hex-Darstellung (32 Zeichen)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_ID_LAENGE] {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({})", self.to_hex())
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom("ungueltige Session-ID"))
    }
}

/// Eindeutige ID einer Streaming-Verbindung (nur fuer Logging und Tracing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}
