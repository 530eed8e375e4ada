//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Zufallsquelle oder Parameter-Erzeugung fehlgeschlagen
    #[error("Schluessel-Generierung fehlgeschlagen: {0}")]
    SchluesselGenerierung(String),

    /// Oeffentlicher Schluessel des Peers ist fehlerhaft oder ausserhalb des Wertebereichs
    #[error("Ungueltiger Peer-Schluessel: {0}")]
    UngueltigerPeerSchluessel(String),

    #[error("Key-Exchange fehlgeschlagen: {0}")]
    KeyExchange(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    /// Frame zu kurz, falsch ausgerichtet, Padding oder Tag ungueltig
    #[error("Ungueltiger Frame: {0}")]
    UngueltigerFrame(String),
}

impl CryptoError {
    pub fn frame(msg: impl Into<String>) -> Self {
        Self::UngueltigerFrame(msg.into())
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
