//! X25519 Key Exchange und Session-Key-Ableitung
//!
//! Ablauf pro Handshake:
//! 1. Server erzeugt ein frisches `KeyPair` (ephemer, nur fuer diesen Handshake)
//! 2. Mit dem oeffentlichen Schluessel des Clients entsteht das `SharedSecret`
//! 3. HKDF-SHA256 leitet daraus den 32-Byte `SessionKey` ab
//!
//! Der private Schluessel wird beim Austausch verbraucht und kann nur
//! einmal verwendet werden.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{SessionKey, KEY_SIZE, PUBLIC_KEY_SIZE};

/// Standard-Kontextlabel fuer die Session-Key-Ableitung
pub const STANDARD_KDF_LABEL: &[u8] = b"handshake";

/// Ephemeres X25519-Schluesselpaar
pub struct KeyPair {
    secret: Option<StaticSecret>,
    public_key: [u8; PUBLIC_KEY_SIZE],
}

impl KeyPair {
    /// Erzeugt ein frisches Schluesselpaar aus dem Betriebssystem-RNG
    pub fn generate() -> CryptoResult<Self> {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::SchluesselGenerierung(e.to_string()))?;

        let secret = StaticSecret::from(bytes);
        bytes.zeroize();

        let public_key = X25519PublicKey::from(&secret).to_bytes();
        Ok(Self {
            secret: Some(secret),
            public_key,
        })
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public_key
    }

    /// Berechnet das Shared Secret mit dem oeffentlichen Schluessel des Peers
    ///
    /// Der Peer-Schluessel muss exakt 32 Bytes lang sein. Punkte niedriger
    /// Ordnung (nicht-kontributiver Austausch) werden abgelehnt.
    /// Verbraucht den privaten Schluessel.
    pub fn derive_shared_secret(&mut self, peer_public_key: &[u8]) -> CryptoResult<SharedSecret> {
        let peer: [u8; PUBLIC_KEY_SIZE] = peer_public_key.try_into().map_err(|_| {
            CryptoError::UngueltigerPeerSchluessel(format!(
                "erwartet {PUBLIC_KEY_SIZE} Bytes, erhalten {}",
                peer_public_key.len()
            ))
        })?;

        let secret = self
            .secret
            .take()
            .ok_or_else(|| CryptoError::KeyExchange("Secret bereits verwendet".to_string()))?;

        let dh_output = secret.diffie_hellman(&X25519PublicKey::from(peer));
        if !dh_output.was_contributory() {
            tracing::debug!("Peer-Schluessel ist ein Punkt niedriger Ordnung");
            return Err(CryptoError::UngueltigerPeerSchluessel(
                "Punkt niedriger Ordnung".to_string(),
            ));
        }

        Ok(SharedSecret(dh_output.to_bytes()))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("verbraucht", &self.secret.is_none())
            .finish()
    }
}

/// Rohes X25519-Ergebnis, dient nur als Eingabe fuer die Key Derivation
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; KEY_SIZE]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// Leitet den Session-Key via HKDF-SHA256 ab (kein Salt, `label` als Info)
pub fn derive_session_key(shared: &SharedSecret, label: &[u8]) -> CryptoResult<SessionKey> {
    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut okm = [0u8; KEY_SIZE];
    hk.expand(label, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let key = SessionKey::from_bytes(okm);
    okm.zeroize();
    Ok(key)
}

/// HKDF-basierte Key Derivation (allgemein verwendbar)
pub fn hkdf_derive(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    len: usize,
) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
