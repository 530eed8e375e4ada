//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Groesse des symmetrischen Session-Schluessels (AES-256)
pub const KEY_SIZE: usize = 32;

/// Groesse eines oeffentlichen X25519-Schluessels
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Groesse des Initialisierungsvektors pro Frame
pub const IV_SIZE: usize = 16;

/// Blockgroesse von AES
pub const BLOCK_SIZE: usize = 16;

/// Groesse des HMAC-SHA256-Tags (nur bei aktivierter Frame-Authentifizierung)
pub const TAG_SIZE: usize = 32;

/// Symmetrischer Session-Schluessel (32 Bytes, wird beim Drop genullt)
///
/// Unveraenderlich nach der Ableitung. Gehoert exklusiv dem Session-Store.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey([REDACTED] {} bytes)", KEY_SIZE)
    }
}

/// Verschluesselter Frame (IV + Ciphertext, optional HMAC-Tag)
///
/// ## Format
/// ```text
/// [iv(16)] [ciphertext(n * 16)] [tag(32), nur mit Frame-Authentifizierung]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedFrame {
    /// Zufaelliger IV, pro Frame neu erzeugt
    pub iv: [u8; IV_SIZE],
    /// CBC-Ciphertext, immer ein Vielfaches der Blockgroesse
    pub ciphertext: Vec<u8>,
    /// HMAC-SHA256 ueber `iv || ciphertext`
    pub tag: Option<[u8; TAG_SIZE]>,
}

impl EncryptedFrame {
    /// Serialisiert zu Bytes: [iv] + [ciphertext] + [tag]
    pub fn to_bytes(&self) -> Vec<u8> {
        let tag_len = if self.tag.is_some() { TAG_SIZE } else { 0 };
        let mut out = Vec::with_capacity(IV_SIZE + self.ciphertext.len() + tag_len);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        if let Some(tag) = &self.tag {
            out.extend_from_slice(tag);
        }
        out
    }

    /// Deserialisiert aus Bytes
    ///
    /// `mit_tag` legt fest ob die letzten 32 Bytes ein HMAC-Tag sind.
    /// Jede Laengen-Verletzung ergibt `CryptoError::UngueltigerFrame`.
    pub fn from_bytes(bytes: &[u8], mit_tag: bool) -> CryptoResult<Self> {
        if bytes.len() < IV_SIZE {
            return Err(CryptoError::frame(format!(
                "Frame hat {} Bytes, mindestens {IV_SIZE} erwartet",
                bytes.len()
            )));
        }

        let (iv_bytes, rest) = bytes.split_at(IV_SIZE);
        let (body, tag) = if mit_tag {
            if rest.len() < TAG_SIZE {
                return Err(CryptoError::frame("Authentifizierungs-Tag fehlt"));
            }
            let (body, tag_bytes) = rest.split_at(rest.len() - TAG_SIZE);
            let mut tag = [0u8; TAG_SIZE];
            tag.copy_from_slice(tag_bytes);
            (body, Some(tag))
        } else {
            (rest, None)
        };

        if body.is_empty() || body.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::frame(format!(
                "Ciphertext-Laenge {} ist kein Vielfaches von {BLOCK_SIZE}",
                body.len()
            )));
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(iv_bytes);

        Ok(Self {
            iv,
            ciphertext: body.to_vec(),
            tag,
        })
    }
}
