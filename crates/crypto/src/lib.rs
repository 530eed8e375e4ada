//! # voxgate-crypto
//!
//! Kryptografie-Subsystem des Gateways.
//!
//! ## Module
//! - `key_exchange` - Ephemere X25519-Schluesselpaare, Shared Secret, HKDF
//! - `channel` - Frame-Verschluesselung (AES-256-CBC, PKCS#7, optional HMAC)
//! - `types` - Gemeinsame Typen (SessionKey, EncryptedFrame, Groessen)
//! - `error` - Fehlertypen

pub mod channel;
pub mod error;
pub mod key_exchange;
pub mod types;

// Bequeme Re-Exports
pub use channel::{FrameSchutz, SecureChannel};
pub use error::{CryptoError, CryptoResult};
pub use key_exchange::{
    derive_session_key, hkdf_derive, KeyPair, SharedSecret, STANDARD_KDF_LABEL,
};
pub use types::{
    EncryptedFrame, SessionKey, BLOCK_SIZE, IV_SIZE, KEY_SIZE, PUBLIC_KEY_SIZE, TAG_SIZE,
};
