//! Frame-Verschluesselung fuer den Streaming-Kanal
//!
//! AES-256-CBC mit PKCS#7-Padding und frischem Zufalls-IV pro Frame.
//! Optional Encrypt-then-MAC (HMAC-SHA256 ueber `iv || ciphertext`).
//!
//! ## Format
//! ```text
//! [iv(16)] [ciphertext(n * 16)] [tag(32), nur mit FrameSchutz::Hmac]
//! ```

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::key_exchange::hkdf_derive;
use crate::types::{EncryptedFrame, SessionKey, IV_SIZE, KEY_SIZE, TAG_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// HKDF-Label fuer den MAC-Schluessel
const MAC_KEY_LABEL: &[u8] = b"voxgate-frame-mac-v1";

/// Integritaetsschutz der Frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSchutz {
    /// Nur Vertraulichkeit (`iv || ciphertext`)
    #[default]
    Keiner,
    /// Encrypt-then-MAC mit angehaengtem HMAC-SHA256-Tag
    Hmac,
}

/// Verschluesselt und entschluesselt einzelne Frames mit dem Session-Key
///
/// Zustandslos bis auf den Schutzmodus; beide Richtungen einer Verbindung
/// verwenden dieselbe Instanz.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureChannel {
    schutz: FrameSchutz,
}

impl SecureChannel {
    pub fn neu(schutz: FrameSchutz) -> Self {
        Self { schutz }
    }

    /// Verschluesselt einen Klartext-Frame
    ///
    /// Bereits ausgerichtete Eingaben erhalten einen vollen Padding-Block,
    /// eine leere Eingabe ergibt also genau einen Block.
    pub fn encrypt(&self, plaintext: &[u8], key: &SessionKey) -> CryptoResult<EncryptedFrame> {
        let mut iv = [0u8; IV_SIZE];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CryptoError::Verschluesselung(format!("IV-Erzeugung: {e}")))?;

        let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let tag = match self.schutz {
            FrameSchutz::Keiner => None,
            FrameSchutz::Hmac => Some(berechne_tag(key, &iv, &ciphertext)?),
        };

        Ok(EncryptedFrame {
            iv,
            ciphertext,
            tag,
        })
    }

    /// Entschluesselt einen bereits geparsten Frame
    pub fn decrypt(&self, frame: &EncryptedFrame, key: &SessionKey) -> CryptoResult<Vec<u8>> {
        match (self.schutz, &frame.tag) {
            (FrameSchutz::Hmac, Some(tag)) => pruefe_tag(key, &frame.iv, &frame.ciphertext, tag)?,
            (FrameSchutz::Hmac, None) => {
                return Err(CryptoError::frame("Authentifizierungs-Tag fehlt"))
            }
            (FrameSchutz::Keiner, Some(_)) => {
                return Err(CryptoError::frame("Unerwartetes Authentifizierungs-Tag"))
            }
            (FrameSchutz::Keiner, None) => {}
        }

        let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), &frame.iv)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&frame.ciphertext)
            .map_err(|_| CryptoError::frame("Ungueltiges Padding"))
    }

    /// Parst und entschluesselt einen Frame direkt aus den Wire-Bytes
    pub fn decrypt_bytes(&self, bytes: &[u8], key: &SessionKey) -> CryptoResult<Vec<u8>> {
        let frame = EncryptedFrame::from_bytes(bytes, self.schutz == FrameSchutz::Hmac)?;
        self.decrypt(&frame, key)
    }
}

fn mac_fuer(key: &SessionKey, iv: &[u8], ciphertext: &[u8]) -> CryptoResult<HmacSha256> {
    let mut mac_key = hkdf_derive(key.as_bytes(), None, MAC_KEY_LABEL, KEY_SIZE)?;
    let mac = <HmacSha256 as Mac>::new_from_slice(&mac_key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()));
    mac_key.zeroize();
    let mut mac = mac?;
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}

fn berechne_tag(key: &SessionKey, iv: &[u8], ciphertext: &[u8]) -> CryptoResult<[u8; TAG_SIZE]> {
    let mac = mac_fuer(key, iv, ciphertext)?;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

fn pruefe_tag(
    key: &SessionKey,
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> CryptoResult<()> {
    // verify_slice vergleicht in konstanter Zeit
    mac_fuer(key, iv, ciphertext)?
        .verify_slice(tag)
        .map_err(|_| {
            tracing::debug!("Frame-Tag stimmt nicht");
            CryptoError::frame("Authentifizierungs-Tag ungueltig")
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
