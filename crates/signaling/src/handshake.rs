//! Handshake: oeffentlicher Client-Schluessel rein, Session-ID raus
//!
//! Ablauf:
//! 1. Frisches Server-`KeyPair` erzeugen
//! 2. Shared Secret mit dem Client-Schluessel berechnen (ungueltige Punkte -> 400)
//! 3. Session-Key per HKDF ableiten
//! 4. Neue Session-ID im Store ablegen
//!
//! Schlaegt ein Schritt fehl, wird keine Session angelegt.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voxgate_core::SessionId;
use voxgate_crypto::{derive_session_key, CryptoError, KeyPair, STANDARD_KDF_LABEL};
use voxgate_observability::GatewayMetrics;
use voxgate_session::SessionStore;

use crate::error::SignalingResult;

/// JSON-Antwort auf `POST /handshake`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeAntwort {
    /// 32 Hex-Zeichen
    pub session_id: SessionId,
    /// Base64 der 32 Bytes des Server-Schluessels
    pub server_public_key: String,
    pub expires_at: DateTime<Utc>,
}

/// Fuehrt Handshakes durch, unabhaengig von HTTP
pub struct HandshakeService {
    sessions: Arc<SessionStore>,
    kdf_label: Vec<u8>,
    ttl: Duration,
    metriken: Option<GatewayMetrics>,
}

impl HandshakeService {
    /// Service mit Standard-Label und der TTL des Stores
    pub fn neu(sessions: Arc<SessionStore>) -> Self {
        let ttl = sessions.standard_ttl();
        Self {
            sessions,
            kdf_label: STANDARD_KDF_LABEL.to_vec(),
            ttl,
            metriken: None,
        }
    }

    pub fn mit_kdf_label(mut self, label: impl Into<Vec<u8>>) -> Self {
        self.kdf_label = label.into();
        self
    }

    pub fn mit_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn mit_metriken(mut self, metriken: GatewayMetrics) -> Self {
        self.metriken = Some(metriken);
        self
    }

    /// Fuehrt den Handshake fuer einen rohen 32-Byte Client-Schluessel aus
    pub async fn handshake(&self, client_public_key: &[u8]) -> SignalingResult<HandshakeAntwort> {
        let ergebnis = self.handshake_intern(client_public_key).await;
        if let Some(m) = &self.metriken {
            match &ergebnis {
                Ok(_) => m.handshakes_total.inc(),
                Err(_) => m.handshake_failures_total.inc(),
            }
        }
        ergebnis
    }

    async fn handshake_intern(
        &self,
        client_public_key: &[u8],
    ) -> SignalingResult<HandshakeAntwort> {
        let mut server = KeyPair::generate()?;
        let shared = server.derive_shared_secret(client_public_key)?;
        let key = derive_session_key(&shared, &self.kdf_label)?;
        drop(shared);

        let session_id = SessionId::generate()
            .map_err(|e| CryptoError::SchluesselGenerierung(e.to_string()))?;
        let info = self.sessions.put(session_id, key, self.ttl).await;

        if let Some(m) = &self.metriken {
            let aktiv = self.sessions.active_count().await;
            m.active_sessions.set(i64::try_from(aktiv).unwrap_or(i64::MAX));
        }
        tracing::info!(
            session_id = %session_id,
            laeuft_ab_am = %info.laeuft_ab_am,
            "Handshake abgeschlossen"
        );

        Ok(HandshakeAntwort {
            session_id,
            server_public_key: BASE64.encode(server.public_key()),
            expires_at: info.laeuft_ab_am,
        })
    }

    /// Beendet eine Session vorzeitig (idempotent)
    pub async fn session_beenden(&self, id: &SessionId) {
        self.sessions.remove(id).await;
        if let Some(m) = &self.metriken {
            let aktiv = self.sessions.active_count().await;
            m.active_sessions.set(i64::try_from(aktiv).unwrap_or(i64::MAX));
        }
    }
}

impl std::fmt::Debug for HandshakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
