//! Fehlertypen fuer die HTTP-Schale

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use voxgate_crypto::CryptoError;

/// Fehlertyp fuer Handshake und Routing
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Key-Exchange oder Key-Derivation fehlgeschlagen
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Session-ID ist kein 32-stelliger Hex-String
    #[error("Ungueltige Session-ID: {0}")]
    UngueltigeSessionId(String),

    /// IO-Fehler (Socket binden, Accept)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl SignalingError {
    /// HTTP-Statuscode fuer die Antwort
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Crypto(CryptoError::UngueltigerPeerSchluessel(_)) => 400,
            Self::UngueltigeSessionId(_) => 400,
            Self::Crypto(_) | Self::Io(_) => 500,
        }
    }
}

impl IntoResponse for SignalingError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Interne Details nicht an den Client geben
        let nachricht = if status.is_server_error() {
            "Interner Serverfehler".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": nachricht }))).into_response()
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
