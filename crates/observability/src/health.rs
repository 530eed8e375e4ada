//! Health-Check-Endpunkt fuer voxgate
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, Sessions und Verbindungen

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::GatewayMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Server faehrt herunter, keine neuen Verbindungen annehmen
    Draining,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: i64,
    pub active_connections: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    herunterfahren: Arc<AtomicBool>,
    metriken: GatewayMetrics,
}

impl HealthState {
    pub fn neu(metriken: GatewayMetrics) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            herunterfahren: Arc::new(AtomicBool::new(false)),
            metriken,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Markiert den Server als herunterfahrend (Health liefert dann 503)
    pub fn herunterfahren_melden(&self) {
        self.herunterfahren.store(true, Ordering::Relaxed);
    }

    pub fn faehrt_herunter(&self) -> bool {
        self.herunterfahren.load(Ordering::Relaxed)
    }

    fn antwort(&self) -> HealthResponse {
        let status = if self.faehrt_herunter() {
            HealthStatus::Draining
        } else {
            HealthStatus::Healthy
        };
        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            active_sessions: self.metriken.active_sessions.get(),
            active_connections: self.metriken.active_connections.get(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();
    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Draining => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> HealthState {
        HealthState::neu(GatewayMetrics::neu().unwrap())
    }

    #[test]
    fn health_state_frisch_erstellt() {
        let state = state();
        assert!(state.uptime_seconds() < 5);
        assert!(!state.faehrt_herunter());
    }

    #[test]
    fn antwort_spiegelt_metriken() {
        let state = state();
        state.metriken.active_sessions.set(4);
        state.metriken.active_connections.set(2);

        let antwort = state.antwort();
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.active_sessions, 4);
        assert_eq!(antwort.active_connections, 2);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            active_sessions: 12,
            active_connections: 3,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"active_sessions\":12"));
        assert!(json.contains("\"active_connections\":3"));
    }

    #[tokio::test]
    async fn health_endpunkt_ok() {
        let antwort = health_router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_endpunkt_beim_herunterfahren_503() {
        let state = state();
        state.herunterfahren_melden();

        let antwort = health_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let response: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(response.status, HealthStatus::Draining);
    }
}
