//! Prometheus-kompatible Metriken fuer voxgate
//!
//! Registrierte Metriken:
//! - `voxgate_handshakes_total` – Counter: Erfolgreiche Handshakes
//! - `voxgate_handshake_failures_total` – Counter: Abgelehnte oder fehlgeschlagene Handshakes
//! - `voxgate_active_connections` – Gauge: Offene Streaming-Verbindungen
//! - `voxgate_active_sessions` – Gauge: Nicht abgelaufene Sessions im Store
//! - `voxgate_frames_total` – Counter: Vollstaendig verarbeitete Frames
//! - `voxgate_connection_failures_total` – Counter: Fehlerhaft beendete Verbindungen (grund)
//! - `voxgate_frame_duration_seconds` – Histogram: Verarbeitungszeit pro Frame
//!
//! Auf Linux kommen die Standard-Prozessmetriken (`process_*`) hinzu.

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Gateway-Metriken in einer eigenen Registry
#[derive(Clone)]
pub struct GatewayMetrics {
    pub registry: Arc<Registry>,

    // Handshake
    pub handshakes_total: IntCounter,
    pub handshake_failures_total: IntCounter,

    // Streaming
    pub active_connections: IntGauge,
    pub active_sessions: IntGauge,
    pub frames_total: IntCounter,
    pub connection_failures_total: IntCounterVec,
    pub frame_duration_seconds: Histogram,
}

impl GatewayMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let handshakes_total = IntCounter::with_opts(Opts::new(
            "voxgate_handshakes_total",
            "Anzahl erfolgreicher Handshakes",
        ))?;
        registry.register(Box::new(handshakes_total.clone()))?;

        let handshake_failures_total = IntCounter::with_opts(Opts::new(
            "voxgate_handshake_failures_total",
            "Anzahl fehlgeschlagener Handshakes",
        ))?;
        registry.register(Box::new(handshake_failures_total.clone()))?;

        let active_connections = IntGauge::with_opts(Opts::new(
            "voxgate_active_connections",
            "Anzahl offener Streaming-Verbindungen",
        ))?;
        registry.register(Box::new(active_connections.clone()))?;

        let active_sessions = IntGauge::with_opts(Opts::new(
            "voxgate_active_sessions",
            "Anzahl nicht abgelaufener Sessions",
        ))?;
        registry.register(Box::new(active_sessions.clone()))?;

        let frames_total = IntCounter::with_opts(Opts::new(
            "voxgate_frames_total",
            "Anzahl vollstaendig verarbeiteter Frames",
        ))?;
        registry.register(Box::new(frames_total.clone()))?;

        let connection_failures_total = IntCounterVec::new(
            Opts::new(
                "voxgate_connection_failures_total",
                "Fehlerhaft beendete Streaming-Verbindungen",
            ),
            &["grund"],
        )?;
        registry.register(Box::new(connection_failures_total.clone()))?;

        // Ein Frame durchlaeuft drei externe Dienste, daher grobe Buckets
        let frame_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "voxgate_frame_duration_seconds",
                "Verarbeitungszeit pro Frame in Sekunden",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(frame_duration_seconds.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            handshakes_total,
            handshake_failures_total,
            active_connections,
            active_sessions,
            frames_total,
            connection_failures_total,
            frame_duration_seconds,
        })
    }

    /// Zaehlt eine fehlerhaft beendete Verbindung
    pub fn verbindungsfehler(&self, grund: &str) {
        self.connection_failures_total
            .with_label_values(&[grund])
            .inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics")
            .field("active_connections", &self.active_connections.get())
            .field("active_sessions", &self.active_sessions.get())
            .finish_non_exhaustive()
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: GatewayMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<GatewayMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
