//! Route-Definitionen und Handler

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::json;
use tower_http::trace::TraceLayer;
use voxgate_core::SessionId;

use crate::error::SignalingError;
use crate::state::GatewayState;
use crate::transport::WsFrameTransport;

/// Spielraum ueber `max_frame_bytes`, damit zu grosse Frames sauber mit 1007 enden
const WS_SPIELRAUM_BYTES: usize = 64 * 1024;

/// Erstellt den vollstaendigen Router des Gateways
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/handshake", post(handshake))
        .route("/session/:session_id", delete(session_beenden))
        .route("/voice/:session_id", get(voice))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / – Erreichbarkeit
async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "voxgate online",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /handshake – Body: roher 32-Byte X25519-Schluessel des Clients
async fn handshake(State(state): State<GatewayState>, body: Bytes) -> Response {
    match state.handshake.handshake(&body).await {
        Ok(antwort) => (StatusCode::OK, Json(antwort)).into_response(),
        Err(e) => {
            tracing::warn!(fehler = %e, body_bytes = body.len(), "Handshake abgelehnt");
            e.into_response()
        }
    }
}

/// DELETE /session/:session_id – Session vorzeitig beenden
async fn session_beenden(
    State(state): State<GatewayState>,
    Path(roh): Path<String>,
) -> Response {
    match SessionId::from_hex(&roh) {
        Some(id) => {
            state.handshake.session_beenden(&id).await;
            StatusCode::NO_CONTENT.into_response()
        }
        None => SignalingError::UngueltigeSessionId(roh).into_response(),
    }
}

/// GET /voice/:session_id – WebSocket-Upgrade, danach uebernimmt der Orchestrator
async fn voice(
    State(state): State<GatewayState>,
    Path(roh): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(session_id) = SessionId::from_hex(&roh) else {
        return SignalingError::UngueltigeSessionId(roh).into_response();
    };

    let orchestrator = Arc::clone(&state.orchestrator);
    let limit = orchestrator
        .konfig()
        .max_frame_bytes
        .saturating_add(WS_SPIELRAUM_BYTES);

    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| async move {
            let mut transport = WsFrameTransport::neu(socket);
            orchestrator
                .verbindung_bedienen(session_id, &mut transport)
                .await;
        })
}
