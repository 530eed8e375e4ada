//! voxgate-signaling – HTTP-Schale um Handshake und Streaming
//!
//! ## Architektur
//!
//! ```text
//! POST   /handshake           -> HandshakeService (KeyPair, HKDF, SessionStore::put)
//! GET    /voice/:session_id   -> WebSocket-Upgrade -> WsFrameTransport
//!                                 -> StreamOrchestrator (ein Task pro Verbindung)
//! DELETE /session/:session_id -> SessionStore::remove
//! GET    /                    -> Status
//! ```
//!
//! Die Kernlogik lebt in `voxgate-crypto`, `voxgate-session` und
//! `voxgate-voice`; dieser Crate uebersetzt nur zwischen HTTP und Kern.

pub mod error;
pub mod handshake;
pub mod routes;
pub mod server;
pub mod state;
pub mod transport;

// Bequeme Re-Exporte
pub use error::{SignalingError, SignalingResult};
pub use handshake::{HandshakeAntwort, HandshakeService};
pub use routes::gateway_router;
pub use server::GatewayServer;
pub use state::GatewayState;
pub use transport::WsFrameTransport;
