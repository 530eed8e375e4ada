//! voxgate-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Identifikationstypen bereit, die von Session-Store,
//! Voice-Orchestrator und Signaling gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ConnectionId, SessionId, SESSION_ID_LAENGE};
