//! # voxgate-session
//!
//! Verwaltet die Zuordnung Session-ID -> Session-Key mit Ablaufzeit.
//!
//! Der Store wird beim Start einmal erzeugt und als `Arc<SessionStore>`
//! an Handshake und Streaming weitergereicht. Abgelaufene Sessions werden
//! beim Zugriff entfernt, zusaetzlich kann ein Hintergrund-Task periodisch
//! aufraeumen.

pub mod error;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use store::{SessionInfo, SessionStore, STANDARD_TTL};
