//! Fehlertypen fuer den Session-Store

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Zu dieser ID wurde nie eine Session angelegt (oder sie wurde entfernt)
    #[error("Session nicht gefunden")]
    SessionNichtGefunden,

    /// Session existierte, ist aber abgelaufen und wurde entfernt
    #[error("Session abgelaufen")]
    SessionAbgelaufen,
}

pub type SessionResult<T> = Result<T, SessionError>;
