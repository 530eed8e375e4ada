//! Fehlertypen fuer die Stream-Orchestrierung

use std::time::Duration;

use thiserror::Error;
use voxgate_crypto::CryptoError;
use voxgate_session::SessionError;

/// WebSocket-Close-Codes (RFC 6455, Abschnitt 7.4.1)
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const UNGUELTIGE_DATEN: u16 = 1007;
    pub const RICHTLINIE: u16 = 1008;
    pub const SERVERFEHLER: u16 = 1011;
}

/// Fehler eines externen Dienstes (STT, LLM, TTS)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegateError {
    #[error("Transkription fehlgeschlagen: {0}")]
    Transkription(String),

    #[error("Inferenz fehlgeschlagen: {0}")]
    Inferenz(String),

    #[error("Sprachsynthese fehlgeschlagen: {0}")]
    Synthese(String),
}

/// Alle Fehler, die eine Streaming-Verbindung beenden
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Delegate(#[from] DelegateError),

    #[error("Zeitlimit fuer {schritt} ueberschritten ({timeout:?})")]
    DelegateTimeout {
        schritt: &'static str,
        timeout: Duration,
    },

    #[error("Transport-Fehler: {0}")]
    Transport(String),
}

impl VoiceError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// WebSocket-Close-Code, mit dem die Verbindung beendet wird
    pub fn close_code(&self) -> u16 {
        match self {
            Self::Session(_) => close_code::RICHTLINIE,
            Self::Crypto(CryptoError::UngueltigerFrame(_)) => close_code::UNGUELTIGE_DATEN,
            Self::Crypto(_)
            | Self::Delegate(_)
            | Self::DelegateTimeout { .. }
            | Self::Transport(_) => close_code::SERVERFEHLER,
        }
    }

    /// Kurzer, stabiler Bezeichner fuer Metrik-Labels
    pub fn grund(&self) -> &'static str {
        match self {
            Self::Session(SessionError::SessionNichtGefunden) => "session_nicht_gefunden",
            Self::Session(SessionError::SessionAbgelaufen) => "session_abgelaufen",
            Self::Crypto(CryptoError::UngueltigerFrame(_)) => "ungueltiger_frame",
            Self::Crypto(_) => "verschluesselung",
            Self::Delegate(DelegateError::Transkription(_)) => "transkription",
            Self::Delegate(DelegateError::Inferenz(_)) => "inferenz",
            Self::Delegate(DelegateError::Synthese(_)) => "synthese",
            Self::DelegateTimeout { .. } => "zeitlimit",
            Self::Transport(_) => "transport",
        }
    }
}

pub type VoiceResult<T> = Result<T, VoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_fehler_sind_richtlinienverstoss() {
        let e = VoiceError::from(SessionError::SessionAbgelaufen);
        assert_eq!(e.close_code(), 1008);
        assert_eq!(e.grund(), "session_abgelaufen");
        let e = VoiceError::from(SessionError::SessionNichtGefunden);
        assert_eq!(e.close_code(), 1008);
    }

    #[test]
    fn ungueltiger_frame_ist_1007() {
        let e = VoiceError::from(CryptoError::frame("zu kurz"));
        assert_eq!(e.close_code(), 1007);
        assert_eq!(e.grund(), "ungueltiger_frame");
    }

    #[test]
    fn delegate_und_interne_fehler_sind_1011() {
        let faelle = [
            VoiceError::from(DelegateError::Transkription("x".into())),
            VoiceError::from(DelegateError::Inferenz("x".into())),
            VoiceError::from(DelegateError::Synthese("x".into())),
            VoiceError::DelegateTimeout {
                schritt: "inferenz",
                timeout: Duration::from_secs(1),
            },
            VoiceError::from(CryptoError::Verschluesselung("x".into())),
            VoiceError::transport("weg"),
        ];
        for e in faelle {
            assert_eq!(e.close_code(), 1011, "{e}");
        }
    }
}
