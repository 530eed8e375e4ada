//! voxgate-voice – Stream-Orchestrierung pro Verbindung
//!
//! Treibt fuer jede Streaming-Verbindung die Pipeline
//! Empfangen -> Entschluesseln -> STT -> LLM -> TTS -> Verschluesseln -> Senden.
//!
//! ## Module
//! - [`orchestrator`] – Zustandsmaschine und Frame-Schleife pro Verbindung
//! - [`transport`] – `FrameTransport`-Trait und In-Memory-Transport
//! - [`delegates`] – Traits fuer die externen Sprach- und Sprachmodell-Dienste
//! - [`error`] – Fehlertypen und Close-Code-Zuordnung

pub mod delegates;
pub mod error;
pub mod orchestrator;
pub mod transport;

pub use delegates::{Delegates, LanguageModel, SpeechSynthesis, SpeechToText};
pub use error::{DelegateError, VoiceError, VoiceResult};
pub use orchestrator::{StreamKonfig, StreamOrchestrator, VerbindungsZustand, Verbindungsende};
pub use transport::{Eingang, FrameTransport, SchliessGrund};
