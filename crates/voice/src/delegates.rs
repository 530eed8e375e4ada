//! Schnittstellen zu den externen Diensten
//!
//! Sprache-zu-Text, Sprachmodell und Sprachsynthese sind opake async
//! Funktionen. Sie sehen nur Klartext und wissen nichts von Sessions
//! oder Verschluesselung.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DelegateError;

/// Audio -> Text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, DelegateError>;
}

/// Text -> Antworttext
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, text: &str) -> Result<String, DelegateError>;
}

/// Text -> Audio
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, DelegateError>;
}

/// Buendel der drei Dienste, wird von allen Verbindungen geteilt
#[derive(Clone)]
pub struct Delegates {
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn SpeechSynthesis>,
}

impl Delegates {
    pub fn neu(
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn SpeechSynthesis>,
    ) -> Self {
        Self { stt, llm, tts }
    }

    /// Echo-Dienste: die Antwort enthaelt exakt die empfangenen Audiobytes
    pub fn loopback() -> Self {
        Self::neu(
            Arc::new(loopback::EchoTranskription),
            Arc::new(loopback::EchoModell),
            Arc::new(loopback::EchoSynthese),
        )
    }
}

impl std::fmt::Debug for Delegates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegates").finish_non_exhaustive()
    }
}

/// Lokale Echo-Implementierungen fuer Betrieb ohne externe Dienste
///
/// Audio wird verlustfrei als Latin-1 in Text uebertragen und zurueck,
/// sodass beliebige Bytes den Weg STT -> LLM -> TTS unveraendert ueberstehen.
pub mod loopback {
    use super::*;

    #[derive(Debug, Default)]
    pub struct EchoTranskription;

    #[derive(Debug, Default)]
    pub struct EchoModell;

    #[derive(Debug, Default)]
    pub struct EchoSynthese;

    #[async_trait]
    impl SpeechToText for EchoTranskription {
        async fn transcribe(&self, audio: &[u8]) -> Result<String, DelegateError> {
            Ok(audio.iter().map(|&b| char::from(b)).collect())
        }
    }

    #[async_trait]
    impl LanguageModel for EchoModell {
        async fn complete(&self, text: &str) -> Result<String, DelegateError> {
            Ok(text.to_string())
        }
    }

    #[async_trait]
    impl SpeechSynthesis for EchoSynthese {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, DelegateError> {
            text.chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        DelegateError::Synthese(format!("Zeichen {c:?} nicht darstellbar"))
                    })
                })
                .collect()
        }
    }
}
