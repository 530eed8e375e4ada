//! Stream-Orchestrator – eine Zustandsmaschine pro Verbindung
//!
//! ```text
//! Handshaking --(Session gueltig)--> Streaming --(Ende/Fehler)--> Closed
//!      |                                                            ^
//!      +-----------------(Session unbekannt/abgelaufen)-------------+
//! ```
//!
//! Pro Frame:
//!
//! ```text
//! receive -> SessionStore::get -> decrypt -> STT -> LLM -> TTS -> encrypt -> send
//! ```
//!
//! Frames einer Verbindung werden strikt nacheinander verarbeitet. Jeder
//! Fehler beendet nur die betroffene Verbindung.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use voxgate_core::{ConnectionId, SessionId};
use voxgate_crypto::{CryptoError, FrameSchutz, SecureChannel, SessionKey};
use voxgate_observability::GatewayMetrics;
use voxgate_session::SessionStore;

use crate::delegates::Delegates;
use crate::error::{DelegateError, VoiceError, VoiceResult};
use crate::transport::{Eingang, FrameTransport, SchliessGrund};

/// Standard-Zeitlimit pro Delegate-Aufruf
pub const STANDARD_DELEGATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Standard-Obergrenze fuer eingehende Frames (1 MiB)
pub const STANDARD_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Laufzeit-Parameter fuer alle Verbindungen
#[derive(Debug, Clone)]
pub struct StreamKonfig {
    pub delegate_timeout: Duration,
    /// Zusaetzliche Versuche pro Delegate-Aufruf (0 = keine Wiederholung)
    pub delegate_wiederholungen: u32,
    pub frame_schutz: FrameSchutz,
    pub max_frame_bytes: usize,
}

impl Default for StreamKonfig {
    fn default() -> Self {
        Self {
            delegate_timeout: STANDARD_DELEGATE_TIMEOUT,
            delegate_wiederholungen: 0,
            frame_schutz: FrameSchutz::Keiner,
            max_frame_bytes: STANDARD_MAX_FRAME_BYTES,
        }
    }
}

/// Zustand einer Streaming-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsZustand {
    Handshaking,
    Streaming,
    Closed,
}

impl VerbindungsZustand {
    /// Erlaubte Uebergaenge; es gibt keinen Weg zurueck
    pub fn kann_wechseln_zu(self, ziel: Self) -> bool {
        use VerbindungsZustand::*;
        matches!(
            (self, ziel),
            (Handshaking, Streaming) | (Handshaking, Closed) | (Streaming, Closed)
        )
    }
}

/// Ergebnis einer beendeten Verbindung
#[derive(Debug)]
pub struct Verbindungsende {
    pub connection_id: ConnectionId,
    /// Vollstaendig verarbeitete Frames
    pub frames: u64,
    /// An den Client gesendeter Close-Grund
    pub schliess_grund: SchliessGrund,
    /// `None` bei regulaerem Ende durch den Client
    pub fehler: Option<VoiceError>,
    /// Letzter erreichter Zustand vor `Closed`
    pub letzter_zustand: VerbindungsZustand,
}

/// Treibt Streaming-Verbindungen; eine Instanz fuer alle Verbindungen
pub struct StreamOrchestrator {
    sessions: Arc<SessionStore>,
    delegates: Delegates,
    channel: SecureChannel,
    konfig: StreamKonfig,
    metriken: Option<GatewayMetrics>,
}

impl StreamOrchestrator {
    pub fn neu(sessions: Arc<SessionStore>, delegates: Delegates, konfig: StreamKonfig) -> Self {
        Self {
            sessions,
            delegates,
            channel: SecureChannel::neu(konfig.frame_schutz),
            konfig,
            metriken: None,
        }
    }

    pub fn mit_metriken(mut self, metriken: GatewayMetrics) -> Self {
        self.metriken = Some(metriken);
        self
    }

    pub fn konfig(&self) -> &StreamKonfig {
        &self.konfig
    }

    /// Bedient eine Verbindung bis zum Ende und schliesst sie
    ///
    /// Liefert nie einen Fehler nach aussen; das Ergebnis beschreibt wie
    /// die Verbindung endete.
    pub async fn verbindung_bedienen<T: FrameTransport>(
        &self,
        session_id: SessionId,
        transport: &mut T,
    ) -> Verbindungsende {
        let connection_id = ConnectionId::new();
        let span = tracing::info_span!(
            "verbindung",
            connection_id = %connection_id,
            session_id = %session_id
        );
        self.verbindung_intern(connection_id, session_id, transport)
            .instrument(span)
            .await
    }

    async fn verbindung_intern<T: FrameTransport>(
        &self,
        connection_id: ConnectionId,
        session_id: SessionId,
        transport: &mut T,
    ) -> Verbindungsende {
        let mut zustand = VerbindungsZustand::Handshaking;
        let mut frames = 0u64;

        // Session vor dem ersten Frame pruefen
        let fehler = match self.sessions.get(&session_id).await {
            Err(e) => Some(VoiceError::from(e)),
            Ok(_) => {
                wechseln(&mut zustand, VerbindungsZustand::Streaming);
                if let Some(m) = &self.metriken {
                    m.active_connections.inc();
                }
                tracing::info!("Streaming gestartet");

                let fehler = self.frame_schleife(session_id, transport, &mut frames).await;

                if let Some(m) = &self.metriken {
                    m.active_connections.dec();
                }
                fehler
            }
        };

        let letzter_zustand = zustand;
        let schliess_grund = match &fehler {
            None => SchliessGrund::normal(),
            Some(e) => SchliessGrund::aus_fehler(e),
        };

        match &fehler {
            None => tracing::info!(frames, "Verbindung regulaer beendet"),
            Some(e) => {
                tracing::warn!(
                    frames,
                    fehler = %e,
                    code = schliess_grund.code,
                    "Verbindung abgebrochen"
                );
                if let Some(m) = &self.metriken {
                    m.verbindungsfehler(e.grund());
                }
            }
        }

        // Nach einem Transportfehler ist die Gegenstelle meist schon weg
        if let Err(e) = transport.close(schliess_grund.clone()).await {
            tracing::debug!(fehler = %e, "Close-Frame konnte nicht gesendet werden");
        }
        wechseln(&mut zustand, VerbindungsZustand::Closed);

        Verbindungsende {
            connection_id,
            frames,
            schliess_grund,
            fehler,
            letzter_zustand,
        }
    }

    /// Frame-Schleife; `None` bei regulaerem Ende
    async fn frame_schleife<T: FrameTransport>(
        &self,
        session_id: SessionId,
        transport: &mut T,
        frames: &mut u64,
    ) -> Option<VoiceError> {
        loop {
            let eingang = match transport.receive().await {
                Ok(Some(eingang)) => eingang,
                Ok(None) => return None,
                Err(e) => return Some(e),
            };

            let start = Instant::now();
            if let Err(e) = self.frame_verarbeiten(session_id, eingang, transport).await {
                return Some(e);
            }
            *frames += 1;

            if let Some(m) = &self.metriken {
                m.frames_total.inc();
                m.frame_duration_seconds
                    .observe(start.elapsed().as_secs_f64());
            }
        }
    }

    async fn frame_verarbeiten<T: FrameTransport>(
        &self,
        session_id: SessionId,
        eingang: Eingang,
        transport: &mut T,
    ) -> VoiceResult<()> {
        let daten = match eingang {
            Eingang::Binaer(daten) => daten,
            Eingang::Text(_) => {
                return Err(CryptoError::frame("Textnachricht statt Binaer-Frame").into())
            }
        };
        if daten.len() > self.konfig.max_frame_bytes {
            return Err(CryptoError::frame(format!(
                "Frame mit {} Bytes ueberschreitet Maximum von {}",
                daten.len(),
                self.konfig.max_frame_bytes
            ))
            .into());
        }

        // Schluessel pro Frame neu holen, Ablauf wird so sofort wirksam
        let key: Arc<SessionKey> = self.sessions.get(&session_id).await?;
        let audio = self.channel.decrypt_bytes(&daten, &key)?;

        let antwort_audio = self.pipeline(&audio).await?;

        let frame = self.channel.encrypt(&antwort_audio, &key)?;
        drop(key);

        transport.send(frame.to_bytes()).await?;
        tracing::trace!(
            eingang_bytes = daten.len(),
            ausgang_bytes = antwort_audio.len(),
            "Frame verarbeitet"
        );
        Ok(())
    }

    /// STT -> LLM -> TTS
    async fn pipeline(&self, audio: &[u8]) -> VoiceResult<Vec<u8>> {
        let stt = &self.delegates.stt;
        let text = self
            .begrenzt("transkription", move || stt.transcribe(audio))
            .await?;

        let llm = &self.delegates.llm;
        let text = text.as_str();
        let antwort = self
            .begrenzt("inferenz", move || llm.complete(text))
            .await?;

        let tts = &self.delegates.tts;
        let antwort = antwort.as_str();
        self.begrenzt("synthese", move || tts.synthesize(antwort))
            .await
    }

    /// Fuehrt einen Delegate-Aufruf mit Zeitlimit und Wiederholungen aus
    async fn begrenzt<F, Fut, R>(&self, schritt: &'static str, aufruf: F) -> VoiceResult<R>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<R, DelegateError>>,
    {
        let timeout = self.konfig.delegate_timeout;
        let mut versuch = 0u32;

        loop {
            let fehler = match tokio::time::timeout(timeout, aufruf()).await {
                Ok(Ok(ergebnis)) => return Ok(ergebnis),
                Ok(Err(e)) => VoiceError::Delegate(e),
                Err(_) => VoiceError::DelegateTimeout { schritt, timeout },
            };

            if versuch >= self.konfig.delegate_wiederholungen {
                return Err(fehler);
            }
            versuch += 1;
            tracing::warn!(
                schritt,
                versuch,
                fehler = %fehler,
                "Delegate fehlgeschlagen, neuer Versuch"
            );
        }
    }
}

impl std::fmt::Debug for StreamOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOrchestrator")
            .field("konfig", &self.konfig)
            .finish_non_exhaustive()
    }
}

fn wechseln(zustand: &mut VerbindungsZustand, ziel: VerbindungsZustand) {
    debug_assert!(zustand.kann_wechseln_zu(ziel), "{zustand:?} -> {ziel:?}");
    tracing::debug!(von = ?*zustand, nach = ?ziel, "Zustandswechsel");
    *zustand = ziel;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
