//! Frame-Transport zwischen Client und Orchestrator
//!
//! Der Orchestrator kennt nur diesen Trait. Die WebSocket-Anbindung lebt in
//! `voxgate-signaling`, fuer Tests gibt es einen In-Memory-Transport.

use async_trait::async_trait;

use crate::error::{close_code, VoiceError, VoiceResult};

/// Maximale Laenge eines WebSocket-Close-Grunds in Bytes
pub const MAX_GRUND_BYTES: usize = 123;

/// Eine eingehende Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eingang {
    /// Ein verschluesselter Frame
    Binaer(Vec<u8>),
    /// Textnachricht (Protokollverstoss)
    Text(String),
}

/// Strukturierter Grund fuer das Schliessen einer Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchliessGrund {
    pub code: u16,
    pub grund: String,
}

impl SchliessGrund {
    /// Erstellt einen Grund, der Text wird auf `MAX_GRUND_BYTES` gekuerzt
    pub fn neu(code: u16, grund: impl Into<String>) -> Self {
        let mut grund = grund.into();
        if grund.len() > MAX_GRUND_BYTES {
            let mut ende = MAX_GRUND_BYTES;
            while !grund.is_char_boundary(ende) {
                ende -= 1;
            }
            grund.truncate(ende);
        }
        Self { code, grund }
    }

    pub fn normal() -> Self {
        Self::neu(close_code::NORMAL, "Verbindung beendet")
    }

    pub fn aus_fehler(fehler: &VoiceError) -> Self {
        Self::neu(fehler.close_code(), fehler.to_string())
    }
}

/// Bidirektionaler Kanal fuer verschluesselte Frames
#[async_trait]
pub trait FrameTransport: Send {
    /// Naechste Nachricht; `None` wenn die Gegenstelle regulaer beendet hat
    async fn receive(&mut self) -> VoiceResult<Option<Eingang>>;

    async fn send(&mut self, frame: Vec<u8>) -> VoiceResult<()>;

    /// Schliesst die Verbindung mit Code und Grund
    async fn close(&mut self, grund: SchliessGrund) -> VoiceResult<()>;
}

/// In-Memory-Transport auf Basis von mpsc-Kanaelen
pub mod memory {
    use tokio::sync::mpsc;

    use super::*;

    /// Was der Orchestrator an den Client schickt
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Ausgang {
        Frame(Vec<u8>),
        Geschlossen(SchliessGrund),
    }

    /// Server-Seite, wird an den Orchestrator uebergeben
    #[derive(Debug)]
    pub struct MemoryTransport {
        eingang: mpsc::Receiver<Eingang>,
        ausgang: mpsc::Sender<Ausgang>,
    }

    /// Client-Seite fuer Tests
    #[derive(Debug)]
    pub struct MemoryClient {
        eingang: Option<mpsc::Sender<Eingang>>,
        ausgang: mpsc::Receiver<Ausgang>,
    }

    /// Erstellt ein verbundenes Transport/Client-Paar
    pub fn paar(kapazitaet: usize) -> (MemoryTransport, MemoryClient) {
        let (eingang_tx, eingang_rx) = mpsc::channel(kapazitaet);
        let (ausgang_tx, ausgang_rx) = mpsc::channel(kapazitaet);
        (
            MemoryTransport {
                eingang: eingang_rx,
                ausgang: ausgang_tx,
            },
            MemoryClient {
                eingang: Some(eingang_tx),
                ausgang: ausgang_rx,
            },
        )
    }

    #[async_trait]
    impl FrameTransport for MemoryTransport {
        async fn receive(&mut self) -> VoiceResult<Option<Eingang>> {
            Ok(self.eingang.recv().await)
        }

        async fn send(&mut self, frame: Vec<u8>) -> VoiceResult<()> {
            self.ausgang
                .send(Ausgang::Frame(frame))
                .await
                .map_err(|_| VoiceError::transport("Client getrennt"))
        }

        async fn close(&mut self, grund: SchliessGrund) -> VoiceResult<()> {
            self.eingang.close();
            self.ausgang
                .send(Ausgang::Geschlossen(grund))
                .await
                .map_err(|_| VoiceError::transport("Client getrennt"))
        }
    }

    impl MemoryClient {
        pub async fn senden(&self, nachricht: Eingang) -> VoiceResult<()> {
            let tx = self
                .eingang
                .as_ref()
                .ok_or_else(|| VoiceError::transport("Eingang bereits geschlossen"))?;
            tx.send(nachricht)
                .await
                .map_err(|_| VoiceError::transport("Server getrennt"))
        }

        pub async fn binaer_senden(&self, frame: Vec<u8>) -> VoiceResult<()> {
            self.senden(Eingang::Binaer(frame)).await
        }

        /// Signalisiert dem Server das regulaere Ende des Streams
        pub fn eingang_schliessen(&mut self) {
            self.eingang = None;
        }

        pub async fn empfangen(&mut self) -> Option<Ausgang> {
            self.ausgang.recv().await
        }
    }
}
