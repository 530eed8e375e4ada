//! `FrameTransport` ueber einen axum-WebSocket

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use voxgate_voice::{Eingang, FrameTransport, SchliessGrund, VoiceError, VoiceResult};

/// Adapter: eine WebSocket-Nachricht entspricht einem Frame
pub struct WsFrameTransport {
    socket: WebSocket,
}

impl WsFrameTransport {
    pub fn neu(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl FrameTransport for WsFrameTransport {
    async fn receive(&mut self) -> VoiceResult<Option<Eingang>> {
        loop {
            let nachricht = match self.socket.recv().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(VoiceError::transport(e.to_string())),
                Some(Ok(nachricht)) => nachricht,
            };

            match nachricht {
                Message::Binary(daten) => return Ok(Some(Eingang::Binaer(daten))),
                Message::Text(text) => return Ok(Some(Eingang::Text(text))),
                Message::Close(frame) => {
                    tracing::debug!(
                        code = frame.as_ref().map(|f| f.code),
                        "Client hat Verbindung geschlossen"
                    );
                    return Ok(None);
                }
                // Pong beantwortet axum selbst
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
    }

    async fn send(&mut self, frame: Vec<u8>) -> VoiceResult<()> {
        self.socket
            .send(Message::Binary(frame))
            .await
            .map_err(|e| VoiceError::transport(e.to_string()))
    }

    async fn close(&mut self, grund: SchliessGrund) -> VoiceResult<()> {
        self.socket
            .send(Message::Close(Some(CloseFrame {
                code: grund.code,
                reason: grund.grund.into(),
            })))
            .await
            .map_err(|e| VoiceError::transport(e.to_string()))
    }
}

impl std::fmt::Debug for WsFrameTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsFrameTransport").finish_non_exhaustive()
    }
}
