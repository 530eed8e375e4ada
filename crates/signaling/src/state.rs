//! Gemeinsamer Zustand aller HTTP-Handler

use std::sync::Arc;

use voxgate_voice::StreamOrchestrator;

use crate::handshake::HandshakeService;

/// Haelt die geteilten Services als Arc-Referenzen
#[derive(Clone, Debug)]
pub struct GatewayState {
    pub handshake: Arc<HandshakeService>,
    pub orchestrator: Arc<StreamOrchestrator>,
}

impl GatewayState {
    pub fn neu(handshake: HandshakeService, orchestrator: StreamOrchestrator) -> Self {
        Self {
            handshake: Arc::new(handshake),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
