//! HTTP-Listener – bindet den Socket und bedient den Gateway-Router

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::SignalingResult;
use crate::routes::gateway_router;
use crate::state::GatewayState;

/// HTTP/WebSocket-Server des Gateways
///
/// Zweistufig: `binden` reserviert den Port (auch Port 0), `starten`
/// bedient Anfragen bis zum Shutdown-Signal.
pub struct GatewayServer {
    listener: TcpListener,
    lokale_adresse: SocketAddr,
}

impl GatewayServer {
    pub async fn binden(bind_addr: SocketAddr) -> SignalingResult<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        let lokale_adresse = listener.local_addr()?;
        Ok(Self {
            listener,
            lokale_adresse,
        })
    }

    pub fn lokale_adresse(&self) -> SocketAddr {
        self.lokale_adresse
    }

    /// Bedient Anfragen bis `shutdown` auf `true` wechselt
    ///
    /// Laufende WebSocket-Verbindungen werden nicht abgewartet; sie enden
    /// mit ihrer Session oder wenn der Client trennt.
    pub async fn starten(
        self,
        state: GatewayState,
        mut shutdown: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        tracing::info!(adresse = %self.lokale_adresse, "Gateway-Server gestartet");

        axum::serve(self.listener, gateway_router(state))
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
                tracing::info!("Gateway-Server: Shutdown-Signal empfangen");
            })
            .await?;

        tracing::info!("Gateway-Server gestoppt");
        Ok(())
    }
}
