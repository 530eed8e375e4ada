//! voxgate-server – Bibliotheks-Root
//!
//! Verdrahtet Session-Store, Handshake, Streaming und Observability zu einem
//! lauffaehigen Gateway und stellt den Einstiegspunkt fuer Tests bereit.

pub mod config;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::GatewayConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use voxgate_observability::{observability_server_starten, GatewayMetrics, HealthState};
use voxgate_session::SessionStore;
use voxgate_signaling::{GatewayServer, GatewayState, HandshakeService};
use voxgate_voice::{Delegates, StreamOrchestrator};

/// Untergrenze fuer das Aktualisieren der Session-Gauge
const MIN_GAUGE_INTERVALL: Duration = Duration::from_secs(1);

/// Haelt die Konfiguration bis zum Start zusammen
pub struct Server {
    pub config: GatewayConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        self.laufen_bis(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            }
        })
        .await
    }

    /// Startet alle Subsysteme und laeuft bis `signal` fertig ist
    ///
    /// Reihenfolge:
    /// 1. Session-Store und Cleanup-Task
    /// 2. Handshake-Service und Orchestrator (Loopback-Delegates)
    /// 3. HTTP/WebSocket-Listener
    /// 4. Observability-Server (optional)
    /// 5. Auf Signal warten, dann alle Tasks ueber einen Watch-Kanal stoppen
    pub async fn laufen_bis<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.config.validieren()?;
        let cfg = &self.config;

        let metriken = GatewayMetrics::neu().context("Metriken konnten nicht registriert werden")?;
        let health = HealthState::neu(metriken.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let store = SessionStore::neu(cfg.session_ttl());
        let sweeper = store.start_sweeper(cfg.cleanup_intervall(), shutdown_rx.clone());
        let gauge = session_gauge_starten(
            Arc::clone(&store),
            metriken.clone(),
            cfg.cleanup_intervall(),
            shutdown_rx.clone(),
        );

        let handshake = HandshakeService::neu(Arc::clone(&store))
            .mit_kdf_label(cfg.session.kdf_label.clone().into_bytes())
            .mit_ttl(cfg.session_ttl())
            .mit_metriken(metriken.clone());
        let orchestrator =
            StreamOrchestrator::neu(Arc::clone(&store), Delegates::loopback(), cfg.stream_konfig())
                .mit_metriken(metriken.clone());
        let state = GatewayState::neu(handshake, orchestrator);

        let gateway = GatewayServer::binden(cfg.gateway_bind_adresse()?)
            .await
            .context("Gateway-Port konnte nicht gebunden werden")?;

        tracing::info!(
            adresse = %gateway.lokale_adresse(),
            ttl_sekunden = cfg.session.ttl_sekunden,
            frame_authentifizierung = cfg.stream.frame_authentifizierung,
            "voxgate startet"
        );

        let mut gateway_task = tokio::spawn(gateway.starten(state, shutdown_rx.clone()));

        let observability_task = if cfg.observability.aktiviert {
            let adresse = cfg.observability_bind_adresse()?;
            let metriken = metriken.clone();
            let health = health.clone();
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, metriken, health, rx).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        tracing::info!("voxgate laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");

        let vorzeitig = tokio::select! {
            _ = signal => None,
            ergebnis = &mut gateway_task => Some(ergebnis),
        };

        tracing::info!("Shutdown-Signal empfangen, voxgate wird beendet");
        health.herunterfahren_melden();
        let _ = shutdown_tx.send(true);

        let ergebnis = match vorzeitig {
            Some(ergebnis) => ergebnis,
            None => gateway_task.await,
        };

        let _ = sweeper.await;
        let _ = gauge.await;
        if let Some(task) = observability_task {
            let _ = task.await;
        }

        ergebnis
            .context("Gateway-Task abgebrochen")?
            .context("Gateway-Server fehlgeschlagen")?;

        tracing::info!("voxgate beendet");
        Ok(())
    }
}

/// Haelt `voxgate_active_sessions` aktuell, auch wenn Sessions nur ablaufen
fn session_gauge_starten(
    store: Arc<SessionStore>,
    metriken: GatewayMetrics,
    intervall: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let intervall = intervall.max(MIN_GAUGE_INTERVALL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(intervall);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let aktiv = store.active_count().await;
                    metriken.active_sessions.set(i64::try_from(aktiv).unwrap_or(i64::MAX));
                }
                geaendert = shutdown.changed() => {
                    if geaendert.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use voxgate_core::SessionId;
    use voxgate_crypto::SessionKey;

    fn test_config() -> GatewayConfig {
        let mut cfg = GatewayConfig::default();
        cfg.netzwerk.bind_adresse = "127.0.0.1".into();
        cfg.netzwerk.port = 0;
        cfg.observability.port = 0;
        cfg
    }

    #[tokio::test]
    async fn starten_und_sofort_beenden() {
        let mut cfg = test_config();
        cfg.observability.aktiviert = false;
        Server::neu(cfg).laufen_bis(async {}).await.unwrap();
    }

    #[tokio::test]
    async fn mit_observability_starten_und_beenden() {
        let cfg = test_config();
        Server::neu(cfg)
            .laufen_bis(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ungueltige_config_startet_nicht() {
        let mut cfg = test_config();
        cfg.logging.level = "laut".into();
        assert!(Server::neu(cfg).laufen_bis(async {}).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn session_gauge_folgt_dem_store() {
        let store = SessionStore::neu(Duration::from_secs(60));
        let metriken = GatewayMetrics::neu().unwrap();
        let (tx, rx) = watch::channel(false);
        let task = session_gauge_starten(
            Arc::clone(&store),
            metriken.clone(),
            Duration::from_secs(5),
            rx,
        );

        let id = SessionId::from_bytes([1; 16]);
        store
            .put(id, SessionKey::from_bytes([1; 32]), Duration::from_secs(60))
            .await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(metriken.active_sessions.get(), 1);

        store.remove(&id).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(metriken.active_sessions.get(), 0);

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
