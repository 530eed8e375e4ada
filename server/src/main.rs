//! voxgate – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet das Gateway.

use anyhow::Result;
use voxgate_observability::logging_initialisieren;
use voxgate_server::{config::GatewayConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("VOXGATE_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let mut config = GatewayConfig::laden(&config_pfad)?;
    config.umgebung_anwenden()?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        port = config.netzwerk.port,
        "voxgate wird initialisiert"
    );

    Server::neu(config).starten().await
}
