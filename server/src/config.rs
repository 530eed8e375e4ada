//! Gateway-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, sodass das Gateway ohne Konfigurationsdatei lauffaehig ist.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use voxgate_crypto::FrameSchutz;
use voxgate_observability::logging::{log_format_gueltig, log_level_gueltig};
use voxgate_voice::StreamKonfig;

/// Umgebungsvariable die `[netzwerk].port` ueberschreibt
pub const PORT_ENV: &str = "PORT";

/// Vollstaendige Gateway-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub netzwerk: NetzwerkEinstellungen,
    pub session: SessionEinstellungen,
    pub stream: StreamEinstellungen,
    pub logging: LoggingEinstellungen,
    /// Metriken und Health-Check
    pub observability: ObservabilityEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer Handshake und Streaming
    pub bind_adresse: String,
    /// HTTP/WebSocket-Port
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Session-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEinstellungen {
    /// Lebensdauer einer Session ab Handshake
    pub ttl_sekunden: u64,
    /// Abstand zwischen zwei Cleanup-Laeufen
    pub cleanup_intervall_sekunden: u64,
    /// HKDF-Kontext fuer den Session-Key (muss zum Client passen)
    pub kdf_label: String,
}

impl Default for SessionEinstellungen {
    fn default() -> Self {
        Self {
            ttl_sekunden: 3600,
            cleanup_intervall_sekunden: 60,
            kdf_label: "handshake".into(),
        }
    }
}

/// Streaming-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamEinstellungen {
    /// Zeitlimit pro Delegate-Aufruf
    pub delegate_timeout_sekunden: u64,
    /// Zusaetzliche Versuche nach einem Delegate-Fehler
    pub delegate_wiederholungen: u32,
    /// Frames zusaetzlich per HMAC-SHA256 authentifizieren
    pub frame_authentifizierung: bool,
    /// Obergrenze fuer eingehende Frames
    pub max_frame_bytes: usize,
}

impl Default for StreamEinstellungen {
    fn default() -> Self {
        let standard = StreamKonfig::default();
        Self {
            delegate_timeout_sekunden: standard.delegate_timeout.as_secs(),
            delegate_wiederholungen: standard.delegate_wiederholungen,
            frame_authentifizierung: false,
            max_frame_bytes: standard.max_frame_bytes,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl GatewayConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("Konfigurationsdatei '{pfad}' nicht lesbar")),
        }
    }

    /// Uebernimmt `PORT` aus der Umgebung, falls gesetzt
    pub fn umgebung_anwenden(&mut self) -> anyhow::Result<()> {
        self.port_ueberschreiben(std::env::var(PORT_ENV).ok().as_deref())
    }

    fn port_ueberschreiben(&mut self, wert: Option<&str>) -> anyhow::Result<()> {
        if let Some(wert) = wert {
            self.netzwerk.port = wert
                .trim()
                .parse()
                .with_context(|| format!("{PORT_ENV}='{wert}' ist kein gueltiger Port"))?;
        }
        Ok(())
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        if self.session.ttl_sekunden == 0 {
            bail!("session.ttl_sekunden muss groesser als 0 sein");
        }
        if self.session.kdf_label.is_empty() {
            bail!("session.kdf_label darf nicht leer sein");
        }
        if self.stream.delegate_timeout_sekunden == 0 {
            bail!("stream.delegate_timeout_sekunden muss groesser als 0 sein");
        }
        if self.stream.max_frame_bytes == 0 {
            bail!("stream.max_frame_bytes muss groesser als 0 sein");
        }
        self.gateway_bind_adresse()?;
        Ok(())
    }

    /// Bind-Adresse fuer Handshake und Streaming
    pub fn gateway_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.bind_adresse(self.netzwerk.port)
    }

    /// Bind-Adresse fuer den Observability-Server
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.bind_adresse(self.observability.port)
    }

    fn bind_adresse(&self, port: u16) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.netzwerk.bind_adresse, port)
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.netzwerk.bind_adresse))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_sekunden)
    }

    pub fn cleanup_intervall(&self) -> Duration {
        Duration::from_secs(self.session.cleanup_intervall_sekunden)
    }

    /// Streaming-Parameter fuer den Orchestrator
    pub fn stream_konfig(&self) -> StreamKonfig {
        StreamKonfig {
            delegate_timeout: Duration::from_secs(self.stream.delegate_timeout_sekunden),
            delegate_wiederholungen: self.stream.delegate_wiederholungen,
            frame_schutz: if self.stream.frame_authentifizierung {
                FrameSchutz::Hmac
            } else {
                FrameSchutz::Keiner
            },
            max_frame_bytes: self.stream.max_frame_bytes,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
