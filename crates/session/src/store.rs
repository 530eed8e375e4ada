//! In-Memory Session-Store mit TTL
//!
//! Sessions werden in einer `RwLock<HashMap>` gehalten. Die Ablaufzeit wird
//! mit `tokio::time::Instant` gemessen, die UTC-Zeitstempel dienen nur der
//! Auskunft an Clients.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use voxgate_core::SessionId;
use voxgate_crypto::SessionKey;

use crate::error::{SessionError, SessionResult};

/// Standard-Lebensdauer einer Session: 1 Stunde
pub const STANDARD_TTL: Duration = Duration::from_secs(60 * 60);

/// Kleinstes erlaubtes Cleanup-Intervall
const MIN_CLEANUP_INTERVALL: Duration = Duration::from_millis(10);

/// Obergrenze fuer Ablaufzeiten bei absurd grossen TTLs
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Oeffentliche Auskunft ueber eine angelegte Session (ohne Schluessel)
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub erstellt_am: DateTime<Utc>,
    pub laeuft_ab_am: DateTime<Utc>,
}

struct Eintrag {
    key: Arc<SessionKey>,
    laeuft_ab: Instant,
}

impl Eintrag {
    fn ist_abgelaufen(&self, jetzt: Instant) -> bool {
        jetzt >= self.laeuft_ab
    }
}

/// Session-ID -> Session-Key, sicher fuer beliebig viele Tasks
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Eintrag>>,
    standard_ttl: Duration,
}

impl SessionStore {
    /// Erstellt einen leeren Store mit der angegebenen Standard-TTL
    pub fn neu(standard_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            standard_ttl,
        })
    }

    pub fn standard_ttl(&self) -> Duration {
        self.standard_ttl
    }

    /// Legt eine Session an oder ueberschreibt eine bestehende
    ///
    /// Ablauf = jetzt + `ttl`. Bei gleichzeitigen Aufrufen gewinnt der letzte.
    pub async fn put(&self, id: SessionId, key: SessionKey, ttl: Duration) -> SessionInfo {
        let ttl = ttl.min(MAX_TTL);
        let jetzt = Instant::now();
        let erstellt_am = Utc::now();
        let laeuft_ab_am = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| erstellt_am.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let eintrag = Eintrag {
            key: Arc::new(key),
            laeuft_ab: jetzt + ttl,
        };

        let ueberschrieben = self.sessions.write().await.insert(id, eintrag).is_some();
        tracing::debug!(
            session_id = %id,
            ttl_sekunden = ttl.as_secs(),
            ueberschrieben,
            "Session angelegt"
        );

        SessionInfo {
            id,
            erstellt_am,
            laeuft_ab_am,
        }
    }

    /// Liefert den Schluessel einer gueltigen Session
    ///
    /// Abgelaufene Eintraege werden dabei entfernt. `SessionAbgelaufen` gibt
    /// es nur, solange der Eintrag noch im Store liegt: hat `sweep_expired`
    /// (oder der Sweeper) ihn bereits entfernt, lautet das Ergebnis
    /// `SessionNichtGefunden`. Fuer Verbindungen ist beides Close-Code 1008.
    pub async fn get(&self, id: &SessionId) -> SessionResult<Arc<SessionKey>> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return Err(SessionError::SessionNichtGefunden),
                Some(e) if !e.ist_abgelaufen(Instant::now()) => return Ok(Arc::clone(&e.key)),
                Some(_) => {}
            }
        }

        // Zwischen Lese- und Schreib-Lock kann ein neues put() passiert sein
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            None => Err(SessionError::SessionNichtGefunden),
            Some(e) if !e.ist_abgelaufen(Instant::now()) => Ok(Arc::clone(&e.key)),
            Some(_) => {
                sessions.remove(id);
                tracing::debug!(session_id = %id, "Abgelaufene Session entfernt");
                Err(SessionError::SessionAbgelaufen)
            }
        }
    }

    /// Entfernt eine Session (idempotent)
    pub async fn remove(&self, id: &SessionId) {
        if self.sessions.write().await.remove(id).is_some() {
            tracing::debug!(session_id = %id, "Session entfernt");
        }
    }

    /// Entfernt alle abgelaufenen Sessions und gibt deren Anzahl zurueck
    pub async fn sweep_expired(&self) -> usize {
        let jetzt = Instant::now();
        let mut sessions = self.sessions.write().await;
        let vorher = sessions.len();
        sessions.retain(|_, e| !e.ist_abgelaufen(jetzt));
        vorher - sessions.len()
    }

    /// Anzahl der nicht abgelaufenen Sessions
    pub async fn active_count(&self) -> usize {
        let jetzt = Instant::now();
        let sessions = self.sessions.read().await;
        sessions.values().filter(|e| !e.ist_abgelaufen(jetzt)).count()
    }

    /// Startet den periodischen Cleanup-Task
    ///
    /// Der Task endet sobald `shutdown` auf `true` wechselt oder der Sender
    /// verworfen wird.
    pub fn start_sweeper(
        self: &Arc<Self>,
        intervall: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let intervall = intervall.max(MIN_CLEANUP_INTERVALL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + intervall, intervall);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let entfernt = store.sweep_expired().await;
                        if entfernt > 0 {
                            tracing::debug!(anzahl = entfernt, "Abgelaufene Sessions bereinigt");
                        }
                    }
                    geaendert = shutdown.changed() => {
                        if geaendert.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Session-Cleanup beendet");
        })
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("standard_ttl", &self.standard_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; 32])
    }

    fn test_id(byte: u8) -> SessionId {
        SessionId::from_bytes([byte; 16])
    }

    #[tokio::test]
    async fn put_und_get() {
        let store = SessionStore::neu(STANDARD_TTL);
        let id = test_id(1);

        let info = store.put(id, test_key(7), STANDARD_TTL).await;
        assert_eq!(info.id, id);
        assert!(info.laeuft_ab_am > info.erstellt_am);

        let key = store.get(&id).await.unwrap();
        assert_eq!(key.as_bytes(), &[7u8; 32]);
    }

    #[tokio::test]
    async fn unbekannte_id_ist_nicht_gefunden() {
        let store = SessionStore::neu(STANDARD_TTL);
        let ergebnis = store.get(&test_id(9)).await;
        assert_eq!(ergebnis.unwrap_err(), SessionError::SessionNichtGefunden);
    }

    #[tokio::test(start_paused = true)]
    async fn nach_ablauf_ist_session_abgelaufen_und_entfernt() {
        let store = SessionStore::neu(STANDARD_TTL);
        let id = test_id(2);
        store.put(id, test_key(1), Duration::from_secs(10)).await;

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get(&id).await.is_ok());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get(&id).await.unwrap_err(), SessionError::SessionAbgelaufen);
        // Beim zweiten Zugriff ist der Eintrag bereits entfernt
        assert_eq!(store.get(&id).await.unwrap_err(), SessionError::SessionNichtGefunden);
    }

    #[tokio::test(start_paused = true)]
    async fn weggeraeumte_session_ist_nicht_gefunden() {
        let store = SessionStore::neu(STANDARD_TTL);
        let id = test_id(6);
        store.put(id, test_key(1), Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.get(&id).await.unwrap_err(), SessionError::SessionNichtGefunden);
    }

    #[tokio::test(start_paused = true)]
    async fn put_ueberschreibt_und_verlaengert() {
        let store = SessionStore::neu(STANDARD_TTL);
        let id = test_id(3);
        store.put(id, test_key(1), Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        store.put(id, test_key(2), Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        let key = store.get(&id).await.unwrap();
        assert_eq!(key.as_bytes(), &[2u8; 32]);
    }

    #[tokio::test]
    async fn remove_ist_idempotent() {
        let store = SessionStore::neu(STANDARD_TTL);
        let id = test_id(4);
        store.put(id, test_key(1), STANDARD_TTL).await;

        store.remove(&id).await;
        store.remove(&id).await;
        assert_eq!(store.get(&id).await.unwrap_err(), SessionError::SessionNichtGefunden);
    }

    #[tokio::test]
    async fn ausgegebener_key_ueberlebt_remove() {
        let store = SessionStore::neu(STANDARD_TTL);
        let id = test_id(5);
        store.put(id, test_key(8), STANDARD_TTL).await;

        let key = store.get(&id).await.unwrap();
        store.remove(&id).await;
        assert_eq!(key.as_bytes(), &[8u8; 32]);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_entfernt_nur_abgelaufene() {
        let store = SessionStore::neu(STANDARD_TTL);
        store.put(test_id(1), test_key(1), Duration::from_secs(5)).await;
        store.put(test_id(2), test_key(2), Duration::from_secs(5)).await;
        store.put(test_id(3), test_key(3), Duration::from_secs(60)).await;
        assert_eq!(store.active_count().await, 3);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.active_count().await, 1);
        assert_eq!(store.sweep_expired().await, 2);
        assert_eq!(store.sweep_expired().await, 0);
        assert!(store.get(&test_id(3)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_raeumt_auf_und_stoppt() {
        let store = SessionStore::neu(STANDARD_TTL);
        store.put(test_id(1), test_key(1), Duration::from_secs(5)).await;

        let (tx, rx) = watch::channel(false);
        let handle = store.start_sweeper(Duration::from_secs(10), rx);

        tokio::time::sleep(Duration::from_secs(11)).await;
        // Eintrag ist durch den Sweeper physisch entfernt, nicht erst beim get()
        assert_eq!(store.sweep_expired().await, 0);
        assert_eq!(store.get(&test_id(1)).await.unwrap_err(), SessionError::SessionNichtGefunden);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_stoppt_wenn_sender_verworfen() {
        let store = SessionStore::neu(STANDARD_TTL);
        let (tx, rx) = watch::channel(false);
        let handle = store.start_sweeper(Duration::from_secs(60), rx);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn parallele_zugriffe() {
        let store = SessionStore::neu(STANDARD_TTL);
        let mut handles = Vec::new();

        for i in 0..32u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let id = test_id(i);
                store.put(id, test_key(i), STANDARD_TTL).await;
                let key = store.get(&id).await.unwrap();
                assert_eq!(key.as_bytes(), &[i; 32]);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.active_count().await, 32);
    }
}
