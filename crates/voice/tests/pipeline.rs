//! Mehrere gleichzeitige Verbindungen auf einem gemeinsamen Session-Store

use std::sync::Arc;

use voxgate_core::SessionId;
use voxgate_crypto::{derive_session_key, KeyPair, SecureChannel, STANDARD_KDF_LABEL};
use voxgate_session::{SessionStore, STANDARD_TTL};
use voxgate_voice::transport::memory::{paar, Ausgang};
use voxgate_voice::{Delegates, StreamKonfig, StreamOrchestrator};

/// Simuliert einen Handshake: Client und Server leiten denselben Schluessel ab
async fn handshake(store: &SessionStore) -> (SessionId, voxgate_crypto::SessionKey) {
    let mut client = KeyPair::generate().unwrap();
    let mut server = KeyPair::generate().unwrap();
    let client_pub = *client.public_key();
    let server_pub = *server.public_key();

    let server_key =
        derive_session_key(&server.derive_shared_secret(&client_pub).unwrap(), STANDARD_KDF_LABEL)
            .unwrap();
    let client_key =
        derive_session_key(&client.derive_shared_secret(&server_pub).unwrap(), STANDARD_KDF_LABEL)
            .unwrap();

    let id = SessionId::generate().unwrap();
    store.put(id, server_key, STANDARD_TTL).await;
    (id, client_key)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallele_verbindungen_bleiben_getrennt() {
    let store = SessionStore::neu(STANDARD_TTL);
    let orchestrator = Arc::new(StreamOrchestrator::neu(
        Arc::clone(&store),
        Delegates::loopback(),
        StreamKonfig::default(),
    ));

    let mut clients = Vec::new();
    for i in 0..8u8 {
        let (id, key) = handshake(&store).await;
        let (mut transport, mut client) = paar(16);

        let orchestrator = Arc::clone(&orchestrator);
        let server = tokio::spawn(async move {
            orchestrator.verbindung_bedienen(id, &mut transport).await
        });

        clients.push(tokio::spawn(async move {
            let channel = SecureChannel::default();
            for n in 0..5u8 {
                let audio = vec![i; usize::from(n) * 7];
                let frame = channel.encrypt(&audio, &key).unwrap();
                client.binaer_senden(frame.to_bytes()).await.unwrap();

                match client.empfangen().await {
                    Some(Ausgang::Frame(bytes)) => {
                        assert_eq!(channel.decrypt_bytes(&bytes, &key).unwrap(), audio);
                    }
                    anderes => panic!("Frame erwartet: {anderes:?}"),
                }
            }
            client.eingang_schliessen();
            let ende = server.await.unwrap();
            assert_eq!(ende.frames, 5);
            assert!(ende.fehler.is_none());
        }));
    }

    for c in clients {
        c.await.unwrap();
    }
    assert_eq!(store.active_count().await, 8);
}

#[tokio::test]
async fn entfernte_session_beendet_laufende_verbindung() {
    let store = SessionStore::neu(STANDARD_TTL);
    let orchestrator = StreamOrchestrator::neu(
        Arc::clone(&store),
        Delegates::loopback(),
        StreamKonfig::default(),
    );
    let (id, key) = handshake(&store).await;
    let channel = SecureChannel::default();
    let (mut transport, mut client) = paar(8);

    let server =
        tokio::spawn(async move { orchestrator.verbindung_bedienen(id, &mut transport).await });

    client
        .binaer_senden(channel.encrypt(b"eins", &key).unwrap().to_bytes())
        .await
        .unwrap();
    assert!(matches!(client.empfangen().await, Some(Ausgang::Frame(_))));

    store.remove(&id).await;
    client
        .binaer_senden(channel.encrypt(b"zwei", &key).unwrap().to_bytes())
        .await
        .unwrap();

    match client.empfangen().await {
        Some(Ausgang::Geschlossen(grund)) => assert_eq!(grund.code, 1008),
        anderes => panic!("Close erwartet: {anderes:?}"),
    }
    assert_eq!(server.await.unwrap().frames, 1);
}
