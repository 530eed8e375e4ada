//! Ende-zu-Ende: echter Socket, Handshake, WebSocket-Streaming

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use voxgate_crypto::{
    derive_session_key, FrameSchutz, KeyPair, SecureChannel, SessionKey, STANDARD_KDF_LABEL,
};
use voxgate_observability::GatewayMetrics;
use voxgate_session::{SessionStore, STANDARD_TTL};
use voxgate_signaling::{GatewayServer, GatewayState, HandshakeService};
use voxgate_voice::{Delegates, StreamKonfig, StreamOrchestrator};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestGateway {
    adresse: std::net::SocketAddr,
    state: GatewayState,
    store: Arc<SessionStore>,
    metriken: GatewayMetrics,
    shutdown: watch::Sender<bool>,
    server: tokio::task::JoinHandle<()>,
}

async fn gateway_starten(schutz: FrameSchutz) -> TestGateway {
    let store = SessionStore::neu(STANDARD_TTL);
    let metriken = GatewayMetrics::neu().unwrap();
    let konfig = StreamKonfig {
        frame_schutz: schutz,
        ..StreamKonfig::default()
    };
    let state = GatewayState::neu(
        HandshakeService::neu(Arc::clone(&store)).mit_metriken(metriken.clone()),
        StreamOrchestrator::neu(Arc::clone(&store), Delegates::loopback(), konfig)
            .mit_metriken(metriken.clone()),
    );

    let server = GatewayServer::binden("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let adresse = server.lokale_adresse();
    let (shutdown, rx) = watch::channel(false);
    let server_state = state.clone();
    let server = tokio::spawn(async move {
        server.starten(server_state, rx).await.unwrap();
    });

    TestGateway {
        adresse,
        state,
        store,
        metriken,
        shutdown,
        server,
    }
}

/// Handshake aus Client-Sicht: liefert Session-ID und den selbst abgeleiteten Schluessel
async fn handshake(gateway: &TestGateway) -> (String, SessionKey) {
    use base64::Engine as _;

    let mut client = KeyPair::generate().unwrap();
    let antwort = gateway
        .state
        .handshake
        .handshake(client.public_key())
        .await
        .unwrap();

    let server_pub = base64::engine::general_purpose::STANDARD
        .decode(&antwort.server_public_key)
        .unwrap();
    let shared = client.derive_shared_secret(&server_pub).unwrap();
    let key = derive_session_key(&shared, STANDARD_KDF_LABEL).unwrap();
    (antwort.session_id.to_hex(), key)
}

async fn verbinden(gateway: &TestGateway, session_id: &str) -> Client {
    let url = format!("ws://{}/voice/{}", gateway.adresse, session_id);
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Naechste Daten- oder Close-Nachricht (Ping/Pong uebersprungen)
async fn naechste(ws: &mut Client) -> Message {
    loop {
        match ws.next().await {
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(nachricht)) => return nachricht,
            anderes => panic!("Nachricht erwartet: {anderes:?}"),
        }
    }
}

fn close_code(nachricht: Message) -> u16 {
    match nachricht {
        Message::Close(Some(frame)) => u16::from(frame.code),
        anderes => panic!("Close erwartet: {anderes:?}"),
    }
}

#[tokio::test]
async fn client_und_server_teilen_den_schluessel() {
    let gateway = gateway_starten(FrameSchutz::Keiner).await;
    let (session_id, client_key) = handshake(&gateway).await;

    let id = voxgate_core::SessionId::from_hex(&session_id).unwrap();
    let server_key = gateway.store.get(&id).await.unwrap();
    assert_eq!(client_key.as_bytes(), server_key.as_bytes());
}

#[tokio::test]
async fn audio_echo_ueber_websocket() {
    let gateway = gateway_starten(FrameSchutz::Keiner).await;
    let (session_id, key) = handshake(&gateway).await;
    let channel = SecureChannel::default();
    let mut ws = verbinden(&gateway, &session_id).await;

    for audio in [b"erster frame".to_vec(), vec![], vec![0xAA; 4096]] {
        let frame = channel.encrypt(&audio, &key).unwrap();
        ws.send(Message::Binary(frame.to_bytes())).await.unwrap();

        match naechste(&mut ws).await {
            Message::Binary(bytes) => {
                assert_eq!(channel.decrypt_bytes(&bytes, &key).unwrap(), audio);
            }
            anderes => panic!("Binaer-Frame erwartet: {anderes:?}"),
        }
    }

    assert_eq!(gateway.metriken.handshakes_total.get(), 1);
    assert_eq!(gateway.metriken.active_sessions.get(), 1);
}

#[tokio::test]
async fn hmac_modus_ueber_websocket() {
    let gateway = gateway_starten(FrameSchutz::Hmac).await;
    let (session_id, key) = handshake(&gateway).await;
    let channel = SecureChannel::neu(FrameSchutz::Hmac);
    let mut ws = verbinden(&gateway, &session_id).await;

    let frame = channel.encrypt(b"mit tag", &key).unwrap();
    ws.send(Message::Binary(frame.to_bytes())).await.unwrap();
    match naechste(&mut ws).await {
        Message::Binary(bytes) => {
            assert_eq!(channel.decrypt_bytes(&bytes, &key).unwrap(), b"mit tag");
        }
        anderes => panic!("Binaer-Frame erwartet: {anderes:?}"),
    }

    // Manipulierter Frame beendet die Verbindung
    let mut bytes = channel.encrypt(b"x", &key).unwrap().to_bytes();
    bytes[20] ^= 0xFF;
    ws.send(Message::Binary(bytes)).await.unwrap();
    assert_eq!(close_code(naechste(&mut ws).await), 1007);
}

#[tokio::test]
async fn unbekannte_session_wird_mit_1008_geschlossen() {
    let gateway = gateway_starten(FrameSchutz::Keiner).await;
    let mut ws = verbinden(&gateway, &"0".repeat(32)).await;

    assert_eq!(close_code(naechste(&mut ws).await), 1008);
    assert_eq!(gateway.metriken.frames_total.get(), 0);
}

#[tokio::test]
async fn kaputte_session_id_wird_vor_dem_upgrade_abgelehnt() {
    let gateway = gateway_starten(FrameSchutz::Keiner).await;
    let url = format!("ws://{}/voice/kein-hex", gateway.adresse);
    assert!(connect_async(url).await.is_err());
}

#[tokio::test]
async fn textnachricht_wird_mit_1007_geschlossen() {
    let gateway = gateway_starten(FrameSchutz::Keiner).await;
    let (session_id, _) = handshake(&gateway).await;
    let mut ws = verbinden(&gateway, &session_id).await;

    ws.send(Message::Text("hallo".into())).await.unwrap();
    assert_eq!(close_code(naechste(&mut ws).await), 1007);
}

#[tokio::test]
async fn kaputter_frame_wird_mit_1007_geschlossen() {
    let gateway = gateway_starten(FrameSchutz::Keiner).await;
    let (session_id, _) = handshake(&gateway).await;
    let mut ws = verbinden(&gateway, &session_id).await;

    ws.send(Message::Binary(vec![1u8; 10])).await.unwrap();
    assert_eq!(close_code(naechste(&mut ws).await), 1007);
}

#[tokio::test]
async fn server_faehrt_sauber_herunter() {
    let gateway = gateway_starten(FrameSchutz::Keiner).await;
    gateway.shutdown.send(true).unwrap();
    gateway.server.await.unwrap();
}
