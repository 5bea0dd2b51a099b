//! Integration tests for the relay server.
//!
//! Each test runs the real accept loop on an ephemeral localhost port with an
//! in-memory [`MockPointer`] as the backend, connects real WebSocket clients
//! with `tokio-tungstenite`, and asserts on the mock's final state.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pointer_core::pointer::{BackendKind, MouseButton, Position};
use pointer_relay::application::{BackendProbe, BackendResolver};
use pointer_relay::domain::{BackendSelection, RelayConfig};
use pointer_relay::infrastructure::backends::mock::{MockPointer, MockProbe};
use pointer_relay::infrastructure::{bind, serve};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Relay {
    addr: SocketAddr,
    resolver: Arc<BackendResolver>,
    running: Arc<AtomicBool>,
    server: JoinHandle<anyhow::Result<()>>,
}

async fn start_relay(candidates: Vec<Box<dyn BackendProbe>>) -> Relay {
    let config = RelayConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        ..RelayConfig::default()
    };
    let resolver = Arc::new(BackendResolver::new(
        candidates,
        BackendSelection::Auto,
        config.serialize_input,
    ));
    let running = Arc::new(AtomicBool::new(true));

    let listener = bind(config.bind_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve(
        listener,
        Arc::new(config),
        Arc::clone(&resolver),
        Arc::clone(&running),
    ));

    Relay {
        addr,
        resolver,
        running,
        server,
    }
}

async fn relay_with_mock(mock: &Arc<MockPointer>) -> Relay {
    start_relay(vec![Box::new(MockProbe::ready(
        BackendKind::Native,
        Arc::clone(mock),
    ))])
    .await
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    client
}

async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string())).await.unwrap();
}

async fn send_move(client: &mut Client, dx: i32, dy: i32) {
    let frame = format!(r#"{{"name":"mouseEvent","data":{{"event":"move","dx":{dx},"dy":{dy}}}}}"#);
    send_text(client, &frame).await;
}

/// Polls `check` until it holds or [`WAIT`] elapses.
async fn eventually(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_moves_are_applied_relative_to_current_position() {
    // Arrange
    let mock = Arc::new(MockPointer::at(100, 100));
    let relay = relay_with_mock(&mock).await;
    let mut client = connect(relay.addr).await;

    // Act
    send_move(&mut client, 10, 10).await;
    send_move(&mut client, 5, -3).await;

    // Assert
    assert!(eventually(|| mock.current() == Position::new(115, 107)).await);
    assert_eq!(
        mock.moves(),
        vec![Position::new(110, 110), Position::new(115, 107)]
    );
}

#[tokio::test]
async fn test_clicks_in_both_frame_shapes() {
    let mock = Arc::new(MockPointer::new());
    let relay = relay_with_mock(&mock).await;
    let mut client = connect(relay.addr).await;

    send_text(&mut client, r#"{"name":"mouseAction","data":{"action":"left_click"}}"#).await;
    send_text(&mut client, r#"["mouseAction",{"action":"right_click"}]"#).await;

    assert!(eventually(|| mock.clicks().len() == 2).await);
    assert_eq!(mock.clicks(), vec![MouseButton::Left, MouseButton::Right]);
}

#[tokio::test]
async fn test_malformed_input_is_ignored_and_session_continues() {
    // Arrange
    let mock = Arc::new(MockPointer::at(0, 0));
    let relay = relay_with_mock(&mock).await;
    let mut client = connect(relay.addr).await;

    // Act
    send_text(&mut client, "this is not json").await;
    send_text(&mut client, "42").await;
    send_text(&mut client, r#"{"name":"mouseEvent","data":{"event":"zoom","dx":1,"dy":1}}"#).await;
    send_text(
        &mut client,
        r#"{"name":"mouseEvent","data":{"event":"move","dx":"ten","dy":1}}"#,
    )
    .await;
    send_text(&mut client, r#"{"name":"mouseAction","data":{"action":"middle_click"}}"#).await;
    send_text(&mut client, r#"{"name":"keyboard","data":{"key":"a"}}"#).await;
    client.send(Message::Binary(vec![0xde, 0xad])).await.unwrap();
    send_move(&mut client, 7, 8).await;

    // Assert: only the final valid move had an effect
    assert!(eventually(|| mock.current() == Position::new(7, 8)).await);
    assert_eq!(mock.moves(), vec![Position::new(7, 8)]);
    assert!(mock.clicks().is_empty());
}

#[tokio::test]
async fn test_fractional_deltas_move_by_whole_pixels() {
    let mock = Arc::new(MockPointer::at(10, 10));
    let relay = relay_with_mock(&mock).await;
    let mut client = connect(relay.addr).await;

    send_text(
        &mut client,
        r#"{"name":"mouseEvent","data":{"event":"move","dx":2.6,"dy":5.0}}"#,
    )
    .await;

    assert!(eventually(|| mock.current() == Position::new(12, 15)).await);
}

#[tokio::test]
async fn test_no_backend_keeps_connection_open() {
    // Arrange
    let relay = start_relay(vec![
        Box::new(MockProbe::failing(BackendKind::Native)),
        Box::new(MockProbe::failing(BackendKind::Automation)),
    ])
    .await;
    let mut client = connect(relay.addr).await;

    // Act
    send_move(&mut client, 10, 10).await;
    send_text(&mut client, r#"{"name":"mouseAction","data":{"action":"left_click"}}"#).await;
    client.send(Message::Ping(b"still there?".to_vec())).await.unwrap();

    // Assert: the server still answers on the same connection, and nothing
    // but the pong comes back (the relay never sends application messages).
    let reply = tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Pong(payload))) => return Some(payload),
                Some(Ok(Message::Text(text))) => panic!("unexpected text from relay: {text}"),
                Some(Ok(Message::Binary(data))) => {
                    panic!("unexpected binary from relay ({} bytes)", data.len())
                }
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(reply.as_deref(), Some(&b"still there?"[..]));

    let handle = relay.resolver.resolve().await;
    assert_eq!(handle.kind(), BackendKind::Unavailable);
}

#[tokio::test]
async fn test_disconnect_does_not_affect_other_sessions() {
    // Arrange
    let mock = Arc::new(MockPointer::at(0, 0));
    let relay = relay_with_mock(&mock).await;
    let mut leaving = connect(relay.addr).await;
    let mut staying = connect(relay.addr).await;

    send_move(&mut leaving, 1, 1).await;
    assert!(eventually(|| mock.current() == Position::new(1, 1)).await);

    // Act
    leaving.close(None).await.unwrap();
    drop(leaving);
    send_move(&mut staying, 2, 3).await;

    // Assert
    assert!(eventually(|| mock.current() == Position::new(3, 4)).await);
}

#[tokio::test]
async fn test_concurrent_clients_do_not_lose_moves() {
    // Arrange: the yield makes unserialized moves interleave
    let mock = Arc::new(MockPointer::at(0, 0).with_yield_between_read_and_write());
    let relay = relay_with_mock(&mock).await;
    let mut a = connect(relay.addr).await;
    let mut b = connect(relay.addr).await;

    // Act
    for _ in 0..10 {
        send_move(&mut a, 1, 0).await;
        send_move(&mut b, 0, 1).await;
    }

    // Assert: every delta from both sessions lands
    assert!(eventually(|| mock.current() == Position::new(10, 10)).await);
    assert_eq!(mock.moves().len(), 20);
}

#[tokio::test]
async fn test_probing_happens_once_across_many_clients() {
    // Arrange
    let mock = Arc::new(MockPointer::new());
    let probe = MockProbe::ready(BackendKind::Native, Arc::clone(&mock));
    let probes = probe.probe_count();
    let relay = start_relay(vec![Box::new(probe)]).await;

    // Act
    let mut clients = Vec::new();
    for _ in 0..8 {
        let mut client = connect(relay.addr).await;
        send_move(&mut client, 1, 1).await;
        clients.push(client);
    }

    // Assert
    assert!(eventually(|| mock.current() == Position::new(8, 8)).await);
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_clearing_running_flag_stops_accept_loop() {
    // Arrange
    let mock = Arc::new(MockPointer::new());
    let relay = relay_with_mock(&mock).await;

    // Act
    relay.running.store(false, Ordering::Relaxed);
    let result = tokio::time::timeout(WAIT, relay.server).await;

    // Assert
    let joined = result.expect("serve must return after the flag is cleared");
    assert!(joined.unwrap().is_ok());
}
