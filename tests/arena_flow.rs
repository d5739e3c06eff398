//! End-to-end arena flow over real WebSocket connections
//!
//! Starts the server on an ephemeral port with short round timings and drives
//! two clients through join, movement relay, a round start and a lethal hit.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use arena_server::config::{Config, RoundConfig};
use arena_server::ws::protocol::{
    ClientMsg, EndReason, HitClaim, MovementUpdate, PlayerId, RespawnRequest, ServerMsg,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    id: PlayerId,
}

impl TestClient {
    async fn connect(addr: &str) -> Self {
        let (mut ws, _) = connect_async(format!("ws://{}/ws", addr))
            .await
            .expect("websocket connect");

        let id = match next_msg(&mut ws).await {
            ServerMsg::Welcome(welcome) => welcome.id,
            other => panic!("expected welcome first, got {other:?}"),
        };
        Self { ws, id }
    }

    async fn send(&mut self, msg: &ClientMsg) {
        let text = serde_json::to_string(msg).unwrap();
        self.ws.send(Message::Text(text)).await.unwrap();
    }

    async fn recv(&mut self) -> ServerMsg {
        next_msg(&mut self.ws).await
    }

    /// Read until `pred` matches, returning everything seen including the match
    async fn recv_until<F>(&mut self, pred: F) -> Vec<ServerMsg>
    where
        F: Fn(&ServerMsg) -> bool,
    {
        let mut seen = Vec::new();
        loop {
            let msg = self.recv().await;
            let done = pred(&msg);
            seen.push(msg);
            if done {
                return seen;
            }
        }
    }
}

async fn next_msg(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) -> ServerMsg {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for server message")
            .expect("stream ended")
            .expect("websocket error");

        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("valid server message");
        }
    }
}

async fn start_server() -> String {
    let round = RoundConfig {
        min_players: 2,
        countdown_secs: 1,
        round_duration_secs: 30,
        intermission_secs: 1,
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(arena_server::serve(
        listener,
        Config::local(round),
        std::future::pending(),
    ));
    addr
}

#[tokio::test]
async fn join_sends_roster_and_round_snapshot() {
    let addr = start_server().await;

    let mut a = TestClient::connect(&addr).await;
    match a.recv().await {
        ServerMsg::CurrentPlayers(roster) => {
            assert_eq!(roster.len(), 1);
            let me = &roster[&a.id];
            assert_eq!(me.health, 100);
            assert!(me.alive);
        }
        other => panic!("expected currentPlayers, got {other:?}"),
    }
    match a.recv().await {
        ServerMsg::GameState(state) => {
            assert_eq!(state.round, 0);
            assert!(!state.round_active);
            assert_eq!(state.scores.get(&a.id), Some(0));
        }
        other => panic!("expected gameState, got {other:?}"),
    }

    let b = TestClient::connect(&addr).await;
    match a.recv().await {
        ServerMsg::NewPlayer(view) => assert_eq!(view.id, b.id),
        other => panic!("expected newPlayer, got {other:?}"),
    }
}

#[tokio::test]
async fn round_plays_out_to_elimination() {
    let addr = start_server().await;

    let mut a = TestClient::connect(&addr).await;
    let mut b = TestClient::connect(&addr).await;

    // Movement reaches the peer only
    a.send(&ClientMsg::PlayerMovement(MovementUpdate {
        x: 3.0,
        y: 1.0,
        z: -2.0,
        rotation: 1.5,
    }))
    .await;
    let seen = b
        .recv_until(|msg| matches!(msg, ServerMsg::PlayerMoved(_)))
        .await;
    match seen.last() {
        Some(ServerMsg::PlayerMoved(moved)) => {
            assert_eq!(moved.id, a.id);
            assert_eq!(moved.x, 3.0);
            assert_eq!(moved.rotation, 1.5);
        }
        other => panic!("expected playerMoved, got {other:?}"),
    }

    let a_seen = a
        .recv_until(|msg| matches!(msg, ServerMsg::RoundStart(_)))
        .await;
    assert!(a_seen
        .iter()
        .all(|msg| !matches!(msg, ServerMsg::PlayerMoved(_))));
    assert!(a_seen.iter().any(|msg| matches!(
        msg,
        ServerMsg::RoundCountdown(c) if c.message == "Round 1 starting in..."
    )));
    match a_seen.last() {
        Some(ServerMsg::RoundStart(start)) => {
            assert_eq!(start.round, 1);
            assert_eq!(start.duration, 30);
            assert_eq!(start.players.len(), 2);
        }
        other => panic!("expected roundStart, got {other:?}"),
    }
    b.recv_until(|msg| matches!(msg, ServerMsg::RoundStart(_)))
        .await;

    // Lethal hit claim from A against B
    a.send(&ClientMsg::Hit(HitClaim {
        target_id: b.id.clone(),
        damage: 120,
    }))
    .await;

    let b_seen = b
        .recv_until(|msg| matches!(msg, ServerMsg::RoundEnd(_)))
        .await;
    assert!(b_seen
        .iter()
        .any(|msg| matches!(msg, ServerMsg::TakeDamage(120))));

    let a_seen = a
        .recv_until(|msg| matches!(msg, ServerMsg::RoundEnd(_)))
        .await;
    assert!(a_seen.iter().any(|msg| matches!(
        msg,
        ServerMsg::PlayerKilled(k) if k.killer == a.id && k.victim == b.id
    )));
    // Damage goes to the victim only
    assert!(a_seen
        .iter()
        .all(|msg| !matches!(msg, ServerMsg::TakeDamage(_))));

    match a_seen.last() {
        Some(ServerMsg::RoundEnd(end)) => {
            assert_eq!(end.round, 1);
            assert_eq!(end.reason, EndReason::Elimination);
            assert_eq!(end.winner.as_ref(), Some(&a.id));
            assert_eq!(end.scores.get(&a.id), Some(1));
            assert_eq!(end.scores.get(&b.id), Some(0));
        }
        other => panic!("expected roundEnd, got {other:?}"),
    }

    // Respawn is honoured between rounds
    b.send(&ClientMsg::RequestRespawn(RespawnRequest)).await;
    let seen = b
        .recv_until(|msg| matches!(msg, ServerMsg::Respawn(_)))
        .await;
    assert!(matches!(seen.last(), Some(ServerMsg::Respawn(pos)) if pos.y == 1.0));
}

#[tokio::test]
async fn malformed_frames_do_not_close_the_connection() {
    let addr = start_server().await;

    let mut a = TestClient::connect(&addr).await;
    a.ws.send(Message::Text("{not json".to_string()))
        .await
        .unwrap();
    a.ws.send(Message::Text(
        r#"{"event":"hit","data":{"targetId":"x","damage":-5}}"#.to_string(),
    ))
    .await
    .unwrap();

    let b = TestClient::connect(&addr).await;
    let seen = a
        .recv_until(|msg| matches!(msg, ServerMsg::NewPlayer(_)))
        .await;
    assert!(matches!(seen.last(), Some(ServerMsg::NewPlayer(v)) if v.id == b.id));
}

async fn get_health(addr: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    tokio_test::assert_ok!(
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
    );
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn health_reports_players() {
    let addr = start_server().await;
    let _a = TestClient::connect(&addr).await;

    // Status is published right after the connect step completes
    let mut response = get_health(&addr).await;
    for _ in 0..20 {
        if response.contains(r#""players":1"#) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
        response = get_health(&addr).await;
    }

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""players":1"#));
    assert!(response.contains(r#""phase":"idle""#));
    assert!(response.contains(r#""roundActive":false"#));
}
