use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use chat_tetris::adapter::{run_server, ServerConfig};

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect failed");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send(&mut self, msg: Value) {
        self.send_raw(&msg.to_string()).await;
    }

    async fn next(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }

    /// Next message of `kind`, skipping snapshot broadcasts.
    async fn expect(&mut self, kind: &str) -> Value {
        loop {
            let v = self.next().await;
            if v["type"] == kind {
                return v;
            }
            assert_eq!(v["type"], "snapshot", "expected {}, got {}", kind, v);
        }
    }

    /// Next broadcast of `kind` for `match_id`.
    async fn expect_for(&mut self, kind: &str, match_id: &Value) -> Value {
        loop {
            let v = self.expect(kind).await;
            if &v["match_id"] == match_id {
                return v;
            }
        }
    }

    /// The ack for a stop and the ended broadcast it causes, in either order.
    async fn expect_stopped(&mut self, seq: u64, match_id: &Value) -> Value {
        let mut acked = false;
        let mut ended = None;
        while !acked || ended.is_none() {
            let v = self.next().await;
            match v["type"].as_str() {
                Some("snapshot") => {}
                Some("ack") => {
                    assert_eq!(v["seq"], seq);
                    acked = true;
                }
                Some("ended") if &v["match_id"] == match_id => ended = Some(v),
                Some("ended") => {}
                _ => panic!("unexpected message while stopping: {}", v),
            }
        }
        ended.unwrap()
    }

    async fn hello(&mut self, seq: u64, user: &str) {
        self.send(json!({
            "type": "hello",
            "seq": seq,
            "client": { "name": "e2e-test", "version": "1.0.0" },
            "user": user,
        }))
        .await;
        let welcome = self.expect("welcome").await;
        assert_eq!(welcome["seq"], seq);
        assert_eq!(welcome["protocol_version"], "1.0.0");
    }
}

async fn spawn_server(start_delay: Duration) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let config = ServerConfig {
        port: 0,
        start_delay,
        ..ServerConfig::default()
    };
    let (ready_tx, ready_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let _ = run_server(config, Some(ready_tx)).await;
    });
    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("server did not signal ready")
        .expect("ready channel dropped");
    (addr, handle)
}

#[tokio::test]
async fn adapter_start_control_snapshot_and_stop() {
    let (addr, server) = spawn_server(Duration::ZERO).await;
    let mut alice = TestClient::connect(addr).await;
    alice.hello(1, "alice").await;

    alice
        .send(json!({ "type": "start", "seq": 2, "channel": "general", "mode": "1p" }))
        .await;
    let started = alice.expect("started").await;
    assert_eq!(started["seq"], 2);
    assert_eq!(started["user"], "alice");
    assert_eq!(started["mode"], "1p");
    let match_id = started["match_id"].clone();

    let snapshot = alice.expect_for("snapshot", &match_id).await;
    assert_eq!(snapshot["board"].as_array().unwrap().len(), 16);
    assert_eq!(snapshot["board"][0].as_array().unwrap().len(), 10);
    assert_eq!(snapshot["session"], format!("general:{}", match_id));
    assert_eq!(snapshot["playable"], true);

    alice
        .send(json!({ "type": "control", "seq": 3, "match_id": match_id, "action": "btn_left" }))
        .await;
    let ack = alice.expect("ack").await;
    assert_eq!(ack["seq"], 3);
    assert_eq!(ack["status"], "ok");

    // Someone else can't press the buttons of a single-player match.
    let mut bob = TestClient::connect(addr).await;
    bob.hello(1, "bob").await;
    bob.send(json!({ "type": "control", "seq": 2, "match_id": match_id, "action": "left" }))
        .await;
    let denied = bob.expect("error").await;
    assert_eq!(denied["code"], "not_allowed");

    bob.send(json!({ "type": "control", "seq": 3, "match_id": 9999, "action": "left" }))
        .await;
    let missing = bob.expect("error").await;
    assert_eq!(missing["code"], "game_not_found");

    alice
        .send(json!({ "type": "control", "seq": 4, "match_id": match_id, "action": "stop" }))
        .await;
    let ended = alice.expect_stopped(4, &match_id).await;
    assert_eq!(ended["reason"], "stopped");
    assert_eq!(ended["user"], "alice");

    // The match is gone once it has ended.
    alice
        .send(json!({ "type": "control", "seq": 5, "match_id": match_id, "action": "left" }))
        .await;
    assert_eq!(alice.expect("error").await["code"], "game_not_found");

    server.abort();
}

#[tokio::test]
async fn adapter_rejects_bad_input() {
    let (addr, server) = spawn_server(Duration::ZERO).await;
    let mut client = TestClient::connect(addr).await;

    client
        .send(json!({ "type": "start", "seq": 1, "channel": "general" }))
        .await;
    let err = client.next().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "handshake_required");

    client.hello(2, "carol").await;

    client.send(json!({ "type": "dance", "seq": 3 })).await;
    let err = client.next().await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 3);

    // seq 3 was already used.
    client
        .send(json!({ "type": "offer", "seq": 3, "channel": "general" }))
        .await;
    let err = client.next().await;
    assert_eq!(err["code"], "invalid_seq");

    client.send_raw(r#"{"type":"control","seq":4,"match_id":"#).await;
    let err = client.next().await;
    assert_eq!(err["code"], "invalid_message");

    client
        .send(json!({ "type": "control", "seq": 5, "match_id": 1, "action": "jump" }))
        .await;
    let err = client.next().await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 5);

    server.abort();
}

#[tokio::test]
async fn adapter_offer_accept_pairs_two_players() {
    let (addr, server) = spawn_server(Duration::from_millis(50)).await;
    let mut alice = TestClient::connect(addr).await;
    let mut bob = TestClient::connect(addr).await;
    alice.hello(1, "alice").await;
    bob.hello(1, "bob").await;

    alice
        .send(json!({ "type": "offer", "seq": 2, "channel": "arena" }))
        .await;
    let offered = alice.expect("offered").await;
    assert_eq!(offered["user"], "alice");
    let offer_id = offered["offer_id"].clone();

    alice
        .send(json!({ "type": "accept", "seq": 3, "offer_id": offer_id }))
        .await;
    assert_eq!(alice.expect("error").await["code"], "not_allowed");

    bob.send(json!({ "type": "accept", "seq": 2, "offer_id": 4242 }))
        .await;
    assert_eq!(bob.expect("error").await["code"], "offer_not_found");

    bob.send(json!({ "type": "accept", "seq": 3, "offer_id": offer_id }))
        .await;
    let bob_started = bob.expect("started").await;
    assert_eq!(bob_started["seq"], 3);
    assert_eq!(bob_started["mode"], "2p");
    assert_eq!(bob_started["opponent"], "alice");

    let alice_started = alice.expect("started").await;
    assert_eq!(alice_started["seq"], 2);
    assert_eq!(alice_started["opponent"], "bob");
    let alice_match = alice_started["match_id"].clone();
    let bob_match = bob_started["match_id"].clone();
    assert_ne!(alice_match, bob_match);

    // An accepted offer is gone.
    bob.send(json!({ "type": "accept", "seq": 4, "offer_id": offer_id }))
        .await;
    assert_eq!(bob.expect("error").await["code"], "offer_not_found");

    // Alice quits first and loses.
    alice
        .send(json!({ "type": "control", "seq": 4, "match_id": alice_match, "action": "stop" }))
        .await;
    alice.expect_stopped(4, &alice_match).await;
    let ended = bob.expect_for("ended", &alice_match).await;
    assert_eq!(ended["user"], "alice");
    assert_eq!(ended["winner"], "bob");

    bob.send(json!({ "type": "control", "seq": 5, "match_id": bob_match, "action": "stop" }))
        .await;
    let ended = alice.expect_for("ended", &bob_match).await;
    assert_eq!(ended["user"], "bob");
    assert!(ended.get("winner").is_none());

    server.abort();
}

#[tokio::test]
async fn adapter_drops_offers_of_disconnected_clients() {
    let (addr, server) = spawn_server(Duration::ZERO).await;
    let mut alice = TestClient::connect(addr).await;
    let mut bob = TestClient::connect(addr).await;
    alice.hello(1, "alice").await;
    bob.hello(1, "bob").await;

    alice
        .send(json!({ "type": "offer", "seq": 2, "channel": "arena" }))
        .await;
    let offer_id = alice.expect("offered").await["offer_id"].clone();

    drop(alice);
    tokio::time::sleep(Duration::from_millis(200)).await;

    bob.send(json!({ "type": "accept", "seq": 2, "offer_id": offer_id }))
        .await;
    assert_eq!(bob.expect("error").await["code"], "offer_not_found");

    // The server keeps serving everyone else.
    bob.send(json!({ "type": "start", "seq": 3, "channel": "arena", "mode": "1p" }))
        .await;
    let started = bob.expect("started").await;
    assert_eq!(started["user"], "bob");

    server.abort();
}
