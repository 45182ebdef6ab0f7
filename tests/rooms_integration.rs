//! End-to-end tests: a real server on an ephemeral port, real WebSocket clients.

use coderoom::config::Config;
use coderoom::db::MemoryRoomDirectory;
use coderoom::models::CreateRoomResponse;
use coderoom::routes::create_app;
use coderoom::state::AppState;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

async fn start_server(config: Config) -> (SocketAddr, AppState) {
    let state = AppState::new(&config, Arc::new(MemoryRoomDirectory::default())).unwrap();
    let app = create_app(state.clone(), &config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn create_room(addr: SocketAddr) -> String {
    let created: CreateRoomResponse = reqwest::Client::new()
        .post(format!("http://{addr}/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    created.room_id
}

async fn connect(addr: SocketAddr, room_id: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/{room_id}")).await.unwrap();
    ws
}

async fn recv(ws: &mut Client) -> Message {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("websocket error");
        match msg {
            Message::Ping(_) | Message::Pong(_) => continue,
            other => return other,
        }
    }
}

async fn recv_text(ws: &mut Client) -> String {
    match recv(ws).await {
        Message::Text(text) => text.as_str().to_string(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

async fn assert_silent(ws: &mut Client) {
    assert!(timeout(QUIET, ws.next()).await.is_err(), "unexpected frame");
}

async fn wait_for_snapshot(state: &AppState, room_id: &str, expected: &str) {
    let store = state.manager.store();
    timeout(WAIT, async {
        while store.get_snapshot(room_id).await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("snapshot never reached the expected value");
}

async fn wait_for_members(state: &AppState, expected: usize) {
    let store = state.manager.store();
    timeout(WAIT, async {
        while store.stats().await.members != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("member count never reached the expected value");
}

#[tokio::test]
async fn late_joiner_sees_latest_code_and_updates_flow_back() {
    let (addr, state) = start_server(Config::default()).await;
    let room_id = create_room(addr).await;

    let mut a = connect(addr, &room_id).await;
    assert_eq!(recv_text(&mut a).await, r#"{"type":"init","code":""}"#);

    a.send(Message::text(r#"{"type":"code_update","code":"print(1)"}"#))
        .await
        .unwrap();
    wait_for_snapshot(&state, &room_id, "print(1)").await;

    let mut b = connect(addr, &room_id).await;
    assert_eq!(recv_text(&mut b).await, r#"{"type":"init","code":"print(1)"}"#);

    let update = r#"{"type":"code_update","code":"print(2)"}"#;
    b.send(Message::text(update)).await.unwrap();
    assert_eq!(recv_text(&mut a).await, update);
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
    assert_eq!(state.manager.store().get_snapshot(&room_id).await, "print(2)");
}

#[tokio::test]
async fn unknown_room_is_refused_without_frames() {
    let (addr, state) = start_server(Config::default()).await;

    match connect_async(format!("ws://{addr}/ws/does-not-exist")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 403),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("handshake to an unknown room succeeded"),
    }
    assert!(!state.manager.store().contains("does-not-exist"));
    assert_eq!(state.manager.store().stats().await.rooms, 0);
}

#[tokio::test]
async fn opaque_frames_are_relayed_verbatim_and_never_echoed() {
    let (addr, state) = start_server(Config::default()).await;
    let room_id = create_room(addr).await;

    let mut a = connect(addr, &room_id).await;
    let mut b = connect(addr, &room_id).await;
    let mut c = connect(addr, &room_id).await;
    for ws in [&mut a, &mut b, &mut c] {
        recv_text(ws).await;
    }

    let cursor = r#"{ "type" : "cursor", "line": 4, "code": "not applied" }"#;
    a.send(Message::text(cursor)).await.unwrap();
    assert_eq!(recv_text(&mut b).await, cursor);
    assert_eq!(recv_text(&mut c).await, cursor);

    let garbage = "}{ definitely not json";
    a.send(Message::text(garbage)).await.unwrap();
    assert_eq!(recv_text(&mut b).await, garbage);
    assert_eq!(recv_text(&mut c).await, garbage);

    a.send(Message::binary(vec![1u8, 2, 3, 255])).await.unwrap();
    for ws in [&mut b, &mut c] {
        match recv(ws).await {
            Message::Binary(bytes) => assert_eq!(&bytes[..], &[1u8, 2, 3, 255]),
            other => panic!("expected a binary frame, got {other:?}"),
        }
    }

    assert_silent(&mut a).await;
    assert_eq!(state.manager.store().get_snapshot(&room_id).await, "");
}

#[tokio::test]
async fn closing_a_connection_deregisters_it() {
    let (addr, state) = start_server(Config::default()).await;
    let room_id = create_room(addr).await;

    let mut a = connect(addr, &room_id).await;
    let mut b = connect(addr, &room_id).await;
    recv_text(&mut a).await;
    recv_text(&mut b).await;
    wait_for_members(&state, 2).await;

    b.close(None).await.unwrap();
    wait_for_members(&state, 1).await;

    a.send(Message::text(r#"{"type":"code_update","code":"alone"}"#))
        .await
        .unwrap();
    wait_for_snapshot(&state, &room_id, "alone").await;
}

#[tokio::test]
async fn retained_room_keeps_code_for_reconnects() {
    let (addr, state) = start_server(Config::default()).await;
    let room_id = create_room(addr).await;

    let mut a = connect(addr, &room_id).await;
    recv_text(&mut a).await;
    a.send(Message::text(r#"{"type":"code_update","code":"keep me"}"#))
        .await
        .unwrap();
    wait_for_snapshot(&state, &room_id, "keep me").await;
    a.close(None).await.unwrap();
    wait_for_members(&state, 0).await;

    let mut again = connect(addr, &room_id).await;
    assert_eq!(recv_text(&mut again).await, r#"{"type":"init","code":"keep me"}"#);
}

#[tokio::test]
async fn evicted_room_starts_over_after_last_leave() {
    let config = Config {
        room_retention: "evict".to_string(),
        ..Config::default()
    };
    let (addr, state) = start_server(config).await;
    let room_id = create_room(addr).await;

    let mut a = connect(addr, &room_id).await;
    recv_text(&mut a).await;
    a.send(Message::text(r#"{"type":"code_update","code":"short lived"}"#))
        .await
        .unwrap();
    wait_for_snapshot(&state, &room_id, "short lived").await;
    a.close(None).await.unwrap();

    timeout(WAIT, async {
        while state.manager.store().contains(&room_id) {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room was never evicted");

    let mut again = connect(addr, &room_id).await;
    assert_eq!(recv_text(&mut again).await, r#"{"type":"init","code":""}"#);
}
