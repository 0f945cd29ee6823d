mod support;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};

use chat_relay::auth::middleware::TOKEN_HEADER;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.expect("websocket handshake");
    ws
}

async fn send_event(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame)).await.expect("send");
}

/// Next text frame, parsed, within a short deadline.
async fn next_event(client: &mut Client) -> Option<Value> {
    let deadline = Duration::from_millis(500);
    loop {
        match tokio::time::timeout(deadline, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

/// Next text frame, verbatim.
async fn next_text(client: &mut Client) -> Option<String> {
    let deadline = Duration::from_millis(500);
    loop {
        match tokio::time::timeout(deadline, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

#[tokio::test]
async fn message_reaches_all_peers_then_only_remaining_ones() {
    let state = support::state(false).await;
    let addr = support::spawn_server(state.clone()).await;
    let url = format!("ws://{addr}/ws");

    let mut a = connect(&url).await;
    let mut b = connect(&url).await;
    support::wait_for_peers(&state, 2).await;

    send_event(&mut a, "message", json!("hello")).await;
    assert_eq!(
        next_event(&mut a).await,
        Some(json!({"event": "message", "data": "hello"}))
    );
    assert_eq!(
        next_event(&mut b).await,
        Some(json!({"event": "message", "data": "hello"}))
    );

    b.close(None).await.expect("close");
    support::wait_for_peers(&state, 1).await;

    send_event(&mut a, "message", json!({"text": "still here"})).await;
    let got = next_event(&mut a).await.expect("sender sees its own message");
    assert_eq!(got["data"]["text"], "still here");
}

#[tokio::test]
async fn unknown_events_and_garbage_are_ignored() {
    let state = support::state(false).await;
    let addr = support::spawn_server(state.clone()).await;
    let mut a = connect(&format!("ws://{addr}/ws")).await;
    support::wait_for_peers(&state, 1).await;

    send_event(&mut a, "typing", json!(true)).await;
    a.send(Message::Text("not json".into())).await.unwrap();
    assert_eq!(next_event(&mut a).await, None);

    // The connection survives and keeps relaying.
    send_event(&mut a, "message", json!("ok")).await;
    assert_eq!(next_event(&mut a).await.unwrap()["data"], "ok");
    assert_eq!(state.relay.len(), 1);
}

#[tokio::test]
async fn token_enforcement_rejects_anonymous_upgrades() {
    let state = support::state(true).await;
    let addr = support::spawn_server(state.clone()).await;

    assert!(connect_async(format!("ws://{addr}/ws")).await.is_err());
    assert!(connect_async(format!("ws://{addr}/ws?token=garbage")).await.is_err());
    assert!(state.relay.is_empty());
}

#[tokio::test]
async fn token_enforcement_accepts_query_or_header_token() {
    let state = support::state(true).await;
    let addr = support::spawn_server(state.clone()).await;
    let token = state.keys.sign(uuid::Uuid::new_v4()).unwrap();

    let mut by_query = connect(&format!("ws://{addr}/ws?token={token}")).await;

    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert(TOKEN_HEADER, token.parse().unwrap());
    let (mut by_header, _) = connect_async(request).await.expect("header token accepted");

    support::wait_for_peers(&state, 2).await;
    send_event(&mut by_header, "message", json!("authenticated")).await;
    assert_eq!(next_event(&mut by_query).await.unwrap()["data"], "authenticated");
    assert_eq!(next_event(&mut by_header).await.unwrap()["data"], "authenticated");
}

#[tokio::test]
async fn payload_is_relayed_byte_for_byte() {
    let state = support::state(false).await;
    let addr = support::spawn_server(state.clone()).await;
    let url = format!("ws://{addr}/ws");
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;
    support::wait_for_peers(&state, 2).await;

    let frame = r#"{"event":"message", "data":{"z":1,"a":18446744073709551616,"f":1e400}}"#;
    a.send(Message::Text(frame.to_string())).await.expect("send");

    assert_eq!(next_text(&mut a).await.as_deref(), Some(frame));
    assert_eq!(next_text(&mut b).await.as_deref(), Some(frame));
}

#[tokio::test]
async fn configured_event_name_replaces_the_default() {
    let cfg = support::config_with(false, "public", &[("RELAY_EVENT", "mensaje")]);
    let state = chat_relay::state::AppState::ephemeral(cfg).await.unwrap();
    let addr = support::spawn_server(state.clone()).await;
    let mut a = connect(&format!("ws://{addr}/ws")).await;
    support::wait_for_peers(&state, 1).await;

    send_event(&mut a, "message", json!("ignored")).await;
    assert_eq!(next_event(&mut a).await, None);

    send_event(&mut a, "mensaje", json!("hola")).await;
    assert_eq!(
        next_event(&mut a).await,
        Some(json!({"event": "mensaje", "data": "hola"}))
    );
}
