#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use chat_relay::{app, config::AppConfig, state::AppState};

pub const SECRET: &str = "integration-secret";

pub fn config(require_token: bool, static_dir: &str) -> AppConfig {
    config_with(require_token, static_dir, &[])
}

/// Like [`config`], with extra variables layered on top.
pub fn config_with(require_token: bool, static_dir: &str, extra: &[(&str, &str)]) -> AppConfig {
    let require = if require_token { "true" } else { "false" };
    let mut vars: HashMap<String, String> = HashMap::from([
        ("JWT_SECRET".to_string(), SECRET.to_string()),
        ("RELAY_REQUIRE_TOKEN".to_string(), require.to_string()),
        ("STATIC_DIR".to_string(), static_dir.to_string()),
    ]);
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    AppConfig::from_vars(move |key| vars.get(key).cloned()).expect("test config")
}

pub async fn state(require_token: bool) -> AppState {
    AppState::ephemeral(config(require_token, "public"))
        .await
        .expect("ephemeral state")
}

/// Serves the full app on an ephemeral port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let router = app::build_app(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

/// Polls until the relay holds `n` peers; connection registration happens
/// after the handshake response, so clients can observe it slightly late.
pub async fn wait_for_peers(state: &AppState, n: usize) {
    for _ in 0..200 {
        if state.relay.len() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("relay never reached {n} peers (has {})", state.relay.len());
}
