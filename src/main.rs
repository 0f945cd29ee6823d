use anyhow::Context;

use chat_relay::{app, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "chat_relay=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env().context("load configuration")?;
    let addr = config.http.socket_addr()?;
    tracing::info!(
        static_dir = %config.http.static_dir,
        relay_requires_token = config.relay.require_token,
        relay_event = %config.relay.event,
        "configuration loaded"
    );

    let state = AppState::init(config).await?;
    app::serve(app::build_app(state), addr).await
}
