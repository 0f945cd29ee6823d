use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

/// Upper bound for `JWT_TTL_MINUTES`: five years.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 366 * 5;

/// Event name relayed when `RELAY_EVENT` is unset.
pub const DEFAULT_RELAY_EVENT: &str = "message";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for any path no route matches.
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Reject `/ws` upgrades that do not carry a valid token.
    pub require_token: bool,
    /// The one event name rebroadcast to every peer.
    pub event: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub http: HttpConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = var("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set")?;

        let jwt = JwtConfig {
            secret,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "chat-relay".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "chat-relay-clients".into()),
            ttl_minutes: parse_or(&var, "JWT_TTL_MINUTES", 60)?,
        };
        if !(1..=MAX_TTL_MINUTES).contains(&jwt.ttl_minutes) {
            anyhow::bail!(
                "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {}",
                jwt.ttl_minutes
            );
        }

        let port = match var("PORT").or_else(|| var("APP_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid port {raw:?}"))?,
            None => 5000,
        };
        let http = HttpConfig {
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            static_dir: var("STATIC_DIR").unwrap_or_else(|| "public".into()),
        };

        let relay = RelayConfig {
            require_token: var("RELAY_REQUIRE_TOKEN")
                .map(|v| parse_flag(&v))
                .transpose()?
                .unwrap_or(false),
            event: var("RELAY_EVENT")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_RELAY_EVENT.into()),
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite://chat-relay.db".into()),
            database_max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 5)?,
            jwt,
            http,
            relay,
        })
    }
}

impl HttpConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("invalid boolean {other:?}"),
    }
}
