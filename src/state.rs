use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::db;
use crate::relay::Relay;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub relay: Arc<Relay>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url, config.database_max_connections).await?;
        Ok(Self::from_parts(db, config))
    }

    /// State backed by a private in-memory database.
    pub async fn ephemeral(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect_in_memory().await?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: SqlitePool, config: AppConfig) -> Self {
        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        Self {
            db,
            config: Arc::new(config),
            keys,
            relay: Arc::new(Relay::new()),
        }
    }
}
