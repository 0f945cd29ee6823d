use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// Embedded schema. Every migration is create-if-missing, so running it on
/// each startup never touches existing rows.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse DATABASE_URL {database_url}"))?
        .create_if_missing(true);

    let db = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("connect to database")?;

    sync_schema(&db).await?;
    Ok(db)
}

/// Single-connection in-memory database. The connection is never recycled,
/// otherwise the schema and its rows would vanish with it.
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .context("open in-memory database")?;

    sync_schema(&db).await?;
    Ok(db)
}

async fn sync_schema(db: &SqlitePool) -> anyhow::Result<()> {
    MIGRATOR.run(db).await.context("synchronize schema")?;
    tracing::info!("database schema synchronized");
    Ok(())
}
