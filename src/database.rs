//! Database layer
//!
//! Connection pooling and schema bootstrap over SQLite.
//!
//! Three logical collections back the whole system: `profiles` (identities),
//! `access_tokens` (one live row per user), and `scores` plus its companion
//! `submissions` event log for the sliding-window cap.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::DatabaseConfig;

/// Schema statements, executed in order on startup. All idempotent.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS profiles (
        id            TEXT PRIMARY KEY,
        firstname     TEXT NOT NULL,
        lastname      TEXT NOT NULL,
        address       TEXT NOT NULL,
        email         TEXT NOT NULL UNIQUE,
        birthdate     TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        startingtime  INTEGER NOT NULL,
        created_at    INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS access_tokens (
        user_id    TEXT PRIMARY KEY,
        token      TEXT NOT NULL,
        issued_at  INTEGER NOT NULL,
        expires_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS scores (
        user_id         TEXT PRIMARY KEY,
        chapterone      INTEGER NOT NULL DEFAULT 0,
        chaptertwo      INTEGER NOT NULL DEFAULT 0,
        chapterthree    INTEGER NOT NULL DEFAULT 0,
        chapterfour     INTEGER NOT NULL DEFAULT 0,
        chapterfive     INTEGER NOT NULL DEFAULT 0,
        chaptersix      INTEGER NOT NULL DEFAULT 0,
        chapterseven    INTEGER NOT NULL DEFAULT 0,
        chaptereight    INTEGER NOT NULL DEFAULT 0,
        chapternine     INTEGER NOT NULL DEFAULT 0,
        chapterten      INTEGER NOT NULL DEFAULT 0,
        chaptereleven   INTEGER NOT NULL DEFAULT 0,
        chaptertwelve   INTEGER NOT NULL DEFAULT 0,
        chapterthirteen INTEGER NOT NULL DEFAULT 0,
        chapterfourteen INTEGER NOT NULL DEFAULT 0,
        chapterfifteen  INTEGER NOT NULL DEFAULT 0,
        finalquiz       INTEGER NOT NULL DEFAULT 0,
        updated_at      INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS submissions (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id      TEXT NOT NULL,
        submitted_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_submissions_user_time
        ON submissions (user_id, submitted_at)",
];

/// Create a connection pool from the given configuration.
///
/// The database file is created if missing. Row ownership (token and score
/// rows referencing a profile) is maintained by the application, not by
/// schema constraints.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await?;

    info!(
        event = "database.pool_created",
        max_connections = config.max_connections,
        "Database pool created"
    );

    Ok(pool)
}

/// Create the schema if it does not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    #[tokio::test]
    async fn schema_bootstrap_is_idempotent() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"profiles"));
        assert!(names.contains(&"access_tokens"));
        assert!(names.contains(&"scores"));
        assert!(names.contains(&"submissions"));
    }
}
