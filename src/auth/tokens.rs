//! Token ledger
//!
//! Single source of truth for "does this user currently hold a live
//! session". The ledger keeps at most one row per user: issuing a new token
//! overwrites the previous one, so any older credential (leaked or not)
//! stops working the moment its owner signs in again.
//!
//! Expiry is enforced lazily. There is no background sweep; a stale row is
//! reaped the next time the session guard touches it.

use sqlx::{FromRow, SqlitePool};

/// A persisted access token.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub user_id: String,
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl AccessToken {
    /// Whether the entry has passed its expiry horizon.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }

    /// Whether a presented credential is the live one. A mismatch means the
    /// presented token was superseded by a newer sign-in.
    pub fn matches(&self, presented: &str) -> bool {
        self.token == presented
    }
}

/// Storage access for the token ledger.
#[derive(Clone)]
pub struct TokenLedger {
    pool: SqlitePool,
}

impl TokenLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create or overwrite the live token for a user.
    ///
    /// A single atomic upsert: exactly one row per user afterward, even
    /// under concurrent sign-ins from the same account.
    pub async fn issue_or_refresh(
        &self,
        user_id: &str,
        token: &str,
        now_ms: i64,
        ttl_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO access_tokens (user_id, token, issued_at, expires_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 token = excluded.token, \
                 issued_at = excluded.issued_at, \
                 expires_at = excluded.expires_at",
        )
        .bind(user_id)
        .bind(token)
        .bind(now_ms)
        .bind(now_ms + ttl_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current ledger entry for a user, if any.
    pub async fn lookup(&self, user_id: &str) -> Result<Option<AccessToken>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM access_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Delete the ledger entry for a user.
    pub async fn invalidate(&self, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM access_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
