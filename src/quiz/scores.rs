//! Score ledger and rate guard
//!
//! Accepts scored attempts subject to a sliding-window cap and accumulates
//! per-chapter counters. The window check, the event insert, and the counter
//! upsert all run inside one transaction, so two near-simultaneous
//! submissions cannot both slip under the cap.

use sqlx::SqlitePool;

use crate::quiz::models::{Chapter, ScoreRecord};

/// Sliding-window submission policy, evaluated per user across all
/// chapters.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionPolicy {
    /// Maximum scored attempts inside the window.
    pub max_per_window: i64,
    /// Trailing window length in milliseconds.
    pub window_ms: i64,
}

impl Default for SubmissionPolicy {
    /// Two attempts per trailing hour.
    fn default() -> Self {
        Self {
            max_per_window: 2,
            window_ms: 3_600_000,
        }
    }
}

impl SubmissionPolicy {
    /// Start of the window relative to `now_ms`.
    pub fn window_start(&self, now_ms: i64) -> i64 {
        now_ms - self.window_ms
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission limit reached for the current window")]
    RateLimited,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Storage access for scores and submission events.
#[derive(Clone)]
pub struct ScoreLedger {
    pool: SqlitePool,
    policy: SubmissionPolicy,
}

impl ScoreLedger {
    pub fn new(pool: SqlitePool, policy: SubmissionPolicy) -> Self {
        Self { pool, policy }
    }

    /// Record a scored attempt.
    ///
    /// Counts the user's submission events inside the trailing window; at
    /// the cap the attempt is rejected and nothing is written. Otherwise the
    /// event is recorded and the chapter counter incremented via an atomic
    /// upsert (the row is created lazily on first submission). Returns the
    /// full resulting record.
    pub async fn submit(
        &self,
        user_id: &str,
        chapter: Chapter,
        points: i64,
        now_ms: i64,
    ) -> Result<ScoreRecord, SubmissionError> {
        let mut tx = self.pool.begin().await?;

        let recent: Vec<(i64,)> = sqlx::query_as(
            "SELECT submitted_at FROM submissions \
             WHERE user_id = ? AND submitted_at >= ? \
             ORDER BY submitted_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(self.policy.window_start(now_ms))
        .bind(self.policy.max_per_window)
        .fetch_all(&mut *tx)
        .await?;

        if recent.len() as i64 >= self.policy.max_per_window {
            // Dropping the transaction rolls it back; rejected attempts
            // leave no trace.
            return Err(SubmissionError::RateLimited);
        }

        sqlx::query("INSERT INTO submissions (user_id, submitted_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(now_ms)
            .execute(&mut *tx)
            .await?;

        let column = chapter.column();
        let upsert = format!(
            "INSERT INTO scores (user_id, {column}, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 {column} = {column} + excluded.{column}, \
                 updated_at = excluded.updated_at"
        );
        sqlx::query(&upsert)
            .bind(user_id)
            .bind(points)
            .bind(now_ms)
            .execute(&mut *tx)
            .await?;

        let record: ScoreRecord = sqlx::query_as("SELECT * FROM scores WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database;

    const T0: i64 = 1_700_000_000_000;

    async fn ledger() -> ScoreLedger {
        let pool = database::create_pool(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        database::init_schema(&pool).await.unwrap();
        ScoreLedger::new(pool, SubmissionPolicy::default())
    }

    #[tokio::test]
    async fn counters_accumulate_instead_of_replacing() {
        let ledger = ledger().await;

        let record = ledger.submit("user-1", Chapter::One, 5, T0).await.unwrap();
        assert_eq!(record.chapterone, 5);

        let record = ledger
            .submit("user-1", Chapter::One, 3, T0 + 1_000)
            .await
            .unwrap();
        assert_eq!(record.get(Chapter::One), 8);
        assert_eq!(record.get(Chapter::Two), 0);
    }

    #[tokio::test]
    async fn third_attempt_within_the_window_is_rejected() {
        let ledger = ledger().await;

        ledger.submit("user-1", Chapter::One, 10, T0).await.unwrap();
        ledger
            .submit("user-1", Chapter::One, 5, T0 + 60_000)
            .await
            .unwrap();

        let err = ledger
            .submit("user-1", Chapter::One, 1, T0 + 120_000)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::RateLimited));
    }

    #[tokio::test]
    async fn the_limit_spans_chapters() {
        let ledger = ledger().await;

        ledger.submit("user-1", Chapter::One, 1, T0).await.unwrap();
        ledger
            .submit("user-1", Chapter::Two, 1, T0 + 1_000)
            .await
            .unwrap();

        // A third submission to yet another chapter still trips the cap.
        let err = ledger
            .submit("user-1", Chapter::FinalQuiz, 1, T0 + 2_000)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::RateLimited));
    }

    #[tokio::test]
    async fn the_window_slides_past_old_submissions() {
        let ledger = ledger().await;
        let window = SubmissionPolicy::default().window_ms;

        ledger.submit("user-1", Chapter::One, 10, T0).await.unwrap();
        ledger
            .submit("user-1", Chapter::One, 5, T0 + 1_000)
            .await
            .unwrap();
        assert!(ledger
            .submit("user-1", Chapter::One, 1, T0 + 2_000)
            .await
            .is_err());

        // Just past the first submission's horizon: one event left inside
        // the window, so the attempt is accepted again.
        let record = ledger
            .submit("user-1", Chapter::One, 1, T0 + window + 1)
            .await
            .unwrap();
        assert_eq!(record.chapterone, 16);
    }

    #[tokio::test]
    async fn rejected_attempts_write_nothing() {
        let ledger = ledger().await;

        ledger.submit("user-1", Chapter::One, 10, T0).await.unwrap();
        ledger
            .submit("user-1", Chapter::One, 5, T0 + 1_000)
            .await
            .unwrap();
        let before = ledger
            .submit("user-1", Chapter::One, 99, T0 + 2_000)
            .await
            .unwrap_err();
        assert!(matches!(before, SubmissionError::RateLimited));

        // Counter unchanged and no third event recorded: after the window
        // slides, exactly one more attempt fits before the cap trips again.
        let record = ledger
            .submit("user-1", Chapter::One, 1, T0 + 3_600_500)
            .await
            .unwrap();
        assert_eq!(record.chapterone, 16);
    }

    #[tokio::test]
    async fn users_are_limited_independently() {
        let ledger = ledger().await;

        ledger.submit("user-1", Chapter::One, 1, T0).await.unwrap();
        ledger
            .submit("user-1", Chapter::One, 1, T0 + 1)
            .await
            .unwrap();

        // A different user is unaffected by user-1's spent window.
        let record = ledger
            .submit("user-2", Chapter::One, 7, T0 + 2)
            .await
            .unwrap();
        assert_eq!(record.chapterone, 7);
    }
}
