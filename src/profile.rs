//! User profiles (credential store)
//!
//! Persists registered identities and serves the dashboard view. Profiles
//! are immutable after registration apart from explicit profile updates,
//! which this service does not expose.

use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::AppState;

/// Head-start budget in milliseconds granted to every new account.
pub const DEFAULT_STARTING_TIME_MS: i64 = 108_000_000;

/// A registered user.
///
/// The password hash never leaves the server: it is excluded from
/// serialization, so handlers can return a `Profile` directly.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub address: String,
    pub email: String,
    pub birthdate: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub startingtime: i64,
    pub created_at: i64,
}

/// Fields collected at registration.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub firstname: String,
    pub lastname: String,
    pub address: String,
    pub email: String,
    pub birthdate: String,
    pub password_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("email is already in use")]
    DuplicateEmail,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Storage access for profiles.
#[derive(Clone)]
pub struct ProfileStore {
    pool: SqlitePool,
}

impl ProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new profile. The unique index on `email` is the authority
    /// on duplicates; a violation maps to [`ProfileError::DuplicateEmail`].
    pub async fn create(
        &self,
        profile: NewProfile,
        now_ms: i64,
    ) -> Result<Profile, ProfileError> {
        let profile = Profile {
            id: uuid::Uuid::new_v4().to_string(),
            firstname: profile.firstname,
            lastname: profile.lastname,
            address: profile.address,
            email: profile.email,
            birthdate: profile.birthdate,
            password_hash: profile.password_hash,
            startingtime: DEFAULT_STARTING_TIME_MS,
            created_at: now_ms,
        };

        sqlx::query(
            "INSERT INTO profiles \
                 (id, firstname, lastname, address, email, birthdate, \
                  password_hash, startingtime, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&profile.id)
        .bind(&profile.firstname)
        .bind(&profile.lastname)
        .bind(&profile.address)
        .bind(&profile.email)
        .bind(&profile.birthdate)
        .bind(&profile.password_hash)
        .bind(profile.startingtime)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProfileError::DuplicateEmail
            } else {
                ProfileError::Storage(e)
            }
        })?;

        Ok(profile)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM profiles WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ============================================================================
// Dashboard Handler
// ============================================================================

#[derive(Serialize)]
pub struct DashboardResponse {
    pub user: Profile,
}

/// GET /api/dashboard: profile view for the authenticated user.
///
/// The identity comes from the claims the session guard attached; a missing
/// row means the identity vanished after the token was issued.
pub async fn dashboard(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<DashboardResponse>, ApiError> {
    let profile = state
        .profiles
        .find_by_id(claims.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(
        event = "dashboard.viewed",
        user_id = %profile.id,
        "Dashboard fetched"
    );

    Ok(Json(DashboardResponse { user: profile }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database;

    async fn store() -> ProfileStore {
        let pool = database::create_pool(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        database::init_schema(&pool).await.unwrap();
        ProfileStore::new(pool)
    }

    fn ada() -> NewProfile {
        NewProfile {
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            address: "12 St James Square".into(),
            email: "ada@example.com".into(),
            birthdate: "1815-12-10".into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_email() {
        let store = store().await;
        let created = store.create(ada(), 1_000).await.unwrap();

        assert_eq!(created.startingtime, DEFAULT_STARTING_TIME_MS);
        assert_eq!(created.created_at, 1_000);

        let found = store
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.firstname, "Ada");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = store().await;
        store.create(ada(), 1_000).await.unwrap();

        let err = store.create(ada(), 2_000).await.unwrap_err();
        assert!(matches!(err, ProfileError::DuplicateEmail));
    }

    #[tokio::test]
    async fn find_by_id_misses_cleanly() {
        let store = store().await;
        assert!(store.find_by_id("no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn password_hash_is_not_serialized() {
        let store = store().await;
        let profile = store.create(ada(), 1_000).await.unwrap();

        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "ada@example.com");
    }
}
