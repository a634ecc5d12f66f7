//! # Lectern
//!
//! Backend for a course platform: user registration and sign-in, bearer
//! access tokens, and per-chapter quiz score tracking with a submission
//! rate limit.
//!
//! ## Architecture
//!
//! - **Profiles** ([`profile`]): registered identities with Argon2-hashed
//!   credentials.
//! - **Token ledger** ([`auth::tokens`]): at most one live access token per
//!   user; a new sign-in overwrites (and thereby revokes) the previous one.
//! - **Session guard** ([`auth::middleware`]): two-stage check on protected
//!   routes, JWT signature first, then ledger liveness with lazy expiry.
//! - **Score ledger** ([`quiz`]): monotonically increasing chapter counters
//!   behind a sliding-window submission cap.
//!
//! All persistence goes through a pooled SQLite connection ([`database`]);
//! upserts are single atomic statements and the submission check-then-write
//! runs in one transaction.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod layers;
pub mod profile;
pub mod quiz;
pub mod validation;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::auth::middleware::session_guard;
use crate::auth::tokens::TokenLedger;
use crate::config::AppConfig;
use crate::layers::SecureRouter;
use crate::profile::ProfileStore;
use crate::quiz::{ScoreLedger, SubmissionPolicy};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profiles: ProfileStore,
    pub tokens: TokenLedger,
    pub scores: ScoreLedger,
}

impl AppState {
    /// Assemble the application state on top of a connected pool.
    pub fn new(config: Arc<AppConfig>, pool: sqlx::SqlitePool) -> Self {
        let policy = SubmissionPolicy {
            max_per_window: config.submission_limit,
            window_ms: config.submission_window.as_millis() as i64,
        };
        Self {
            profiles: ProfileStore::new(pool.clone()),
            tokens: TokenLedger::new(pool.clone()),
            scores: ScoreLedger::new(pool, policy),
            config,
        }
    }
}

/// Build the full router: public routes, guarded routes, hardening layers.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/signup", post(auth::handlers::signup))
        .route("/api/signin", post(auth::handlers::signin));

    // Protected routes run the session guard before the handler.
    let protected = Router::new()
        .route("/api/dashboard", get(profile::dashboard))
        .route("/api/submit-quiz/{chapter}", post(quiz::handlers::submit_quiz))
        .layer(middleware::from_fn_with_state(state.clone(), session_guard));

    let config = Arc::clone(&state.config);
    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .with_security(&config)
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
