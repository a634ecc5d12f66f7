//! Session guard
//!
//! Two-stage check for protected routes. Stage 1 verifies the presented
//! JWT against the signing secret and is pure and stateless. Stage 2
//! resolves the verified identity through the token ledger, which holds the
//! authoritative veto: a cryptographically valid token is still rejected if
//! it was superseded by a newer sign-in or its ledger entry expired.
//!
//! A ledger storage failure surfaces as a 500, never a 401: "we don't know"
//! is not "you're unauthorized".

use axum::{
    extract::{FromRequestParts, Request, State},
    http::header::AUTHORIZATION,
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::warn;

use crate::auth::jwt::{self, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Middleware guarding protected routes.
///
/// On success the verified [`Claims`] are attached to the request for
/// handlers to extract.
pub async fn session_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        Some(_) => {
            warn!(
                event = "auth.invalid_header",
                "Invalid Authorization header format"
            );
            return Err(ApiError::auth_failed("Invalid Authorization header"));
        }
        None => return Err(ApiError::auth_failed("Access token is missing")),
    };

    // Stage 1: signature and claims.
    let claims = jwt::validate_token(token, &state.config.jwt_secret)?;

    // Stage 2: ledger liveness.
    let record = state.tokens.lookup(claims.user_id()).await?;

    let now_ms = Utc::now().timestamp_millis();
    match record {
        None => {
            warn!(
                event = "auth.no_session",
                user_id = %claims.sub,
                "Verified token has no live session"
            );
            Err(ApiError::auth_failed("Session not found"))
        }
        Some(record) if !record.matches(token) => {
            warn!(
                event = "auth.superseded",
                user_id = %claims.sub,
                "Token superseded by a newer sign-in"
            );
            Err(ApiError::auth_failed("Session superseded"))
        }
        Some(record) if record.is_expired(now_ms) => {
            // Lazy expiry: reap the stale row on first touch.
            state.tokens.invalidate(claims.user_id()).await?;
            warn!(event = "auth.expired", user_id = %claims.sub, "Session expired");
            Err(ApiError::auth_failed("Session expired"))
        }
        Some(_) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
    }
}

/// Extract claims attached by [`session_guard`].
///
/// ```ignore
/// async fn handler(claims: Claims) -> impl IntoResponse {
///     format!("hello, {}", claims.user_id())
/// }
/// ```
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ApiError::auth_failed("Not authenticated"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{AppConfig, DatabaseConfig};
    use crate::database;

    const SECRET: &str = "guard-test-signing-secret-0123456789abcd";

    async fn guarded_app() -> (AppState, Router) {
        let config = Arc::new(AppConfig::with_secret(SECRET).unwrap());
        let pool = database::create_pool(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        database::init_schema(&pool).await.unwrap();
        let state = AppState::new(config, pool);

        let app = Router::new()
            .route("/protected", get(|claims: Claims| async move { claims.sub }))
            .layer(middleware::from_fn_with_state(state.clone(), session_guard))
            .with_state(state.clone());

        (state, app)
    }

    fn request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/protected");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (_state, app) = guarded_app().await;
        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let (_state, app) = guarded_app().await;
        let response = app.oneshot(request(Some("not.a.jwt"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_signature_without_ledger_entry_is_unauthorized() {
        let (_state, app) = guarded_app().await;
        let token = jwt::create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();

        let response = app.oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn live_session_passes_and_claims_reach_the_handler() {
        let (state, app) = guarded_app().await;
        let token = jwt::create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        let now_ms = Utc::now().timestamp_millis();
        state
            .tokens
            .issue_or_refresh("user-1", &token, now_ms, 3_600_000)
            .await
            .unwrap();

        let response = app.oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn superseded_token_is_unauthorized() {
        let (state, app) = guarded_app().await;
        let old = jwt::create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        let new = jwt::create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        let now_ms = Utc::now().timestamp_millis();
        state
            .tokens
            .issue_or_refresh("user-1", &old, now_ms, 3_600_000)
            .await
            .unwrap();
        state
            .tokens
            .issue_or_refresh("user-1", &new, now_ms, 3_600_000)
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(request(Some(&old)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(request(Some(&new))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn expired_ledger_entry_is_reaped_lazily() {
        let (state, app) = guarded_app().await;
        let token = jwt::create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();

        // Ledger entry whose expiry horizon is already in the past, even
        // though the JWT itself is still within its signed lifetime.
        let stale_now = Utc::now().timestamp_millis() - 10_000_000;
        state
            .tokens
            .issue_or_refresh("user-1", &token, stale_now, 1_000)
            .await
            .unwrap();

        let response = app.oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // The stale row was deleted on first touch.
        assert!(state.tokens.lookup("user-1").await.unwrap().is_none());
    }
}
