//! Sign-up and sign-in handlers
//!
//! Registration hashes the password with Argon2id and persists the profile;
//! sign-in verifies credentials, signs a fresh JWT, and records it in the
//! token ledger, overwriting whatever token the user held before.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::jwt;
use crate::error::ApiError;
use crate::profile::{NewProfile, ProfileError};
use crate::validation::{
    validate_email, validate_length, validate_required, Validate, ValidatedJson, ValidationError,
};
use crate::AppState;

// ============================================================================
// Registration
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub firstname: String,
    pub lastname: String,
    pub address: String,
    pub email: String,
    pub password: String,
    pub birthdate: String,
}

impl Validate for SignupRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_required(&self.firstname, "firstname")?;
        validate_length(&self.firstname, 1, 100, "firstname")?;
        validate_required(&self.lastname, "lastname")?;
        validate_length(&self.lastname, 1, 100, "lastname")?;
        validate_required(&self.address, "address")?;
        validate_length(&self.address, 1, 500, "address")?;
        validate_required(&self.email, "email")?;
        validate_email(&self.email)?;
        validate_required(&self.password, "password")?;
        validate_length(&self.password, 1, 128, "password")?;
        validate_required(&self.birthdate, "birthdate")?;
        Ok(())
    }
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub message: String,
}

/// POST /api/signup: register a new user.
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let password_hash = hash_password(&input.password)?;
    let now_ms = Utc::now().timestamp_millis();

    let profile = state
        .profiles
        .create(
            NewProfile {
                firstname: input.firstname,
                lastname: input.lastname,
                address: input.address,
                email: input.email,
                birthdate: input.birthdate,
                password_hash,
            },
            now_ms,
        )
        .await
        .map_err(|e| match e {
            ProfileError::DuplicateEmail => ApiError::conflict("Email already exists"),
            ProfileError::Storage(e) => e.into(),
        })?;

    info!(
        event = "user.registered",
        user_id = %profile.id,
        email = %profile.email,
        "New user registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: format!(
                "{} {} registered successfully",
                profile.firstname, profile.lastname
            ),
        }),
    ))
}

// ============================================================================
// Sign-in
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

impl Validate for SigninRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_required(&self.email, "email")?;
        validate_required(&self.password, "password")?;
        Ok(())
    }
}

#[derive(Serialize)]
pub struct SigninResponse {
    pub message: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// POST /api/signin: authenticate and issue a fresh access token.
///
/// Unknown email and bad password produce the same response, so the
/// endpoint does not confirm which addresses are registered.
pub async fn signin(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<SigninRequest>,
) -> Result<Json<SigninResponse>, ApiError> {
    let profile = match state.profiles.find_by_email(&input.email).await? {
        Some(profile) => profile,
        None => {
            warn!(
                event = "auth.failed",
                email = %input.email,
                reason = "unknown_email",
                "Authentication failed"
            );
            return Err(ApiError::auth_failed("Invalid email or password"));
        }
    };

    if !verify_password(&input.password, &profile.password_hash) {
        warn!(
            event = "auth.failed",
            email = %input.email,
            reason = "bad_password",
            "Authentication failed"
        );
        return Err(ApiError::auth_failed("Invalid email or password"));
    }

    let token = jwt::create_token(
        &profile.id,
        &profile.email,
        &state.config.jwt_secret,
        state.config.token_ttl.as_secs(),
    )?;

    let now_ms = Utc::now().timestamp_millis();
    let ttl_ms = state.config.token_ttl.as_millis() as i64;
    state
        .tokens
        .issue_or_refresh(&profile.id, &token, now_ms, ttl_ms)
        .await?;

    info!(event = "auth.success", user_id = %profile.id, "User authenticated");

    Ok(Json(SigninResponse {
        message: "Sign-in successful".to_string(),
        access_token: token,
    }))
}

// ============================================================================
// Password Hashing
// ============================================================================

/// Hash a password with Argon2id.
fn hash_password(password: &str) -> Result<String, ApiError> {
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};
    use rand::rngs::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::storage(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored hash.
///
/// An unparseable hash verifies as false rather than erroring: the caller
/// only ever needs "match or no match".
fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::password_hash::PasswordHash;
    use argon2::{Argon2, PasswordVerifier};

    PasswordHash::new(hash)
        .ok()
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("incorrect horse", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let h1 = hash_password("p").unwrap();
        let h2 = hash_password("p").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn signup_requires_every_field() {
        let mut request = SignupRequest {
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            address: "12 St James Square".into(),
            email: "ada@example.com".into(),
            password: "p".into(),
            birthdate: "1815-12-10".into(),
        };
        assert!(request.validate().is_ok());

        request.birthdate = String::new();
        let err = request.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("birthdate"));
    }

    #[test]
    fn signup_rejects_bad_email() {
        let request = SignupRequest {
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            address: "12 St James Square".into(),
            email: "nope".into(),
            password: "p".into(),
            birthdate: "1815-12-10".into(),
        };
        let err = request.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("email"));
    }

    #[test]
    fn signin_requires_both_fields() {
        let request = SigninRequest {
            email: "ada@example.com".into(),
            password: String::new(),
        };
        let err = request.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("password"));
    }
}
