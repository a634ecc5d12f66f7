//! JWT handling
//!
//! Creates and validates the signed access credential. The token is
//! self-describing: identity id, email, and expiry are verifiable without a
//! database round-trip. Authenticity is all it proves, though; liveness is
//! the token ledger's call.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Expiration timestamp (Unix seconds).
    pub exp: i64,
    /// Issued-at timestamp (Unix seconds).
    pub iat: i64,
    /// Token id. Guarantees distinct token values even for sign-ins within
    /// the same second.
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Sign a new access token for the given user.
pub fn create_token(
    user_id: &str,
    email: &str,
    secret: &str,
    lifetime_secs: u64,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(lifetime_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::storage(format!("token creation failed: {e}")))
}

/// Verify a presented token and recover its claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.leeway = 0; // no clock-skew tolerance

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::auth_failed("Access token expired")
        }
        _ => ApiError::auth_failed("Invalid access token"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SECRET: &str = "unit-test-signing-secret-0123456789abcdef";

    #[test]
    fn round_trip_preserves_claims() {
        let token = create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let t1 = create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        let t2 = create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        assert_ne!(t1, t2);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        let err = validate_token(&token, "another-secret-entirely-0123456789").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = create_token("user-1", "ada@example.com", SECRET, 3600).unwrap();
        let mut tampered = token.clone();
        tampered.truncate(token.len() - 4);
        assert!(validate_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn expired_token_is_rejected_by_signature_check() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            email: "ada@example.com".into(),
            exp: now - 120,
            iat: now - 3720,
            jti: "test".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = validate_token(&token, SECRET).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(err.message.contains("expired"));
    }
}
