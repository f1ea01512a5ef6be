use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const MIN_PASSWORD_CHARS: usize = 8;

/// Identity attached to a request by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
}

/// A freshly signed session token and its identifiers.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub session_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<IssuedToken, AppError> {
        let issued_at = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| AppError::Config("Session TTL is out of range".to_string()))?;
        let claims = SessionClaims {
            sub: user_id.to_string(),
            jti: uuid::Uuid::now_v7().to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|error| AppError::internal(format!("Token signing failed: {}", sanitize(&error))))?;

        Ok(IssuedToken {
            token,
            session_id: claims.jti,
            issued_at,
            expires_at: claims.exp,
        })
    }

    /// Checks signature and expiry only; revocation is a database lookup.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub", "jti"]);
        validation.leeway = 0;

        let decoded = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|error| {
            AppError::unauthorized(format!("Token validation failed: {}", sanitize(&error)))
        })?;

        if decoded.claims.sub.trim().is_empty() {
            return Err(AppError::unauthorized("Token subject is missing"));
        }

        Ok(AuthenticatedUser {
            user_id: decoded.claims.sub,
            session_id: decoded.claims.jti,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| AppError::internal(format!("Password hashing failed: {error}")))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("Stored password hash could not be parsed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Returns the normalized email, or the first validation failure.
pub fn validate_registration(email: &str, password: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::bad_request("Email must be a valid address"));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn issued_tokens_verify_with_the_same_secret() {
        let service = TokenService::new(SECRET, Duration::from_secs(600));
        let issued = service.issue("user-1").unwrap();

        let user = service.verify(&issued.token).unwrap();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.session_id, issued.session_id);
        assert_eq!(issued.expires_at - issued.issued_at, 600);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issued = TokenService::new(SECRET, Duration::from_secs(600))
            .issue("user-1")
            .unwrap();
        let other = TokenService::new("fedcba9876543210fedcba9876543210", Duration::from_secs(600));

        let err = other.verify(&issued.token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let service = TokenService::new(SECRET, Duration::from_secs(600));
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "user-1".to_string(),
            jti: "s1".to_string(),
            iat: now - 700,
            exp: now - 100,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &service.encoding).unwrap();

        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn password_hashes_verify_only_the_original() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn registration_validation_normalizes_email() {
        assert_eq!(
            validate_registration("  Writer@Example.COM ", "long enough").unwrap(),
            "writer@example.com"
        );
        let err = validate_registration("writer@example.com", "short").unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters");
        assert!(validate_registration("no-at-sign", "long enough").is_err());
        assert!(validate_registration("   ", "long enough").is_err());
    }
}
