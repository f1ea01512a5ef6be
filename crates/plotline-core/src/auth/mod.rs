//! Session/auth contracts shared by the coordinator, the HTTP client and the CLI.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EXPIRY_SKEW_SECONDS: i64 = 60;
const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    /// Human-readable label for status output.
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

/// Token issued by `/auth/login` or `/auth/register`; also their response body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= chrono::Utc::now().timestamp() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Body of `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user: AuthUser,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    /// Client-side checks run before any network call.
    pub fn validate(&self) -> AuthResult<()> {
        if self.email.trim().is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(AuthError::Validation(
                "Email must be a valid address".to_string(),
            ));
        }
        if self.password.trim().is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        Ok(())
    }

    /// Stricter checks for account creation.
    pub fn validate_for_registration(&self) -> AuthResult<()> {
        self.validate()?;
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error("Not signed in")]
    Unauthenticated,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

impl AuthError {
    /// Whether the failure is about connectivity rather than the request itself.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(error) if error.is_connect() || error.is_timeout() || error.is_request())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a client keeps its session token between runs.
pub trait SessionPersistence: Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Session persistence that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<AuthSession>>,
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Login/register/logout/who-am-I calls the coordinator reacts to.
///
/// Implementations own credential checking and session identity; the
/// coordinator only sequences pulls, pushes and clears around them.
#[async_trait]
pub trait AuthSurface: Send + Sync {
    /// `Ok(None)` when there is no valid session.
    async fn current_user(&self) -> AuthResult<Option<AuthUser>>;

    async fn login(&self, credentials: &Credentials) -> AuthResult<AuthUser>;

    async fn register(&self, credentials: &Credentials) -> AuthResult<AuthUser>;

    async fn logout(&self) -> AuthResult<()>;
}
