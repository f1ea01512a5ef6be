//! HTTP client for the Plotline API.
//!
//! One client serves both sides of the coordinator: it is the auth surface
//! (login, register, logout, who-am-I) and the sync remote (`/sync`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::auth::{
    AuthError, AuthResult, AuthSession, AuthSurface, AuthUser, Credentials, CurrentUserResponse,
    SessionPersistence,
};
use crate::config::{ClientConfig, SyncSettings};
use crate::models::Snapshot;
use crate::sync::{SyncError, SyncRemote, SyncResult};
use crate::util::parse_api_error;

const REQUEST_TIMEOUT_SECS: u64 = 15;

pub struct PlotlineClient<S: SessionPersistence> {
    config: ClientConfig,
    client: Client,
    sessions: Arc<S>,
    beacon_timeout: Duration,
}

impl<S: SessionPersistence> Clone for PlotlineClient<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
            sessions: Arc::clone(&self.sessions),
            beacon_timeout: self.beacon_timeout,
        }
    }
}

impl<S: SessionPersistence> PlotlineClient<S> {
    pub fn new(config: ClientConfig, sessions: S, settings: &SyncSettings) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            config,
            client,
            sessions: Arc::new(sessions),
            beacon_timeout: settings.beacon_timeout,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Persisted session, without contacting the server.
    pub fn stored_session(&self) -> AuthResult<Option<AuthSession>> {
        self.sessions.load_session()
    }

    fn bearer_token(&self) -> SyncResult<String> {
        match self.sessions.load_session()? {
            Some(session) if !session.is_expired() => Ok(session.token),
            _ => Err(SyncError::NotAuthenticated),
        }
    }

    async fn request_session(&self, path: &str, credentials: &Credentials) -> AuthResult<AuthSession> {
        let response = self
            .client
            .post(self.config.endpoint(path))
            .header("Accept", "application/json")
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let session = response.json::<AuthSession>().await?;
            self.sessions.save_session(&session)?;
            return Ok(session);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                AuthError::Validation(error_message(&body).unwrap_or_else(|| parse_api_error(status, &body)))
            }
            _ => AuthError::Api(parse_api_error(status, &body)),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> SyncResult<RequestBuilder> {
        Ok(request
            .bearer_auth(self.bearer_token()?)
            .header("Accept", "application/json"))
    }
}

#[async_trait]
impl<S: SessionPersistence> AuthSurface for PlotlineClient<S> {
    async fn current_user(&self) -> AuthResult<Option<AuthUser>> {
        let Some(session) = self.sessions.load_session()? else {
            return Ok(None);
        };
        if session.is_expired() {
            tracing::info!("Persisted session expired");
            self.sessions.clear_session()?;
            return Ok(None);
        }

        let response = self
            .client
            .get(self.config.endpoint("/auth/me"))
            .bearer_auth(&session.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Persisted session was rejected by the server");
            self.sessions.clear_session()?;
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        let payload = response.json::<CurrentUserResponse>().await?;
        Ok(Some(payload.user))
    }

    async fn login(&self, credentials: &Credentials) -> AuthResult<AuthUser> {
        credentials.validate()?;
        Ok(self.request_session("/auth/login", credentials).await?.user)
    }

    async fn register(&self, credentials: &Credentials) -> AuthResult<AuthUser> {
        credentials.validate_for_registration()?;
        Ok(self.request_session("/auth/register", credentials).await?.user)
    }

    async fn logout(&self) -> AuthResult<()> {
        let Some(session) = self.sessions.load_session()? else {
            return Ok(());
        };
        // The local session is gone even if the server cannot be reached.
        self.sessions.clear_session()?;

        let response = self
            .client
            .post(self.config.endpoint("/auth/logout"))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Api(parse_api_error(status, &body)))
    }
}

#[async_trait]
impl<S: SessionPersistence> SyncRemote for PlotlineClient<S> {
    async fn fetch_snapshot(&self) -> SyncResult<Snapshot> {
        let request = self.authorized(self.client.get(self.config.endpoint("/sync")))?;
        let response = checked(request.send().await.map_err(transport_error)?).await?;
        let body = response.text().await.map_err(transport_error)?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> SyncResult<()> {
        let request = self.authorized(self.client.post(self.config.endpoint("/sync")))?;
        checked(request.json(snapshot).send().await.map_err(transport_error)?).await?;
        Ok(())
    }

    fn send_beacon(&self, snapshot: Snapshot) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Exit beacon dropped: no async runtime available");
            return;
        };
        let request = match self.authorized(self.client.post(self.config.endpoint("/sync"))) {
            Ok(request) => request.timeout(self.beacon_timeout).json(&snapshot),
            Err(error) => {
                tracing::debug!("Exit beacon skipped: {}", error);
                return;
            }
        };
        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Exit beacon delivered");
                }
                Ok(response) => tracing::warn!("Exit beacon rejected: HTTP {}", response.status()),
                Err(error) => tracing::warn!("Exit beacon failed: {}", error),
            }
        });
    }
}

async fn checked(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Api(parse_api_error(status, &body)))
}

fn transport_error(error: reqwest::Error) -> SyncError {
    if error.is_connect() || error.is_timeout() {
        SyncError::Network(error.to_string())
    } else {
        SyncError::Http(error)
    }
}

/// The server's `{ "error": ... }` message without status decoration.
fn error_message(body: &str) -> Option<String> {
    let payload = serde_json::from_str::<serde_json::Value>(body).ok()?;
    payload
        .get("error")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
