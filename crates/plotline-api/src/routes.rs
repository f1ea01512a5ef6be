use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use plotline_core::auth::{AuthSession, AuthUser, Credentials, CurrentUserResponse};
use plotline_core::Snapshot;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{
    extract_bearer_token, hash_password, normalize_email, validate_registration, verify_password,
    AuthenticatedUser, TokenService,
};
use crate::config::AppConfig;
use crate::db::{Database, UserRecord};
use crate::error::AppError;
use crate::rate_limit::{
    subject_fingerprint, EndpointRateLimiter, ProtectedEndpoint, RateLimitMetricsSnapshot,
};

const INVALID_LOGIN: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    tokens: Arc<TokenService>,
    endpoint_rate_limiter: Arc<EndpointRateLimiter>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, AppError> {
        let db = Database::open(&config.db_path)?;
        Ok(Self {
            db,
            tokens: Arc::new(TokenService::new(&config.jwt_secret, config.session_ttl)),
            endpoint_rate_limiter: Arc::new(EndpointRateLimiter::from_config(config.as_ref())),
            config,
        })
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(current_user))
        .route("/sync", get(fetch_snapshot).post(save_snapshot))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.config.max_snapshot_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_methods([Method::GET, Method::POST]),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.endpoint_rate_limiter.metrics_snapshot(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.tokens.verify(token)?;
    let active = state
        .db
        .session_active(&user.session_id, &user.user_id, Utc::now().timestamp())
        .await?;
    if !active {
        return Err(AppError::unauthorized("Session has been revoked or expired"));
    }
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    let email = validate_registration(&credentials.email, &credentials.password)?;
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Auth, &email)
        .await?;

    let password = credentials.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    let user_id = uuid::Uuid::now_v7().to_string();
    let user = state
        .db
        .create_user(&user_id, &email, &password_hash, Utc::now().timestamp())
        .await?;

    let session = open_session(&state, &user).await?;
    tracing::info!(
        endpoint = "register",
        user = subject_fingerprint(&user.id),
        "Registered new account"
    );
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthSession>, AppError> {
    let email = normalize_email(&credentials.email);
    if email.is_empty() || credentials.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Auth, &email)
        .await?;

    let Some(user) = state.db.find_user_by_email(&email).await? else {
        tracing::info!(
            endpoint = "login",
            subject = subject_fingerprint(&email),
            "Login for unknown account"
        );
        return Err(AppError::unauthorized(INVALID_LOGIN));
    };

    let password = credentials.password;
    let stored_hash = user.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await?;
    if !matches {
        tracing::info!(
            endpoint = "login",
            user = subject_fingerprint(&user.id),
            "Login rejected"
        );
        return Err(AppError::unauthorized(INVALID_LOGIN));
    }

    let session = open_session(&state, &user).await?;
    tracing::info!(
        endpoint = "login",
        user = subject_fingerprint(&user.id),
        "Issued session"
    );
    Ok(Json(session))
}

async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .revoke_session(&user.session_id, Utc::now().timestamp())
        .await?;
    tracing::info!(
        endpoint = "logout",
        user = subject_fingerprint(&user.user_id),
        "Revoked session"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn current_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let record = state
        .db
        .find_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Account no longer exists"))?;
    Ok(Json(CurrentUserResponse {
        user: public_user(&record),
    }))
}

async fn fetch_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Snapshot>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Sync, &user.user_id)
        .await?;

    let snapshot = state.db.load_snapshot(&user.user_id).await?;
    tracing::debug!(
        endpoint = "sync_fetch",
        user = subject_fingerprint(&user.user_id),
        entities = snapshot.counts().total(),
        "Served snapshot"
    );
    Ok(Json(snapshot))
}

async fn save_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(snapshot): Json<Snapshot>,
) -> Result<StatusCode, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Sync, &user.user_id)
        .await?;

    state
        .db
        .save_snapshot(&user.user_id, &snapshot, Utc::now().timestamp())
        .await?;
    tracing::info!(
        endpoint = "sync_save",
        user = subject_fingerprint(&user.user_id),
        entities = snapshot.counts().total(),
        "Stored snapshot"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn open_session(state: &AppState, user: &UserRecord) -> Result<AuthSession, AppError> {
    let issued = state.tokens.issue(&user.id)?;
    state
        .db
        .create_session(
            &issued.session_id,
            &user.id,
            issued.issued_at,
            issued.expires_at,
        )
        .await?;

    Ok(AuthSession {
        token: issued.token,
        expires_at: issued.expires_at,
        user: public_user(user),
    })
}

fn public_user(record: &UserRecord) -> AuthUser {
    AuthUser {
        id: record.id.clone(),
        email: Some(record.email.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::Request;
    use plotline_core::models::{Chapter, Story};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const PASSWORD: &str = "correct horse";

    fn test_app(overrides: &[(&str, &str)]) -> Router {
        let mut values: HashMap<&str, &str> = HashMap::from([
            ("PLOTLINE_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("PLOTLINE_DB_PATH", ":memory:"),
        ]);
        values.extend(overrides.iter().copied());
        let config = AppConfig::from_lookup(|key| values.get(key).map(|v| (*v).to_string()))
            .unwrap();
        app_router(AppState::from_config(Arc::new(config)).unwrap())
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderSnapshot, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, HeaderSnapshot { retry_after }, value)
    }

    struct HeaderSnapshot {
        retry_after: Option<String>,
    }

    async fn register_user(app: &Router, email: &str) -> String {
        let (status, _, body) = send(
            app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    fn sample_snapshot() -> Snapshot {
        let story = Story::new("Draft");
        let chapter = Chapter::new(story.id.clone(), "Opening", 0);
        Snapshot {
            stories: vec![story],
            chapters: vec![chapter],
            ..Snapshot::default()
        }
    }

    #[tokio::test]
    async fn register_returns_session_and_rejects_duplicates() {
        let app = test_app(&[]);
        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": " Writer@Example.com ", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "writer@example.com");
        assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
        assert!(body["expires_at"].as_i64().is_some());

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "writer@example.com", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "An account with this email already exists");
    }

    #[tokio::test]
    async fn register_rejects_short_passwords() {
        let app = test_app(&[]);
        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "writer@example.com", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Password must be at least 8 characters");
    }

    #[tokio::test]
    async fn login_checks_password() {
        let app = test_app(&[]);
        register_user(&app, "writer@example.com").await;

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "writer@example.com", "password": "wrong password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], INVALID_LOGIN);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "WRITER@example.com", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap();

        let (status, _, me) = send(&app, Method::GET, "/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["email"], "writer@example.com");
    }

    #[tokio::test]
    async fn unknown_account_login_is_indistinguishable() {
        let app = test_app(&[]);
        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], INVALID_LOGIN);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = test_app(&[]);
        for (method, uri) in [
            (Method::GET, "/sync"),
            (Method::POST, "/auth/logout"),
            (Method::GET, "/auth/me"),
        ] {
            let (status, _, body) = send(&app, method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Missing Authorization header");
        }

        let (status, _, _) =
            send(&app, Method::GET, "/sync", Some("not.a.token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn new_account_fetches_an_empty_snapshot() {
        let app = test_app(&[]);
        let token = register_user(&app, "writer@example.com").await;

        let (status, _, body) = send(&app, Method::GET, "/sync", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let snapshot: Snapshot = serde_json::from_value(body).unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn saved_snapshot_round_trips_and_is_idempotent() {
        let app = test_app(&[]);
        let token = register_user(&app, "writer@example.com").await;
        let snapshot = sample_snapshot();
        let body = serde_json::to_value(&snapshot).unwrap();

        for _ in 0..2 {
            let (status, _, _) =
                send(&app, Method::POST, "/sync", Some(&token), Some(body.clone())).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (status, _, fetched) = send(&app, Method::GET, "/sync", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_value::<Snapshot>(fetched).unwrap(), snapshot);
    }

    #[tokio::test]
    async fn snapshots_are_isolated_per_account() {
        let app = test_app(&[]);
        let first = register_user(&app, "first@example.com").await;
        let second = register_user(&app, "second@example.com").await;

        let body = serde_json::to_value(sample_snapshot()).unwrap();
        send(&app, Method::POST, "/sync", Some(&first), Some(body)).await;

        let (_, _, fetched) = send(&app, Method::GET, "/sync", Some(&second), None).await;
        assert!(serde_json::from_value::<Snapshot>(fetched).unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let app = test_app(&[]);
        let token = register_user(&app, "writer@example.com").await;

        let (status, _, _) = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, body) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Session has been revoked or expired");
    }

    #[tokio::test]
    async fn repeated_login_attempts_are_rate_limited() {
        let app = test_app(&[("AUTH_RATE_LIMIT_PER_WINDOW", "2")]);
        let attempt = json!({ "email": "writer@example.com", "password": PASSWORD });

        for _ in 0..2 {
            let (status, _, _) =
                send(&app, Method::POST, "/auth/login", None, Some(attempt.clone())).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let (status, headers, body) =
            send(&app, Method::POST, "/auth/login", None, Some(attempt)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["retry_after_secs"].as_u64().is_some_and(|secs| secs > 0));
        assert!(headers.retry_after.is_some());
    }

    #[tokio::test]
    async fn healthz_reports_rate_limit_counters() {
        let app = test_app(&[]);
        let token = register_user(&app, "writer@example.com").await;
        send(&app, Method::GET, "/sync", Some(&token), None).await;

        let (status, _, body) = send(&app, Method::GET, "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rate_limit"]["auth_allowed"], 1);
        assert_eq!(body["rate_limit"]["sync_allowed"], 1);
    }
}
