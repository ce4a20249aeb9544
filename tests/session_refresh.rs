//! Token lifecycle integration tests: refresh single-flight,
//! permanent-session fallback, expiry of non-refreshable sessions.

mod helpers;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use personal_knowledge::services::{GraphClient, ServiceConfig};
use personal_knowledge::{ServiceError, TransportConfig};

use helpers::{make_token, serve, token_response, Counter};

#[derive(Clone)]
struct AuthState {
    logins: Counter,
    refreshes: Counter,
    refresh_ok: bool,
    login_token_secs: i64,
}

impl AuthState {
    fn new(refresh_ok: bool, login_token_secs: i64) -> Self {
        Self {
            logins: Counter::default(),
            refreshes: Counter::default(),
            refresh_ok,
            login_token_secs,
        }
    }
}

async fn login(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if headers.get("x-tenant-api-key").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "no key"})));
    }
    state.logins.bump();
    let user = body["externalUserId"].as_str().unwrap_or("unknown").to_string();
    (
        StatusCode::OK,
        Json(token_response("t-1", &user, state.login_token_secs)),
    )
}

async fn refresh(State(state): State<AuthState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.refreshes.bump();
    if !state.refresh_ok {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "refresh token rejected"})),
        );
    }
    let user = body["refreshToken"]
        .as_str()
        .and_then(|t| t.strip_prefix("refresh-"))
        .unwrap_or("unknown")
        .to_string();
    (StatusCode::OK, Json(token_response("t-1", &user, 3600)))
}

async fn entity() -> impl IntoResponse {
    Json(json!({
        "type": "wacom:core#Person",
        "uri": "wacom:entity:fixed",
    }))
}

fn router(state: AuthState) -> Router {
    Router::new()
        .route("/graph/v1/user/login", post(login))
        .route("/graph/v1/user/refresh", post(refresh))
        .route("/graph/v1/entity/:uri", get(entity))
        .with_state(state)
}

fn config(url: url::Url) -> ServiceConfig {
    ServiceConfig::new(url).with_transport(TransportConfig {
        max_retries: 1,
        backoff_factor: 0.01,
        ..Default::default()
    })
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    // Login token expires within the refresh window, so the first
    // operation must refresh; the refreshed token lasts an hour.
    let state = AuthState::new(true, 60);
    let url = serve(router(state.clone())).await;
    let mut client = GraphClient::new(&config(url)).unwrap();
    client
        .core_mut()
        .login("tenant-key", "single-flight")
        .await
        .unwrap();

    let fetches = (0..8).map(|_| client.entity("wacom:entity:fixed"));
    let results = futures::future::join_all(fetches).await;
    for result in results {
        result.expect("fetch with refreshed token");
    }
    assert_eq!(state.refreshes.get(), 1);
}

#[tokio::test]
async fn permanent_session_relogs_in_when_refresh_is_rejected() {
    let state = AuthState::new(false, 60);
    let url = serve(router(state.clone())).await;
    let mut client = GraphClient::new(&config(url)).unwrap();
    client
        .core_mut()
        .login("tenant-key", "fallback")
        .await
        .unwrap();
    assert_eq!(state.logins.get(), 1);

    client
        .entity("wacom:entity:fixed")
        .await
        .expect("fetch after credential fallback");
    assert_eq!(state.refreshes.get(), 1);
    assert_eq!(state.logins.get(), 2);
}

#[tokio::test]
async fn refreshable_session_without_credentials_expires() {
    let state = AuthState::new(false, 60);
    let url = serve(router(state.clone())).await;
    let mut client = GraphClient::new(&config(url)).unwrap();
    client
        .core_mut()
        .register_token(&make_token("t-1", "reject", 60), Some("refresh-reject"))
        .await
        .unwrap();

    let err = client.entity("wacom:entity:fixed").await.unwrap_err();
    assert!(matches!(err, ServiceError::AuthExpired { .. }));
    assert_eq!(state.refreshes.get(), 1);
}

#[tokio::test]
async fn timed_session_expires_with_its_token() {
    let state = AuthState::new(true, 60);
    let url = serve(router(state.clone())).await;
    let mut client = GraphClient::new(&config(url)).unwrap();
    let session = client
        .core_mut()
        .register_token(&make_token("t-1", "timed", -5), None)
        .await
        .unwrap();
    assert!(!session.refreshable());
    assert!(session.expires_in() < 0);

    let err = client.entity("wacom:entity:fixed").await.unwrap_err();
    assert!(matches!(err, ServiceError::AuthExpired { .. }));
    assert_eq!(state.refreshes.get(), 0);
}

#[tokio::test]
async fn fresh_token_is_used_without_refresh() {
    let state = AuthState::new(true, 3600);
    let url = serve(router(state.clone())).await;
    let mut client = GraphClient::new(&config(url)).unwrap();
    client
        .core_mut()
        .login("tenant-key", "fresh")
        .await
        .unwrap();

    client.entity("wacom:entity:fixed").await.expect("fetch");
    assert_eq!(state.refreshes.get(), 0);
}
