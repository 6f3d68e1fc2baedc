//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router
//! backed by an in-memory [`MemorySource`], a fake platform API for
//! exercising [`campus_gate::permissions::HttpPrivilegeSource`], and JWT
//! generation.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] when a real socket is needed (the HTTP
//! privilege source talks to the fake platform API over TCP).
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{self, Method, Request, Response, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use campus_gate::api::{create_router, AppState};
use campus_gate::auth::jwt::Claims;
use campus_gate::config::Config;
use campus_gate::permissions::{PrivilegeSource, SourceError, UserProfile};

// ============================================================================
// In-memory privilege source
// ============================================================================

/// Platform data keyed by user or board id.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub rows: HashMap<String, Vec<Value>>,
    pub profiles: HashMap<String, Value>,
    pub board_clubs: HashMap<String, Vec<Value>>,
}

impl Fixtures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add privilege rows for a user.
    pub fn rows(mut self, user_id: &str, rows: Vec<Value>) -> Self {
        self.rows.entry(user_id.to_string()).or_default().extend(rows);
        self
    }

    /// Set the profile of a user.
    pub fn profile(mut self, user_id: &str, profile: Value) -> Self {
        self.profiles.insert(user_id.to_string(), profile);
        self
    }

    /// Set the clubs of a board (bare ids or populated documents).
    pub fn board_clubs(mut self, board_id: &str, clubs: Vec<Value>) -> Self {
        self.board_clubs.insert(board_id.to_string(), clubs);
        self
    }

    fn profile_for(&self, user_id: &str) -> Value {
        self.profiles
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| json!({ "_id": user_id, "userRole": "member" }))
    }
}

/// [`PrivilegeSource`] serving [`Fixtures`] from memory.
#[derive(Default)]
pub struct MemorySource {
    pub fixtures: Fixtures,
    pub fail: bool,
    pub loads: AtomicUsize,
}

impl MemorySource {
    pub fn new(fixtures: Fixtures) -> Self {
        Self {
            fixtures,
            ..Self::default()
        }
    }

    /// Source whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of privilege fetches, i.e. context loads.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SourceError> {
        if self.fail {
            Err(SourceError::Unavailable("platform API down".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PrivilegeSource for MemorySource {
    fn fetch_privileges<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Value>, SourceError>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.fixtures.rows.get(user_id).cloned().unwrap_or_default())
        })
    }

    fn fetch_profile<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<UserProfile, SourceError>> {
        Box::pin(async move {
            self.check()?;
            serde_json::from_value(self.fixtures.profile_for(user_id))
                .map_err(|e| SourceError::Unavailable(e.to_string()))
        })
    }

    fn fetch_board_clubs<'a>(
        &'a self,
        board_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, SourceError>> {
        Box::pin(async move {
            self.check()?;
            Ok(self
                .fixtures
                .board_clubs
                .get(board_id)
                .map(|clubs| {
                    clubs
                        .iter()
                        .filter_map(|c| match c {
                            Value::String(id) => Some(id.clone()),
                            other => other["_id"].as_str().map(str::to_string),
                        })
                        .collect()
                })
                .unwrap_or_default())
        })
    }
}

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub config: Arc<Config>,
    pub source: Arc<MemorySource>,
    pub state: AppState,
}

impl TestApp {
    /// Create a test app backed by the given source.
    pub fn new(source: MemorySource) -> Self {
        let config = Config::default_for_test();
        let source = Arc::new(source);
        let state = AppState::new(config.clone(), source.clone());
        let router = create_router(state.clone());

        Self {
            router,
            config: Arc::new(config),
            source,
            state,
        }
    }

    /// Create a test app serving `fixtures`.
    pub fn with_fixtures(fixtures: Fixtures) -> Self {
        Self::new(MemorySource::new(fixtures))
    }

    /// Build a request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Build an authenticated request for `user_id`.
    pub fn authed(&self, method: Method, uri: &str, user_id: &str) -> Request<Body> {
        Self::request(method, uri)
            .header(
                http::header::AUTHORIZATION,
                format!("Bearer {}", generate_access_token(&self.config, user_id)),
            )
            .body(Body::empty())
            .expect("Failed to build request")
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

// ============================================================================
// Test servers
// ============================================================================

/// A running HTTP server for tests that need a real socket.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

/// Spawn a real HTTP server on a random port.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

/// Fake platform REST API serving `fixtures` under `/api`.
///
/// Unknown users get `404` from `/api/users/{id}`; a user id of `"broken"`
/// gets `500` from every endpoint.
pub fn fake_platform_api(fixtures: Fixtures) -> Router {
    async fn privileges(
        State(fixtures): State<Arc<Fixtures>>,
        Path(user_id): Path<String>,
    ) -> Result<Json<Vec<Value>>, StatusCode> {
        if user_id == "broken" {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Ok(Json(fixtures.rows.get(&user_id).cloned().unwrap_or_default()))
    }

    async fn user(
        State(fixtures): State<Arc<Fixtures>>,
        Path(user_id): Path<String>,
    ) -> Result<Json<Value>, StatusCode> {
        if user_id == "broken" {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        fixtures
            .profiles
            .get(&user_id)
            .cloned()
            .map(Json)
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn board_clubs(
        State(fixtures): State<Arc<Fixtures>>,
        Path(board_id): Path<String>,
    ) -> Json<Vec<Value>> {
        Json(fixtures.board_clubs.get(&board_id).cloned().unwrap_or_default())
    }

    Router::new()
        .route("/api/privileges/user/{user_id}", get(privileges))
        .route("/api/users/{user_id}", get(user))
        .route("/api/boards/{board_id}/clubs", get(board_clubs))
        .with_state(Arc::new(fixtures))
}

// ============================================================================
// Auth helpers
// ============================================================================

/// Generate a valid access token for `user_id`.
pub fn generate_access_token(config: &Config, user_id: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        id: user_id.to_string(),
        exp: (now + Duration::minutes(15)).timestamp(),
        iat: Some(now.timestamp()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .expect("Failed to encode token")
}
