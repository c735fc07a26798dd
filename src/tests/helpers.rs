use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::fmt::format::FmtSpan;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::{ClientConfig, StoreBackend};
use crate::db::{KeyValueStore, MemoryStore};
use crate::models::jwt::TokenPair;
use crate::services::session::SessionManager;

static INIT: Once = Once::new();

pub const TEST_SECRET: &[u8] = b"fake-backend-signing-key";
pub const GOOD_PASSWORD: &str = "correct-horse";

/// Initialize logging exactly once
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_target(false)
            .with_thread_ids(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::ERROR)
            .with_span_events(FmtSpan::NONE)
            .try_init();
    });
}

/// Signs a token that expires `ttl_secs` from now (negative for already
/// expired). Every call yields a distinct token.
pub fn mint_token(token_type: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "token_type": token_type,
        "exp": now + ttl_secs,
        "iat": now,
        "jti": Uuid::new_v4().to_string(),
        "user_id": 1,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET))
        .expect("Failed to mint test token")
}

pub fn fresh_pair() -> TokenPair {
    TokenPair::new(mint_token("access", 300), mint_token("refresh", 86_400))
}

pub fn stale_pair() -> TokenPair {
    TokenPair::new(mint_token("access", -10), mint_token("refresh", 3_600))
}

pub fn dead_pair() -> TokenPair {
    TokenPair::new(mint_token("access", -3_600), mint_token("refresh", -10))
}

/// What the fake refresh endpoint answers.
#[derive(Debug, Clone)]
pub enum RefreshMode {
    /// Fresh access and refresh tokens.
    Rotate,
    /// A fresh access token only; the client must keep its refresh token.
    AccessOnly,
    /// This exact body with status 200.
    Fixed(Value),
    /// 401 `token_not_valid`.
    Reject,
}

pub struct BackendState {
    pub refresh_mode: Mutex<RefreshMode>,
    pub refresh_delay: Mutex<Duration>,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub business_calls: AtomicUsize,
    /// Access tokens the business endpoints answer 401 for, even if unexpired.
    pub revoked: Mutex<HashSet<String>>,
    /// Answer 401 to every business call.
    pub reject_all: Mutex<bool>,
    pub last_request_id: Mutex<Option<String>>,
    pub tasks: Mutex<Value>,
    pub character: Mutex<Value>,
    pub ranks: Mutex<Value>,
    pub last_body: Mutex<Option<Value>>,
    /// User the task actions echo back, when set.
    pub echoed_user: Mutex<Option<Value>>,
}

impl BackendState {
    fn new() -> Self {
        Self {
            refresh_mode: Mutex::new(RefreshMode::Rotate),
            refresh_delay: Mutex::new(Duration::ZERO),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            business_calls: AtomicUsize::new(0),
            revoked: Mutex::new(HashSet::new()),
            reject_all: Mutex::new(false),
            last_request_id: Mutex::new(None),
            tasks: Mutex::new(json!([])),
            character: Mutex::new(json!({"id": 1, "username": "hero", "xp": 0, "gold": 0})),
            ranks: Mutex::new(json!([])),
            last_body: Mutex::new(None),
            echoed_user: Mutex::new(None),
        }
    }
}

/// An in-process stand-in for the REST backend, listening on an ephemeral
/// local port.
pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        init_tracing();
        let state = Arc::new(BackendState::new());
        let app = create_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake backend stopped");
        });

        info!(addr = %addr, "Fake backend listening");
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_api_base(&self.base_url)
            .with_store(StoreBackend::Memory)
            .with_request_timeout(Duration::from_secs(5))
    }

    pub fn session(&self) -> SessionManager {
        self.session_with(self.config())
    }

    pub fn session_with(&self, config: ClientConfig) -> SessionManager {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        SessionManager::new(config, backend).expect("Failed to build session")
    }

    /// A client whose session already holds `pair`.
    pub async fn client_with(&self, pair: &TokenPair) -> ApiClient {
        let session = self.session();
        session.store().set(pair).await;
        ApiClient::new(session)
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.state.refresh_mode.lock().unwrap() = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.state.refresh_delay.lock().unwrap() = delay;
    }

    pub fn revoke(&self, access: &str) {
        self.state.revoked.lock().unwrap().insert(access.to_string());
    }

    pub fn reject_all(&self) {
        *self.state.reject_all.lock().unwrap() = true;
    }

    pub fn set_tasks(&self, tasks: Value) {
        *self.state.tasks.lock().unwrap() = tasks;
    }

    pub fn set_character(&self, character: Value) {
        *self.state.character.lock().unwrap() = character;
    }

    pub fn set_ranks(&self, ranks: Value) {
        *self.state.ranks.lock().unwrap() = ranks;
    }

    pub fn echo_user(&self, user: Value) {
        *self.state.echoed_user.lock().unwrap() = Some(user);
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.state.logout_calls.load(Ordering::SeqCst)
    }

    pub fn business_calls(&self) -> usize {
        self.state.business_calls.load(Ordering::SeqCst)
    }

    pub fn last_request_id(&self) -> Option<String> {
        self.state.last_request_id.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().unwrap().clone()
    }
}

pub fn task_json(id: i64, title: &str, completed: bool, reward_xp: u32, reward_gold: u32) -> Value {
    json!({
        "id": id,
        "user": 1,
        "title": title,
        "description": "",
        "is_completed": completed,
        "difficulty": 3,
        "type": 3,
        "collaboration_type": 1,
        "reward_xp": reward_xp,
        "reward_gold": reward_gold,
        "created_at": format!("2024-06-{:02}T10:00:00Z", id.clamp(1, 28)),
    })
}

pub fn rank_json(id: i64, name: &str, required_xp: u32) -> Value {
    json!({"id": id, "name": name, "required_xp": required_xp})
}

/* ---------- FAKE BACKEND ROUTES ---------- */

type Shared = State<Arc<BackendState>>;

fn create_router(state: Arc<BackendState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/login/", post(login))
        .route("/api/login/refresh/", post(refresh))
        .route("/api/register/", post(register))
        .route("/api/logout/logout/", post(logout))
        .route("/api/tasks/", get(list_tasks).post(create_task))
        .route("/api/tasks/:id/", patch(update_task))
        .route("/api/tasks/:id/complete/", post(task_action))
        .route("/api/tasks/:id/uncomplete/", post(task_action))
        .route("/api/tasks/:id/delete/", post(delete_task))
        .route("/api/character/get-character/", get(character))
        .route("/api/ranks/", get(ranks))
        .route("/api/shop/:id/purchase/", post(purchase))
        .route("/api/user-search/", get(user_search))
        .route("/api/friendships/:id/", delete(remove_friend))
        .route("/api/check-collaboration/check-collaboration/", post(check_collaboration))
        .route("/api/collaboration-invitations/send-invitation/", post(send_invitation))
        .route("/api/collaboration-invitations/:id/respond-invitation/", post(respond_invitation))
        .route("/api/slow/", get(slow))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<(), Response> {
    state.business_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_request_id.lock().unwrap() = headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();

    let rejected = token.is_empty()
        || *state.reject_all.lock().unwrap()
        || state.revoked.lock().unwrap().contains(token);
    if rejected {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Given token not valid for any token type"})),
        )
            .into_response());
    }
    Ok(())
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == GOOD_PASSWORD {
        Json(json!({
            "access": mint_token("access", 300),
            "refresh": mint_token("refresh", 86_400),
            "user": {"id": 1, "email": body["email"]},
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response()
    }
}

async fn refresh(State(state): Shared, Json(_body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.refresh_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = state.refresh_mode.lock().unwrap().clone();
    match mode {
        RefreshMode::Rotate => Json(json!({
            "access": mint_token("access", 300),
            "refresh": mint_token("refresh", 86_400),
        }))
        .into_response(),
        RefreshMode::AccessOnly => Json(json!({"access": mint_token("access", 300)})).into_response(),
        RefreshMode::Fixed(body) => Json(body).into_response(),
        RefreshMode::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
            .into_response(),
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "username": ["A user with that username already exists."],
                "email": ["Enter a valid email address.", "Too long."],
            })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "user": {"id": 7, "username": body["username"], "email": body["email"]},
            "access": mint_token("access", 300),
        })),
    )
        .into_response()
}

async fn logout(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().unwrap() = Some(body);
    Json(json!({"message": "Logged out successfully"})).into_response()
}

async fn list_tasks(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(state.tasks.lock().unwrap().clone()).into_response()
}

async fn create_task(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    if body["title"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"title": ["This field may not be blank."]})),
        )
            .into_response();
    }
    *state.last_body.lock().unwrap() = Some(body.clone());
    let mut task = task_json(99, body["title"].as_str().unwrap_or_default(), false, 20, 10);
    task["difficulty"] = body["difficulty"].clone();
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn update_task(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let mut task = task_json(id, body["title"].as_str().unwrap_or_default(), false, 20, 10);
    task["description"] = body["description"].clone();
    Json(task).into_response()
}

async fn task_action(State(state): Shared, headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    match state.echoed_user.lock().unwrap().clone() {
        Some(user) => Json(json!({"status": "Task updated.", "user": user})).into_response(),
        None => Json(json!({"status": "Task completed."})).into_response(),
    }
}

async fn delete_task(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    if id == 403 {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "Only the owner can delete the task."})),
        )
            .into_response();
    }
    match state.echoed_user.lock().unwrap().clone() {
        Some(user) => Json(json!({"status": "Task deleted with penalty.", "user": user})).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn character(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(state.character.lock().unwrap().clone()).into_response()
}

async fn ranks(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(state.ranks.lock().unwrap().clone()).into_response()
}

async fn purchase(State(state): Shared, headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"detail": "Not enough gold."})),
    )
        .into_response()
}

async fn user_search(
    State(state): Shared,
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let q = params.get("q").cloned().unwrap_or_default();
    Json(json!([{"id": 5, "username": q, "email": format!("{q}@example.com")}])).into_response()
}

async fn remove_friend(State(state): Shared, headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(json!({"status": "deleted"})).into_response()
}

async fn check_collaboration(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let strangers: Vec<i64> = body["collaborators"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_i64).filter(|id| *id >= 100).collect())
        .unwrap_or_default();
    if let Some(id) = strangers.first() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": format!("User {id} is not your friend"), "user_id": id})),
        )
            .into_response();
    }
    Json(json!({"detail": "All users are friends"})).into_response()
}

async fn send_invitation(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    *state.last_body.lock().unwrap() = Some(body);
    Json(json!({"detail": "Invitations sent"})).into_response()
}

async fn respond_invitation(
    State(state): Shared,
    headers: HeaderMap,
    Path(_id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let text = if body["accept"] == true {
        "Invitation accepted"
    } else {
        "Invitation declined"
    };
    Json(json!({"detail": text})).into_response()
}

async fn slow(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!([])).into_response()
}
