//! In-process stand-in for the research backend, used by integration tests.
//!
//! Every request is recorded as `"<route>"` or `"<route>:<detail>"` so tests
//! can assert exactly which calls the client made.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use research_core::query::normalize_query_response;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// OTP the stub accepts for every pending registration.
pub const STUB_OTP: &str = "123456";

/// An address that is registered from the start.
pub const TAKEN_EMAIL: &str = "taken@example.com";

#[derive(Debug, Clone)]
struct StubUser {
    id: String,
    email: String,
    password: String,
    verified: bool,
}

#[derive(Default)]
pub struct StubState {
    calls: Mutex<Vec<String>>,
    users: Mutex<Vec<StubUser>>,
    pending: Mutex<HashMap<String, String>>,
    sessions: Mutex<HashMap<String, String>>,
    history: Mutex<Vec<Value>>,
    query_reply: Mutex<Option<Value>>,
    export_reply: Mutex<Option<Value>>,
    signin_reply: Mutex<Option<Value>>,
    verify_reply: Mutex<Option<Value>>,
    assumed_user: Mutex<Option<String>>,
    broken: Mutex<HashSet<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl StubState {
    fn record(&self, call: impl Into<String>) {
        lock(&self.calls).push(call.into());
    }

    fn session_user(&self, headers: &HeaderMap) -> Option<String> {
        self.cookie_user(headers)
            .or_else(|| lock(&self.assumed_user).clone())
    }

    fn cookie_user(&self, headers: &HeaderMap) -> Option<String> {
        let cookies = headers.get(COOKIE)?.to_str().ok()?;
        let sid = cookies
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix("session="))?;
        lock(&self.sessions).get(sid).cloned()
    }

    fn is_broken(&self, route: &str) -> bool {
        lock(&self.broken).contains(route)
    }
}

/// A running stub backend with its base URL and shared state.
pub struct StubBackend {
    pub base_url: String,
    pub state: Arc<StubState>,
    _handle: tokio::task::JoinHandle<()>,
}

impl StubBackend {
    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state.calls).clone()
    }

    /// Recorded calls whose route matches `route`.
    pub fn calls_to(&self, route: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c == route || c.starts_with(&format!("{route}:")))
            .collect()
    }

    /// Register a verified account that can sign in immediately.
    pub fn add_user(&self, email: &str, password: &str) {
        add_user(&self.state, email, password, true);
    }

    /// Replace the default answer of the query endpoint.
    pub fn set_query_reply(&self, reply: Value) {
        *lock(&self.state.query_reply) = Some(reply);
    }

    /// Make the export endpoint answer with JSON instead of a PDF.
    pub fn set_export_reply(&self, reply: Value) {
        *lock(&self.state.export_reply) = Some(reply);
    }

    /// Replace the body of a successful sign-in. The session cookie is still set.
    pub fn set_signin_reply(&self, reply: Value) {
        *lock(&self.state.signin_reply) = Some(reply);
    }

    /// Replace the body of a successful OTP verification.
    pub fn set_verify_reply(&self, reply: Value) {
        *lock(&self.state.verify_reply) = Some(reply);
    }

    /// Treat every request as coming from an existing session, as if the
    /// client had started with a valid cookie.
    pub fn assume_signed_in(&self) {
        let id = lock(&self.state.users)
            .first()
            .map(|u| u.id.clone())
            .unwrap_or_else(|| "u1".into());
        *lock(&self.state.assumed_user) = Some(id);
    }

    /// Seed one history record as the backend would store it.
    pub fn push_history(&self, entry: Value) {
        lock(&self.state.history).push(entry);
    }

    /// Make `route` answer 500 with an empty body.
    pub fn break_route(&self, route: &str) {
        lock(&self.state.broken).insert(route.to_string());
    }
}

fn add_user(state: &StubState, email: &str, password: &str, verified: bool) -> String {
    let mut users = lock(&state.users);
    let id = format!("u{}", users.len() + 1);
    users.push(StubUser {
        id: id.clone(),
        email: email.to_string(),
        password: password.to_string(),
        verified,
    });
    id
}

/// Build the stub router, served under `/app/api`.
pub fn stub_router(state: Arc<StubState>) -> Router {
    let api = Router::new()
        .route("/auth/check-token", get(check_token))
        .route("/auth/check-email", get(check_email))
        .route("/auth/register", post(register))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/signin", post(signin))
        .route("/research/query", post(query))
        .route("/research/history", get(history))
        .route("/research/export/{id}", get(export))
        .with_state(state);
    Router::new().nest("/app/api", api)
}

/// Spawn the stub on a random port. Returns the StubBackend with the
/// `base_url` (e.g. "http://127.0.0.1:12345").
pub async fn spawn_stub_backend() -> StubBackend {
    let state = Arc::new(StubState::default());
    add_user(&state, TAKEN_EMAIL, "Secret123", true);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let app = stub_router(state.clone());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    StubBackend {
        base_url,
        state,
        _handle: handle,
    }
}

fn reject(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn broken() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

fn text_field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

async fn check_token(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.record("check-token");
    if state.is_broken("check-token") {
        return broken();
    }
    match state.session_user(&headers) {
        Some(user_id) => Json(json!({ "userId": user_id })).into_response(),
        None => reject(StatusCode::UNAUTHORIZED, json!({ "message": "Unauthorized" })),
    }
}

async fn check_email(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let email = params.get("email").cloned().unwrap_or_default();
    state.record(format!("check-email:{email}"));
    if state.is_broken("check-email") {
        return broken();
    }
    let taken = lock(&state.users).iter().any(|u| u.email == email);
    Json(json!({ "available": !taken })).into_response()
}

async fn register(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    state.record("register");
    if state.is_broken("register") {
        return broken();
    }
    let email = text_field(&body, "email");
    let password = text_field(&body, "password");

    let mut field_errors = serde_json::Map::new();
    for key in ["username", "email", "password"] {
        if text_field(&body, key).is_empty() {
            field_errors.insert(key.into(), json!(["Required"]));
        }
    }
    if !password.is_empty() && password.len() < 6 {
        field_errors.insert(
            "password".into(),
            json!(["Password must be at least 6 characters"]),
        );
    }
    if lock(&state.users).iter().any(|u| u.email == email) {
        field_errors.insert("email".into(), json!(["Email already registered"]));
    }
    if !field_errors.is_empty() {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({ "message": { "fieldErrors": field_errors } }),
        );
    }

    add_user(&state, &email, &password, false);
    let token = uuid::Uuid::new_v4().simple().to_string();
    lock(&state.pending).insert(token.clone(), email);
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "OTP sent",
            "redirectUrl": format!("http://localhost:5173/verify?token={token}"),
        })),
    )
        .into_response()
}

async fn verify_otp(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let token = params.get("token").cloned().unwrap_or_default();
    state.record(format!("verify-otp:{token}"));
    let otp = text_field(&body, "otp");

    let email = lock(&state.pending).get(&token).cloned();
    match email {
        Some(email) if otp == STUB_OTP => {
            lock(&state.pending).remove(&token);
            for user in lock(&state.users).iter_mut().filter(|u| u.email == email) {
                user.verified = true;
            }
            let reply = lock(&state.verify_reply)
                .clone()
                .unwrap_or_else(|| json!({ "message": "User verified successfully" }));
            Json(reply).into_response()
        }
        _ => reject(StatusCode::BAD_REQUEST, json!({ "message": "Invalid OTP" })),
    }
}

async fn signin(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    state.record("signin");
    let email = text_field(&body, "email");
    let password = text_field(&body, "password");

    let user = lock(&state.users)
        .iter()
        .find(|u| u.email == email && u.password == password)
        .cloned();
    match user {
        Some(user) if user.verified => {
            let sid = uuid::Uuid::new_v4().simple().to_string();
            lock(&state.sessions).insert(sid.clone(), user.id);
            let reply = lock(&state.signin_reply)
                .clone()
                .unwrap_or_else(|| json!({ "message": "Sign-in successfull" }));
            (
                [(SET_COOKIE, format!("session={sid}; Path=/; HttpOnly"))],
                Json(reply),
            )
                .into_response()
        }
        Some(_) => reject(
            StatusCode::FORBIDDEN,
            json!({ "message": "Please verify your email first" }),
        ),
        None => reject(
            StatusCode::UNAUTHORIZED,
            json!({ "message": "Invalid email or password" }),
        ),
    }
}

async fn query(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let text = text_field(&body, "query");
    state.record(format!("query:{text}"));
    if state.is_broken("query") {
        return broken();
    }
    if state.session_user(&headers).is_none() {
        return reject(StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }));
    }

    let reply = lock(&state.query_reply).clone().unwrap_or_else(|| {
        json!({ "message": {
            "answer": format!("Answer to: {text}"),
            "summary": "Stub summary",
            "papers": [{ "paperId": "p1", "title": "Stub paper", "url": "https://example.org/p1", "authors": ["A. Author"] }]
        }})
    });

    let mut history = lock(&state.history);
    let id = format!("c{}", history.len() + 1);
    history.push(json!({
        "_id": id,
        "query": text,
        "answer": normalize_query_response(reply.clone()).answer,
    }));
    Json(reply).into_response()
}

async fn history(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.record("history");
    if state.is_broken("history") {
        return broken();
    }
    if state.session_user(&headers).is_none() {
        return reject(StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }));
    }
    let result = lock(&state.history).clone();
    Json(json!({ "result": result })).into_response()
}

async fn export(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("export:{id}"));
    if state.session_user(&headers).is_none() {
        return reject(StatusCode::UNAUTHORIZED, json!({ "err": "Unauthorized" }));
    }
    let known = lock(&state.history)
        .iter()
        .any(|h| h.get("_id").and_then(Value::as_str) == Some(id.as_str()));
    if !known {
        return reject(StatusCode::NOT_FOUND, json!({ "err": "Conversation not found" }));
    }
    if let Some(reply) = lock(&state.export_reply).clone() {
        return Json(reply).into_response();
    }
    (
        [(CONTENT_TYPE, "application/pdf")],
        format!("%PDF-1.4\n% stub report {id}\n%%EOF\n"),
    )
        .into_response()
}
