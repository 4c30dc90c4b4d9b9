//! Shared utilities for integration testing: a mock admin backend.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use pos_api_client::ClientConfig;

pub const INITIAL_TOKEN: &str = "server-token-1";

/// State of the mock admin application.
#[derive(Default)]
pub struct MockAdmin {
    token: Mutex<String>,
    pub cookie_hits: AtomicUsize,
    pub token_hits: AtomicUsize,
    pub boom_hits: AtomicUsize,
    pub order_hits: AtomicUsize,
    /// Both issuance endpoints answer 500.
    pub issuance_down: AtomicBool,
    /// The cookie endpoint answers 204 without setting the cookie.
    pub cookie_without_token: AtomicBool,
    rotations: AtomicUsize,
}

#[allow(dead_code)]
impl MockAdmin {
    pub fn token(&self) -> String {
        self.token.lock().unwrap().clone()
    }

    /// Invalidate the current token, as a session expiry would.
    pub fn expire_token(&self, next: &str) {
        *self.token.lock().unwrap() = next.to_string();
    }

    fn accepts(&self, headers: &HeaderMap) -> bool {
        headers
            .get("x-csrf-token")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|token| token == self.token())
    }
}

type Shared = Arc<MockAdmin>;

fn csrf_mismatch() -> Response {
    (
        StatusCode::from_u16(419).unwrap(),
        Json(json!({"message": "CSRF token mismatch."})),
    )
        .into_response()
}

fn issuance_failed() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "Server Error"}))).into_response()
}

async fn csrf_cookie(State(admin): State<Shared>) -> Response {
    admin.cookie_hits.fetch_add(1, Ordering::SeqCst);
    if admin.issuance_down.load(Ordering::SeqCst) {
        return issuance_failed();
    }
    if admin.cookie_without_token.load(Ordering::SeqCst) {
        return StatusCode::NO_CONTENT.into_response();
    }
    let cookie = format!("XSRF-TOKEN={}; Path=/; SameSite=Lax", admin.token());
    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response()
}

async fn csrf_token(State(admin): State<Shared>) -> Response {
    admin.token_hits.fetch_add(1, Ordering::SeqCst);
    if admin.issuance_down.load(Ordering::SeqCst) {
        return issuance_failed();
    }
    Json(json!({"token": admin.token()})).into_response()
}

async fn create_order(State(admin): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    admin.order_hits.fetch_add(1, Ordering::SeqCst);
    if !admin.accepts(&headers) {
        return csrf_mismatch();
    }
    (
        StatusCode::CREATED,
        Json(json!({"id": "101", "total": "12.50", "items": body["items"].clone()})),
    )
        .into_response()
}

async fn delete_orders(State(admin): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !admin.accepts(&headers) {
        return csrf_mismatch();
    }
    let deleted = body["ids"].as_array().map_or(0, Vec::len);
    Json(json!({"deleted": deleted})).into_response()
}

async fn update_settings(State(admin): State<Shared>, headers: HeaderMap) -> Response {
    if !admin.accepts(&headers) {
        return csrf_mismatch();
    }
    let next = format!("rotated-{}", admin.rotations.fetch_add(1, Ordering::SeqCst) + 1);
    admin.expire_token(&next);
    let cookie = format!("XSRF-TOKEN={}; Path=/; SameSite=Lax", next);
    ([(header::SET_COOKIE, cookie)], Json(json!({"saved": true}))).into_response()
}

async fn create_customer(State(admin): State<Shared>, headers: HeaderMap) -> Response {
    if !admin.accepts(&headers) {
        return csrf_mismatch();
    }
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "message": "The given data was invalid.",
            "errors": {"email": ["Required"], "name": ["Too short", "Required"]}
        })),
    )
        .into_response()
}

async fn list_products(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "data": [
            {"id": "1", "name": "Tea", "price": "2.50", "sku": "0042"},
            {"id": "2", "name": "Scone", "price": "3", "sku": "0043"}
        ],
        "query": query
    }))
}

async fn boom(State(admin): State<Shared>) -> Response {
    admin.boom_hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "Server exploded"}))).into_response()
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"late": true}))
}

async fn broken() -> Response {
    ([(header::CONTENT_TYPE, "application/json")], "{\"unterminated\": ").into_response()
}

async fn receipt() -> &'static str {
    "RECEIPT #101\nTea x2"
}

/// Start the mock admin application on an ephemeral port.
pub async fn start_mock_admin() -> (SocketAddr, Shared) {
    let admin = Arc::new(MockAdmin::default());
    admin.expire_token(INITIAL_TOKEN);

    let app = Router::new()
        .route("/sanctum/csrf-cookie", get(csrf_cookie))
        .route("/csrf-token", get(csrf_token))
        .route("/api/v1/orders", post(create_order).delete(delete_orders))
        .route("/api/v1/settings", put(update_settings))
        .route("/api/v1/customers", post(create_customer))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/boom", get(boom))
        .route("/api/v1/slow", get(slow))
        .route("/api/v1/broken", get(broken))
        .route("/api/v1/receipt", get(receipt))
        .with_state(admin.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, admin)
}

/// Client configuration pointing at `addr` with short retry delays.
pub fn config_for(addr: SocketAddr) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = format!("http://{}", addr);
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 100;
    config
}
