#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;
use vagafacil::{
    auth,
    config::{AdminSeed, Config},
    db,
    state::AppState,
};

pub const ADMIN_EMAIL: &str = "admin@vagafacil.test";
pub const ADMIN_PASSWORD: &str = "senha-forte-123";

pub async fn memory_pool() -> anyhow::Result<SqlitePool> {
    // One connection that never gets recycled, so the in-memory database survives.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    db::migrate(&pool).await?;
    Ok(pool)
}

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "UTC_OFFSET_MINUTES" => Some("-180".to_string()),
        "STATIC_DIR" => Some("does-not-exist".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub async fn test_state() -> anyhow::Result<AppState> {
    let pool = memory_pool().await?;
    auth::ensure_admin(
        &pool,
        &AdminSeed {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        },
    )
    .await?;
    Ok(AppState {
        pool,
        config: Arc::new(test_config()),
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> anyhow::Result<TestResponse> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };

    send_request(app, request).await
}

/// Sends a prebuilt request, for cases `send` can't express (raw bodies, extra headers).
pub async fn send_request(app: &Router, request: Request<Body>) -> anyhow::Result<TestResponse> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok(TestResponse {
        status,
        headers,
        body,
    })
}

pub async fn login(app: &Router) -> anyhow::Result<String> {
    let res = send(
        app,
        Method::POST,
        "/api/admin/login",
        None,
        Some(serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await?;
    assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
    Ok(res.body["token"]
        .as_str()
        .expect("token in login response")
        .to_string())
}
