use crate::{config::AdminSeed, db, error::AppError, state::AppState};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    Json,
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};
use chrono::Duration;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub const SESSION_COOKIE: &str = "session";

const BAD_CREDENTIALS: &str = "Email ou senha incorretos.";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Creates the seed admin when the admins table is still empty.
pub async fn ensure_admin(pool: &SqlitePool, seed: &AdminSeed) -> Result<bool, AppError> {
    if db::count_admins(pool).await? > 0 {
        return Ok(false);
    }
    let hash = hash_password(&seed.password)?;
    let admin = db::create_admin(pool, &seed.email, &hash).await?;
    tracing::info!(admin_id = admin.id, email = %admin.email, "seed admin created");
    Ok(true)
}

/// A request that carries a live admin session, by cookie or bearer token.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub admin_id: i64,
    pub token: String,
}

/// Candidate tokens in precedence order: the session cookie, then the bearer header.
fn session_tokens(parts: &Parts) -> Vec<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookie = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    cookie
        .into_iter()
        .chain(bearer)
        .filter(|t| !t.is_empty())
        .collect()
}

async fn lookup_session(parts: &Parts, state: &AppState) -> Result<Option<AdminSession>, AppError> {
    for token in session_tokens(parts) {
        if let Some(session) = db::find_active_session(&state.pool, &token).await? {
            return Ok(Some(AdminSession {
                admin_id: session.admin_id,
                token: session.token,
            }));
        }
    }
    Ok(None)
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        lookup_session(parts, state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("login necessário".to_string()))
    }
}

impl OptionalFromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        lookup_session(parts, state).await
    }
}

#[derive(Deserialize)]
pub struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct SessionInfo {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginPayload>, AppError>,
) -> Result<(CookieJar, Json<SessionInfo>), AppError> {
    let admin = db::find_admin_by_email(&app_state.pool, &payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !verify_password(&payload.password, &admin.password_hash)? {
        tracing::warn!(email = %admin.email, "rejected admin login");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let ttl = Duration::hours(app_state.config.session_ttl_hours);
    let session = db::create_session(&app_state.pool, admin.id, ttl).await?;
    tracing::info!(admin_id = admin.id, "admin logged in");

    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    Ok((
        jar.add(cookie),
        Json(SessionInfo {
            authenticated: true,
            token: Some(session.token),
        }),
    ))
}

pub async fn logout(
    State(app_state): State<AppState>,
    session: AdminSession,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionInfo>), AppError> {
    db::delete_session(&app_state.pool, &session.token).await?;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((
        jar,
        Json(SessionInfo {
            authenticated: false,
            token: None,
        }),
    ))
}

pub async fn current_session(session: Option<AdminSession>) -> Json<SessionInfo> {
    Json(SessionInfo {
        authenticated: session.is_some(),
        token: None,
    })
}
