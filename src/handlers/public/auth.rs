// handlers/public/auth.rs - session acquisition
//
// POST /auth/register, POST /auth/login, POST /auth/logout

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::app::AppState;
use crate::auth::cookie::{clear_session_cookie, session_cookie};
use crate::auth::{hash_password, verify_missing_principal, verify_password, TokenPayload, MIN_PASSWORD_LENGTH};
use crate::database::models::{NewPrincipal, Role};
use crate::database::StoreError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// Column widths of the users table
const MAX_NAME_LENGTH: usize = 255;
const MAX_EMAIL_LENGTH: usize = 255;
const MAX_PHONE_LENGTH: usize = 32;

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = HashMap::new();

    let username_len = req.username.chars().count();
    if !(3..=32).contains(&username_len)
        || !req.username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.insert(
            "username".to_string(),
            "must be 3 to 32 letters, digits or underscores".to_string(),
        );
    }
    if !req.email.contains('@') {
        errors.insert("email".to_string(), "must be a valid email address".to_string());
    } else if req.email.trim().chars().count() > MAX_EMAIL_LENGTH {
        errors.insert(
            "email".to_string(),
            format!("must be at most {} characters", MAX_EMAIL_LENGTH),
        );
    }
    if req.name.trim().chars().count() > MAX_NAME_LENGTH {
        errors.insert(
            "name".to_string(),
            format!("must be at most {} characters", MAX_NAME_LENGTH),
        );
    }
    if req.phone.chars().count() > MAX_PHONE_LENGTH {
        errors.insert(
            "phone".to_string(),
            format!("must be at most {} characters", MAX_PHONE_LENGTH),
        );
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password".to_string(),
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
    }
    if req.password != req.confirm_password {
        errors.insert("confirm_password".to_string(), "does not match password".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Invalid registration", Some(errors)))
    }
}

/// Issues a token and the cookie that carries it
fn start_session(state: &AppState, username: &str) -> Result<(String, TokenPayload), ApiError> {
    let (token, payload) = state
        .tokens
        .issue(username, state.config.security.token_duration())?;
    let cookie = session_cookie(&token, state.config.security.secure_cookies);
    Ok((cookie, payload))
}

/// POST /auth/register - create a `user` principal and start a session
pub async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> ApiResult<Value> {
    validate_registration(&req)?;

    let new = NewPrincipal {
        name: if req.name.trim().is_empty() {
            req.username.clone()
        } else {
            req.name.trim().to_string()
        },
        username: req.username,
        email: req.email.trim().to_string(),
        phone: req.phone,
        password_hash: hash_password(&req.password)?,
        role: Role::User,
    };

    let principal = match state.store.create_principal(new).await {
        Ok(principal) => principal,
        Err(StoreError::Conflict(_)) => return Err(ApiError::conflict("Username or email already registered")),
        Err(e) => return Err(e.into()),
    };
    tracing::info!("Registered user '{}'", principal.username);

    let (cookie, payload) = start_session(&state, &principal.username)?;
    Ok(ApiResponse::created(json!({
        "user": principal,
        "expires_at": payload.expires_at,
    }))
    .with_cookie(cookie))
}

/// POST /auth/login - verify credentials and start a session
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<Value> {
    let principal = match state.store.get_principal(&req.username).await {
        Ok(principal) => Some(principal),
        Err(StoreError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    // Unknown user and wrong password look identical to the caller
    let verified = match &principal {
        Some(p) => verify_password(&p.password_hash, &req.password),
        None => verify_missing_principal(&req.password),
    };
    let principal = match principal {
        Some(p) if verified => p,
        _ => {
            tracing::info!("Login failed for '{}'", req.username);
            return Err(ApiError::unauthorized("invalid credentials"));
        }
    };

    let (cookie, payload) = start_session(&state, &principal.username)?;
    tracing::info!(token_id = %payload.id, "User '{}' logged in", principal.username);

    Ok(ApiResponse::success(json!({
        "username": principal.username,
        "role": principal.role,
        "expires_at": payload.expires_at,
    }))
    .with_cookie(cookie))
}

/// POST /auth/logout - expire the session cookie
pub async fn logout(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "logged_out": true }))
        .with_cookie(clear_session_cookie(state.config.security.secure_cookies))
}
