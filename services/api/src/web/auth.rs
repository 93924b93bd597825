//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, and logout. Signing up creates the
//! caller's profile.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use regex::Regex;
use rental_core::PortError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::{session_id_from_headers, SESSION_COOKIE};
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Opens an auth session for `user_id` and returns the `Set-Cookie` value.
async fn open_session(state: &AppState, user_id: Uuid) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    Ok(format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        ttl.num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new account and its profile
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email address".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    let display_name = req.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let profile = state
        .db
        .create_profile_with_email(&email, display_name, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
            }
        })?;
    info!(user_id = %profile.id, "Profile created");

    let cookie = open_session(&state, profile.id).await?;
    let response = AuthResponse {
        user_id: profile.id,
        email: profile.email,
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_creds = state
        .db
        .get_credentials_by_email(req.email.trim())
        .await
        .map_err(|e| {
            info!("Login failed: {:?}", e);
            (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
        })?;

    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));
    }

    let cookie = open_session(&state, user_creds.user_id).await?;
    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("driver@example.com"));
        assert!(!is_valid_email("driver@example"));
        assert!(!is_valid_email("no at sign.com"));
    }
}
