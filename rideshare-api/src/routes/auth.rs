//! Token login endpoint
//!
//! ```text
//! POST /api/auth/login/
//! Content-Type: application/json
//!
//! { "username": "admin", "password": "correct horse" }
//! ```
//!
//! ```json
//! { "token": "9b1d...", "id_user": 1, "username": "admin", "role": "admin" }
//! ```
//!
//! The token goes in `Authorization: Token <token>` on every other request.
//! Each successful login issues a new token and invalidates the previous one.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
};
use axum::{extract::State, Json};
use rideshare_shared::{
    auth::password,
    models::{
        auth_token::AuthToken,
        user::{User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials";

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub username: String,

    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Opaque token for the `Authorization: Token` header
    pub token: String,

    pub id_user: i64,
    pub username: String,
    pub role: UserRole,
}

/// Login endpoint
///
/// # Errors
///
/// - `400 Bad Request`: Missing username or password
/// - `401 Unauthorized`: Unknown user, wrong password, or inactive user
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::info!(username = %user.username, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        tracing::info!(username = %user.username, "Login rejected: inactive user");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = AuthToken::issue(&state.db, user.id_user).await?;

    tracing::info!(id_user = user.id_user, role = user.role.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        token,
        id_user: user.id_user,
        username: user.username,
        role: user.role,
    }))
}
