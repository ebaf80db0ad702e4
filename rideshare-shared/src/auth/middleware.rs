//! Token authentication middleware for Axum
//!
//! Reads `Authorization: Token <key>`, resolves the key to an active user and
//! adds an [`AuthContext`] to the request extensions. Handlers pick it up with
//! `Extension<AuthContext>`.
//!
//! # Example
//!
//! ```no_run
//! use axum::{middleware, routing::get, Extension, Router};
//! use rideshare_shared::auth::middleware::{token_auth_middleware, AuthContext};
//! use sqlx::PgPool;
//!
//! async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
//!     auth.username
//! }
//!
//! fn router(pool: PgPool) -> Router {
//!     Router::new()
//!         .route("/whoami", get(whoami))
//!         .layer(middleware::from_fn_with_state(pool, token_auth_middleware))
//! }
//! ```

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use super::token::parse_authorization;
use crate::models::auth_token::AuthToken;
use crate::models::user::{User, UserRole};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub id_user: i64,
    pub username: String,
    pub role: UserRole,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            id_user: user.id_user,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    /// Header present but not `Token <key>`
    #[error("Invalid token header: {0}")]
    InvalidFormat(String),

    /// Unknown key
    #[error("Invalid token")]
    InvalidToken,

    /// Key belongs to a deactivated user
    #[error("User inactive or deleted")]
    InactiveUser,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::DatabaseError(ref e) => {
                tracing::error!(error = %e, "Token lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        };

        let message = match self {
            AuthError::DatabaseError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": if status == StatusCode::UNAUTHORIZED { "unauthorized" } else { "internal_error" },
            "message": message,
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Token"));
        }
        response
    }
}

/// Resolves the `Authorization` header value to an auth context
pub async fn authenticate(pool: &PgPool, header_value: Option<&str>) -> Result<AuthContext, AuthError> {
    let header_value = header_value.ok_or(AuthError::MissingCredentials)?;

    let key = parse_authorization(header_value)
        .ok_or_else(|| AuthError::InvalidFormat("Expected 'Token <key>'".to_string()))?;

    let user = AuthToken::find_user_by_key(pool, key)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::InvalidToken)?;

    if !user.is_active {
        return Err(AuthError::InactiveUser);
    }

    Ok(AuthContext::from(&user))
}

/// Token authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized if the header is missing or malformed, the key is
/// unknown, or the user is inactive.
pub async fn token_auth_middleware(
    State(pool): State<PgPool>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let auth = authenticate(&pool, header_value.as_deref()).await?;

    tracing::debug!(id_user = auth.id_user, role = auth.role.as_str(), "Request authenticated");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
