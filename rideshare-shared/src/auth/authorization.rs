//! Role checks
//!
//! Every resource route is admin-only. [`admin_only_middleware`] runs after
//! [`token_auth_middleware`](super::middleware::token_auth_middleware) and
//! rejects callers whose role isn't `admin`.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    /// No auth context on the request
    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    /// Caller's role is insufficient
    #[error("You do not have permission to perform this action")]
    InsufficientRole { required: UserRole, actual: UserRole },
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AuthzError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthzError::InsufficientRole { .. } => (StatusCode::FORBIDDEN, "forbidden"),
        };

        (status, Json(json!({ "error": error, "message": self.to_string() }))).into_response()
    }
}

/// Checks that the caller is an administrator
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.role.is_admin() {
        return Err(AuthzError::InsufficientRole {
            required: UserRole::Admin,
            actual: auth.role,
        });
    }

    Ok(())
}

/// Admin-only middleware
pub async fn admin_only_middleware(req: Request, next: Next) -> Result<Response, AuthzError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or(AuthzError::Unauthenticated)?;

    if let Err(e) = require_admin(auth) {
        tracing::warn!(id_user = auth.id_user, role = auth.role.as_str(), "Non-admin request rejected");
        return Err(e);
    }

    Ok(next.run(req).await)
}
