//! User endpoints (admin only)
//!
//! - `GET    /api/users/`      - List users (summary shape, ordered by ID)
//! - `POST   /api/users/`      - Create a user
//! - `GET    /api/users/:id/`  - Retrieve a user (detail shape)
//! - `PUT    /api/users/:id/`  - Replace a user
//! - `PATCH  /api/users/:id/`  - Partially update a user
//! - `DELETE /api/users/:id/`  - Delete a user and, by cascade, their rides
//!
//! Passwords are accepted on write and stored as Argon2id hashes; they never
//! appear in a response. Changing a password or deactivating a user revokes
//! the user's token.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ResourceId, ValidatedJson},
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use rideshare_shared::{
    auth::password,
    models::{
        auth_token::AuthToken,
        user::{CreateUser, UpdateUser, User, UserRole, UserSummary},
    },
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Django-style usernames: letters, digits and `@.+-_`
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if !valid {
        let mut error = ValidationError::new("username");
        error.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        return Err(error);
    }
    Ok(())
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub role: UserRole,

    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters"))]
    pub phone_number: String,
}

/// Full update request (PUT)
#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    pub role: UserRole,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters"))]
    pub phone_number: String,

    pub is_active: Option<bool>,
}

/// Partial update request (PATCH)
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,

    pub role: Option<UserRole>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters"))]
    pub phone_number: Option<String>,

    pub is_active: Option<bool>,
}

impl From<ReplaceUserRequest> for PatchUserRequest {
    fn from(req: ReplaceUserRequest) -> Self {
        Self {
            username: Some(req.username),
            email: Some(req.email),
            role: Some(req.role),
            password: req.password,
            first_name: Some(req.first_name),
            last_name: Some(req.last_name),
            phone_number: Some(req.phone_number),
            is_active: req.is_active,
        }
    }
}

impl PatchUserRequest {
    /// Hashes the password, if any, and builds the model update
    fn into_update(self) -> ApiResult<UpdateUser> {
        let password_hash = self
            .password
            .as_deref()
            .map(password::hash_password)
            .transpose()?;

        Ok(UpdateUser {
            username: self.username,
            email: self.email,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            phone_number: self.phone_number,
            is_active: self.is_active,
        })
    }
}

fn not_found(id_user: i64) -> ApiError {
    ApiError::NotFound(format!("User {} not found", id_user))
}

/// Lists all users in summary shape
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = User::list(&state.db).await?;

    Ok(Json(users.iter().map(UserSummary::from).collect()))
}

/// Creates a user
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or the username is taken
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            phone_number: req.phone_number,
        },
    )
    .await?;

    tracing::info!(id_user = user.id_user, role = user.role.as_str(), "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Retrieves a user in detail shape
pub async fn get_user(
    State(state): State<AppState>,
    ResourceId(id_user): ResourceId,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, id_user)
        .await?
        .ok_or_else(|| not_found(id_user))?;

    Ok(Json(user))
}

/// Replaces a user; `username`, `email` and `role` are required
pub async fn replace_user(
    State(state): State<AppState>,
    ResourceId(id_user): ResourceId,
    ValidatedJson(req): ValidatedJson<ReplaceUserRequest>,
) -> ApiResult<Json<User>> {
    apply_update(&state, id_user, req.into()).await
}

/// Updates the given fields of a user
pub async fn patch_user(
    State(state): State<AppState>,
    ResourceId(id_user): ResourceId,
    ValidatedJson(req): ValidatedJson<PatchUserRequest>,
) -> ApiResult<Json<User>> {
    apply_update(&state, id_user, req).await
}

async fn apply_update(state: &AppState, id_user: i64, req: PatchUserRequest) -> ApiResult<Json<User>> {
    let update = req.into_update()?;
    let revoke_token = update.password_hash.is_some() || update.is_active == Some(false);

    let user = User::update(&state.db, id_user, update)
        .await?
        .ok_or_else(|| not_found(id_user))?;

    if revoke_token && AuthToken::revoke(&state.db, id_user).await? {
        tracing::info!(id_user, "Token revoked after credential change");
    }

    tracing::info!(id_user, "User updated");

    Ok(Json(user))
}

/// Deletes a user; their rides and token go with them
pub async fn delete_user(
    State(state): State<AppState>,
    ResourceId(id_user): ResourceId,
) -> ApiResult<StatusCode> {
    if !User::delete(&state.db, id_user).await? {
        return Err(not_found(id_user));
    }

    tracing::info!(id_user, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("rider.one+test@x_y-z").is_ok());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "username": "",
            "email": "not-an-email",
            "password": "short",
            "role": "driver",
            "phone_number": "0123456789012345"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("phone_number"));
        assert!(!fields.contains_key("first_name"));
    }

    #[test]
    fn test_create_request_rejects_unknown_role() {
        let result = serde_json::from_value::<CreateUserRequest>(serde_json::json!({
            "username": "someone",
            "email": "someone@example.com",
            "password": "long enough",
            "role": "superuser"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_replace_requires_identity_fields() {
        let result = serde_json::from_value::<ReplaceUserRequest>(serde_json::json!({
            "username": "someone",
            "role": "admin"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_replace_becomes_full_patch() {
        let req: ReplaceUserRequest = serde_json::from_value(serde_json::json!({
            "username": "someone",
            "email": "someone@example.com",
            "role": "passenger"
        }))
        .unwrap();

        let patch = PatchUserRequest::from(req);
        assert_eq!(patch.username.as_deref(), Some("someone"));
        assert_eq!(patch.first_name.as_deref(), Some(""));
        assert!(patch.password.is_none());
        assert!(patch.is_active.is_none());
    }

    #[test]
    fn test_patch_hashes_password() {
        let patch = PatchUserRequest {
            password: Some("new password".to_string()),
            ..Default::default()
        };

        let update = patch.into_update().unwrap();
        let hash = update.password_hash.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(password::verify_password("new password", &hash).unwrap());
    }

    #[test]
    fn test_empty_patch_is_empty_update() {
        let update = PatchUserRequest::default().into_update().unwrap();
        assert!(update.is_empty());
    }
}
