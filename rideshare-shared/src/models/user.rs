//! User model and database operations
//!
//! Users are riders, drivers or administrators. Only administrators may use the
//! API; riders and drivers exist as the parties of a ride.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id_user BIGSERIAL PRIMARY KEY,
//!     username VARCHAR(150) NOT NULL UNIQUE,
//!     email VARCHAR(254) NOT NULL DEFAULT '',
//!     first_name VARCHAR(150) NOT NULL DEFAULT '',
//!     last_name VARCHAR(150) NOT NULL DEFAULT '',
//!     role user_role NOT NULL,
//!     phone_number VARCHAR(15) NOT NULL DEFAULT '',
//!     is_active BOOLEAN NOT NULL DEFAULT TRUE,
//!     password_hash VARCHAR(255) NOT NULL,
//!     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Deleting a user cascades to every ride where the user is rider or driver.
//!
//! # Example
//!
//! ```no_run
//! use rideshare_shared::models::user::{CreateUser, User, UserRole};
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! let user = User::create(&pool, CreateUser {
//!     username: "driver1".to_string(),
//!     email: "driver@example.com".to_string(),
//!     password_hash: "$argon2id$...".to_string(),
//!     first_name: "Dana".to_string(),
//!     last_name: "Driver".to_string(),
//!     role: UserRole::Driver,
//!     phone_number: String::new(),
//! }).await?;
//!
//! let found = User::find_by_username(&pool, "driver1").await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Role a user holds in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Drives rides
    Driver,

    /// Rides as a passenger
    Passenger,

    /// Full access to the API
    Admin,
}

impl UserRole {
    /// Converts role to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Driver => "driver",
            UserRole::Passenger => "passenger",
            UserRole::Admin => "admin",
        }
    }

    /// Whether this role grants access to the API
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

const USER_COLUMNS: &str = "id_user, username, email, first_name, last_name, role, \
                            phone_number, is_active, password_hash, date_joined";

/// User model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Auto-incremented user ID
    pub id_user: i64,

    /// Unique login name
    pub username: String,

    /// Email address (may be empty)
    pub email: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Role in the system
    pub role: UserRole,

    /// Contact phone number (may be empty)
    pub phone_number: String,

    /// Inactive users cannot log in or use existing tokens
    pub is_active: bool,

    /// Argon2id password hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// When the account was created
    pub date_joined: DateTime<Utc>,
}

/// Compact user representation embedded in ride responses and user lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User ID
    pub id_user: i64,

    /// Login name
    pub username: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Role in the system
    pub role: UserRole,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id_user: user.id_user,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Unique login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Role
    pub role: UserRole,

    /// Contact phone number
    pub phone_number: String,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    /// Whether the update would change nothing
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
            && self.phone_number.is_none()
            && self.is_active.is_none()
    }
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the username is taken (`users_username_key`) or the
    /// database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, role, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.role)
            .bind(data.phone_number)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id_user: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id_user = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id_user)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by username (exact match)
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Checks whether a user with this ID exists
    pub async fn exists(pool: &PgPool, id_user: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id_user = $1)")
            .bind(id_user)
            .fetch_one(pool)
            .await
    }

    /// Lists every user ordered by ID
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id_user ASC");

        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Updates an existing user
    ///
    /// Returns `None` if the user doesn't exist. An empty update returns the
    /// current row unchanged.
    pub async fn update(
        pool: &PgPool,
        id_user: i64,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id_user).await;
        }

        // Build the SET list from the fields that are present; $1 is the ID
        let mut assignments: Vec<String> = Vec::new();
        let mut bind_count = 1;
        let mut push = |column: &str| {
            bind_count += 1;
            assignments.push(format!("{} = ${}", column, bind_count));
        };

        if data.username.is_some() {
            push("username");
        }
        if data.email.is_some() {
            push("email");
        }
        if data.password_hash.is_some() {
            push("password_hash");
        }
        if data.first_name.is_some() {
            push("first_name");
        }
        if data.last_name.is_some() {
            push("last_name");
        }
        if data.role.is_some() {
            push("role");
        }
        if data.phone_number.is_some() {
            push("phone_number");
        }
        if data.is_active.is_some() {
            push("is_active");
        }

        let query = format!(
            "UPDATE users SET {} WHERE id_user = $1 RETURNING {USER_COLUMNS}",
            assignments.join(", ")
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id_user);

        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(phone_number) = data.phone_number {
            q = q.bind(phone_number);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a user and, by cascade, their rides and token
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id_user: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id_user = $1")
            .bind(id_user)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}
