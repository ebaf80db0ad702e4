//! Auth token storage
//!
//! Each user has at most one token. Only the SHA-256 hash of the key is
//! stored, so a key can't be shown again after it is issued. Issuing a token
//! for a user that already has one replaces it.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE auth_tokens (
//!     id_user BIGINT PRIMARY KEY REFERENCES users(id_user) ON DELETE CASCADE,
//!     key_hash VARCHAR(64) NOT NULL UNIQUE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::token::{generate_token, hash_token};
use crate::models::user::User;

/// Stored token row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    pub id_user: i64,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Issues a fresh token for a user, replacing any previous one
    ///
    /// Returns the plaintext key. It is not recoverable afterwards.
    pub async fn issue(pool: &PgPool, id_user: i64) -> Result<String, sqlx::Error> {
        let (key, key_hash) = generate_token();

        sqlx::query(
            r#"
            INSERT INTO auth_tokens (id_user, key_hash)
            VALUES ($1, $2)
            ON CONFLICT (id_user)
            DO UPDATE SET key_hash = EXCLUDED.key_hash, created_at = NOW()
            "#,
        )
        .bind(id_user)
        .bind(&key_hash)
        .execute(pool)
        .await?;

        Ok(key)
    }

    /// Resolves a plaintext key to its owner
    ///
    /// Returns `None` for unknown keys. Inactive users are returned as-is;
    /// callers decide how to treat them.
    pub async fn find_user_by_key(pool: &PgPool, key: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id_user, u.username, u.email, u.first_name, u.last_name, u.role,
                   u.phone_number, u.is_active, u.password_hash, u.date_joined
            FROM auth_tokens t
            JOIN users u ON u.id_user = t.id_user
            WHERE t.key_hash = $1
            "#,
        )
        .bind(hash_token(key))
        .fetch_optional(pool)
        .await
    }

    /// Finds the token row for a user
    pub async fn find_by_user(pool: &PgPool, id_user: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuthToken>(
            "SELECT id_user, key_hash, created_at FROM auth_tokens WHERE id_user = $1",
        )
        .bind(id_user)
        .fetch_optional(pool)
        .await
    }

    /// Revokes a user's token
    pub async fn revoke(pool: &PgPool, id_user: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE id_user = $1")
            .bind(id_user)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
