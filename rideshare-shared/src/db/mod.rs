//! Database layer
//!
//! - `pool`: PostgreSQL connection pool with a startup health check
//! - `migrations`: Embedded `sqlx` migrations from `rideshare-shared/migrations`
//!
//! Models live in [`crate::models`].

pub mod migrations;
pub mod pool;
