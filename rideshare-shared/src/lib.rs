//! # Rideshare Shared Library
//!
//! Shared types, persistence and query logic used by the rideshare API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, rides, ride events, auth tokens)
//! - `db`: Connection pool and migrations
//! - `auth`: Password hashing, token keys, authentication middleware, role checks
//! - `geo`: Great-circle distance
//! - `query`: Ride filter and ordering construction
//! - `pagination`: Limit/offset windows with a cached total count
//! - `cache`: Count cache backends (Redis, in-memory)
//! - `redis`: Redis client wrapper

pub mod auth;
pub mod cache;
pub mod db;
pub mod geo;
pub mod models;
pub mod pagination;
pub mod query;
pub mod redis;
pub mod validation;

/// Current version of the rideshare shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
