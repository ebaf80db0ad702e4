//! Redis integration
//!
//! Redis backs the shared pagination count cache (see
//! [`crate::cache::RedisCountCache`]). The connection is optional: without
//! `REDIS_URL` the API falls back to an in-process cache.

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
