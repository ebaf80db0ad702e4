//! Middleware for the API server
//!
//! Authentication and the admin check live in `rideshare_shared::auth`; this
//! module holds response-level middleware.

pub mod security;
