//! Authentication and authorization
//!
//! - [`password`]: Argon2id password hashing
//! - [`token`]: Opaque API token generation, hashing and header parsing
//! - [`middleware`]: Token authentication middleware and `AuthContext`
//! - [`authorization`]: Admin-only role check

pub mod authorization;
pub mod middleware;
pub mod password;
pub mod token;
