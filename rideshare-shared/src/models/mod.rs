//! Database models for the rideshare API
//!
//! Each model exposes its CRUD operations as associated functions taking a
//! `&PgPool`.
//!
//! # Models
//!
//! - `user`: Riders, drivers and administrators
//! - `ride`: Rides between a rider and a driver
//! - `ride_event`: Timestamped notes attached to a ride
//! - `auth_token`: One hashed API token per user

pub mod auth_token;
pub mod ride;
pub mod ride_event;
pub mod user;
