//! API route handlers
//!
//! Organized by resource:
//!
//! - `health`: Health check endpoint
//! - `auth`: Token login
//! - `users`: User CRUD
//! - `rides`: Ride CRUD with filtering, distance ordering and pagination
//! - `ride_events`: Ride event CRUD with the recent-event window

pub mod auth;
pub mod health;
pub mod ride_events;
pub mod rides;
pub mod users;
