//! Ride event model and database operations
//!
//! Events are short notes attached to a ride ("Status changed to pickup").
//! Every listing is newest first.
//!
//! Reads come in two flavours. The `list_recent*` functions only return events
//! created within a time window ending now; `list_all` and `list_for_ride`
//! return everything. Single-event lookups by ID never apply the window.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Duration;
//! use rideshare_shared::models::ride_event::RideEvent;
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! let last_day = RideEvent::list_recent(&pool, Duration::hours(24)).await?;
//! let everything = RideEvent::list_all(&pool).await?;
//! assert!(last_day.len() <= everything.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const EVENT_COLUMNS: &str = "id_ride_event, id_ride, description, created_at";

/// Ride event model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RideEvent {
    /// Auto-incremented event ID
    pub id_ride_event: i64,

    /// Ride the event belongs to
    pub id_ride: i64,

    /// Free-text description (max 255 chars)
    pub description: String,

    /// Set by the database at insert
    pub created_at: DateTime<Utc>,
}

/// Input for creating a ride event
#[derive(Debug, Clone)]
pub struct CreateRideEvent {
    pub id_ride: i64,
    pub description: String,
}

/// Input for updating a ride event; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateRideEvent {
    pub id_ride: Option<i64>,
    pub description: Option<String>,
}

/// Window length in seconds, bound into `NOW() - make_interval(secs => ..)`
///
/// The window is measured against the database clock, the same clock that
/// stamps `created_at`.
pub fn window_secs(window: Duration) -> f64 {
    window.num_milliseconds() as f64 / 1000.0
}

impl RideEvent {
    /// Creates a new event
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if the ride doesn't exist.
    pub async fn create(pool: &PgPool, data: CreateRideEvent) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO ride_events (id_ride, description) VALUES ($1, $2) RETURNING {EVENT_COLUMNS}"
        );

        sqlx::query_as::<_, RideEvent>(&query)
            .bind(data.id_ride)
            .bind(data.description)
            .fetch_one(pool)
            .await
    }

    /// Finds an event by ID, regardless of age
    pub async fn find_by_id(
        pool: &PgPool,
        id_ride_event: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM ride_events WHERE id_ride_event = $1");

        sqlx::query_as::<_, RideEvent>(&query)
            .bind(id_ride_event)
            .fetch_optional(pool)
            .await
    }

    /// Lists events created within `window` of now
    pub async fn list_recent(pool: &PgPool, window: Duration) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM ride_events
            WHERE created_at >= NOW() - make_interval(secs => $1)
            ORDER BY created_at DESC, id_ride_event DESC
            "#
        );

        sqlx::query_as::<_, RideEvent>(&query)
            .bind(window_secs(window))
            .fetch_all(pool)
            .await
    }

    /// Lists every event
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM ride_events ORDER BY created_at DESC, id_ride_event DESC"
        );

        sqlx::query_as::<_, RideEvent>(&query).fetch_all(pool).await
    }

    /// Lists every event of one ride, regardless of age
    pub async fn list_for_ride(pool: &PgPool, id_ride: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM ride_events
            WHERE id_ride = $1
            ORDER BY created_at DESC, id_ride_event DESC
            "#
        );

        sqlx::query_as::<_, RideEvent>(&query)
            .bind(id_ride)
            .fetch_all(pool)
            .await
    }

    /// Fetches recent events for a batch of rides in one query
    ///
    /// Returns a map from ride ID to that ride's events, newest first. Rides
    /// without recent events are absent from the map.
    pub async fn list_recent_for_rides(
        pool: &PgPool,
        id_rides: &[i64],
        window: Duration,
    ) -> Result<HashMap<i64, Vec<Self>>, sqlx::Error> {
        if id_rides.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM ride_events
            WHERE id_ride = ANY($1) AND created_at >= NOW() - make_interval(secs => $2)
            ORDER BY created_at DESC, id_ride_event DESC
            "#
        );

        let events = sqlx::query_as::<_, RideEvent>(&query)
            .bind(id_rides)
            .bind(window_secs(window))
            .fetch_all(pool)
            .await?;

        Ok(group_by_ride(events))
    }

    /// Updates an event
    ///
    /// Returns `None` if the event doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id_ride_event: i64,
        data: UpdateRideEvent,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE ride_events
            SET id_ride = COALESCE($2, id_ride),
                description = COALESCE($3, description)
            WHERE id_ride_event = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, RideEvent>(&query)
            .bind(id_ride_event)
            .bind(data.id_ride)
            .bind(data.description)
            .fetch_optional(pool)
            .await
    }

    /// Deletes an event
    pub async fn delete(pool: &PgPool, id_ride_event: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ride_events WHERE id_ride_event = $1")
            .bind(id_ride_event)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Groups events by ride, keeping the incoming order within each ride
fn group_by_ride(events: Vec<RideEvent>) -> HashMap<i64, Vec<RideEvent>> {
    let mut grouped: HashMap<i64, Vec<RideEvent>> = HashMap::new();
    for event in events {
        grouped.entry(event.id_ride).or_default().push(event);
    }
    grouped
}
