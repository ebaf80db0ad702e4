//! Ride model and database operations
//!
//! A ride links a rider and a driver (both users) with pickup and dropoff
//! coordinates and a pickup time.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE ride_status AS ENUM ('en-route', 'pickup', 'dropoff');
//!
//! CREATE TABLE rides (
//!     id_ride BIGSERIAL PRIMARY KEY,
//!     status ride_status NOT NULL,
//!     id_rider BIGINT NOT NULL REFERENCES users(id_user) ON DELETE CASCADE,
//!     id_driver BIGINT NOT NULL REFERENCES users(id_user) ON DELETE CASCADE,
//!     pickup_latitude DOUBLE PRECISION NOT NULL,
//!     pickup_longitude DOUBLE PRECISION NOT NULL,
//!     dropoff_latitude DOUBLE PRECISION NOT NULL,
//!     dropoff_longitude DOUBLE PRECISION NOT NULL,
//!     pickup_time TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! Listing goes through [`Ride::list`] and [`Ride::count`], which take a
//! [`RideQuery`] describing filters and ordering. Rider and driver are joined
//! in the same statement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::user::{UserRole, UserSummary};
use crate::pagination::PageRequest;
use crate::query::RideQuery;

/// Ride lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ride_status")]
pub enum RideStatus {
    /// Driver is on the way to the pickup location
    #[sqlx(rename = "en-route")]
    #[serde(rename = "en-route")]
    EnRoute,

    /// Rider has been picked up
    #[sqlx(rename = "pickup")]
    #[serde(rename = "pickup")]
    Pickup,

    /// Rider has been dropped off
    #[sqlx(rename = "dropoff")]
    #[serde(rename = "dropoff")]
    Dropoff,
}

impl RideStatus {
    /// All statuses in declaration order
    pub const ALL: [RideStatus; 3] = [RideStatus::EnRoute, RideStatus::Pickup, RideStatus::Dropoff];

    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::EnRoute => "en-route",
            RideStatus::Pickup => "pickup",
            RideStatus::Dropoff => "dropoff",
        }
    }

    /// Parses a wire string, returning `None` for unknown values
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

const RIDE_COLUMNS: &str = "id_ride, status, id_rider, id_driver, pickup_latitude, \
                            pickup_longitude, dropoff_latitude, dropoff_longitude, pickup_time";

/// Columns selected by every joined ride query, distance excluded
pub(crate) const RIDE_WITH_PARTIES_COLUMNS: &str = r#"
    r.id_ride, r.status, r.id_rider, r.id_driver,
    r.pickup_latitude, r.pickup_longitude, r.dropoff_latitude, r.dropoff_longitude,
    r.pickup_time,
    rider.username AS rider_username, rider.first_name AS rider_first_name,
    rider.last_name AS rider_last_name, rider.role AS rider_role,
    driver.username AS driver_username, driver.first_name AS driver_first_name,
    driver.last_name AS driver_last_name, driver.role AS driver_role
"#;

/// Joins shared by list and count queries
pub(crate) const RIDE_JOINS: &str = r#"
    FROM rides r
    JOIN users rider ON rider.id_user = r.id_rider
    JOIN users driver ON driver.id_user = r.id_driver
"#;

/// Ride model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ride {
    /// Auto-incremented ride ID
    pub id_ride: i64,

    /// Current status
    pub status: RideStatus,

    /// User being driven
    pub id_rider: i64,

    /// User driving
    pub id_driver: i64,

    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,

    /// Scheduled or actual pickup time
    pub pickup_time: DateTime<Utc>,
}

/// A ride with its rider and driver resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RideWithParties {
    pub ride: Ride,
    pub rider: UserSummary,
    pub driver: UserSummary,

    /// Distance in km from the query's reference point, when ordering by distance
    pub distance_km: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct RideRow {
    id_ride: i64,
    status: RideStatus,
    id_rider: i64,
    id_driver: i64,
    pickup_latitude: f64,
    pickup_longitude: f64,
    dropoff_latitude: f64,
    dropoff_longitude: f64,
    pickup_time: DateTime<Utc>,
    rider_username: String,
    rider_first_name: String,
    rider_last_name: String,
    rider_role: UserRole,
    driver_username: String,
    driver_first_name: String,
    driver_last_name: String,
    driver_role: UserRole,
    distance_km: Option<f64>,
}

impl From<RideRow> for RideWithParties {
    fn from(row: RideRow) -> Self {
        Self {
            rider: UserSummary {
                id_user: row.id_rider,
                username: row.rider_username,
                first_name: row.rider_first_name,
                last_name: row.rider_last_name,
                role: row.rider_role,
            },
            driver: UserSummary {
                id_user: row.id_driver,
                username: row.driver_username,
                first_name: row.driver_first_name,
                last_name: row.driver_last_name,
                role: row.driver_role,
            },
            ride: Ride {
                id_ride: row.id_ride,
                status: row.status,
                id_rider: row.id_rider,
                id_driver: row.id_driver,
                pickup_latitude: row.pickup_latitude,
                pickup_longitude: row.pickup_longitude,
                dropoff_latitude: row.dropoff_latitude,
                dropoff_longitude: row.dropoff_longitude,
                pickup_time: row.pickup_time,
            },
            distance_km: row.distance_km,
        }
    }
}

/// Input for creating a new ride
#[derive(Debug, Clone)]
pub struct CreateRide {
    pub status: RideStatus,
    pub id_rider: i64,
    pub id_driver: i64,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_time: DateTime<Utc>,
}

/// Input for updating a ride; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateRide {
    pub status: Option<RideStatus>,
    pub id_rider: Option<i64>,
    pub id_driver: Option<i64>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub pickup_time: Option<DateTime<Utc>>,
}

impl UpdateRide {
    /// Whether the update would change nothing
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.id_rider.is_none()
            && self.id_driver.is_none()
            && self.pickup_latitude.is_none()
            && self.pickup_longitude.is_none()
            && self.dropoff_latitude.is_none()
            && self.dropoff_longitude.is_none()
            && self.pickup_time.is_none()
    }
}

impl Ride {
    /// Creates a new ride
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if rider or driver doesn't exist.
    pub async fn create(pool: &PgPool, data: CreateRide) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO rides (status, id_rider, id_driver, pickup_latitude, pickup_longitude,
                               dropoff_latitude, dropoff_longitude, pickup_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RIDE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ride>(&query)
            .bind(data.status)
            .bind(data.id_rider)
            .bind(data.id_driver)
            .bind(data.pickup_latitude)
            .bind(data.pickup_longitude)
            .bind(data.dropoff_latitude)
            .bind(data.dropoff_longitude)
            .bind(data.pickup_time)
            .fetch_one(pool)
            .await
    }

    /// Finds a ride by ID
    pub async fn find_by_id(pool: &PgPool, id_ride: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id_ride = $1");

        sqlx::query_as::<_, Ride>(&query)
            .bind(id_ride)
            .fetch_optional(pool)
            .await
    }

    /// Finds a ride by ID with rider and driver joined
    pub async fn find_with_parties(
        pool: &PgPool,
        id_ride: i64,
    ) -> Result<Option<RideWithParties>, sqlx::Error> {
        let query = format!(
            "SELECT {RIDE_WITH_PARTIES_COLUMNS}, NULL::float8 AS distance_km {RIDE_JOINS} WHERE r.id_ride = $1"
        );

        let row = sqlx::query_as::<_, RideRow>(&query)
            .bind(id_ride)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(RideWithParties::from))
    }

    /// Checks whether a ride with this ID exists
    pub async fn exists(pool: &PgPool, id_ride: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM rides WHERE id_ride = $1)")
            .bind(id_ride)
            .fetch_one(pool)
            .await
    }

    /// Lists one page of rides matching `query`, rider and driver joined
    pub async fn list(
        pool: &PgPool,
        query: &RideQuery,
        page: PageRequest,
    ) -> Result<Vec<RideWithParties>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        builder.push(RIDE_WITH_PARTIES_COLUMNS);
        builder.push(", ");
        query.push_distance_column(&mut builder);
        builder.push(RIDE_JOINS);
        query.push_where(&mut builder);
        query.push_order_by(&mut builder);
        builder.push(" LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let rows = builder.build_query_as::<RideRow>().fetch_all(pool).await?;

        Ok(rows.into_iter().map(RideWithParties::from).collect())
    }

    /// Counts rides matching `query`'s filters
    pub async fn count(pool: &PgPool, query: &RideQuery) -> Result<i64, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
        builder.push(RIDE_JOINS);
        query.push_where(&mut builder);

        let (count,): (i64,) = builder.build_query_as().fetch_one(pool).await?;

        Ok(count)
    }

    /// Updates a ride
    ///
    /// Returns `None` if the ride doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id_ride: i64,
        data: UpdateRide,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id_ride).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE rides SET ");
        let mut assignments = builder.separated(", ");

        if let Some(status) = data.status {
            assignments.push("status = ").push_bind_unseparated(status);
        }
        if let Some(id_rider) = data.id_rider {
            assignments.push("id_rider = ").push_bind_unseparated(id_rider);
        }
        if let Some(id_driver) = data.id_driver {
            assignments.push("id_driver = ").push_bind_unseparated(id_driver);
        }
        if let Some(value) = data.pickup_latitude {
            assignments.push("pickup_latitude = ").push_bind_unseparated(value);
        }
        if let Some(value) = data.pickup_longitude {
            assignments.push("pickup_longitude = ").push_bind_unseparated(value);
        }
        if let Some(value) = data.dropoff_latitude {
            assignments.push("dropoff_latitude = ").push_bind_unseparated(value);
        }
        if let Some(value) = data.dropoff_longitude {
            assignments.push("dropoff_longitude = ").push_bind_unseparated(value);
        }
        if let Some(pickup_time) = data.pickup_time {
            assignments.push("pickup_time = ").push_bind_unseparated(pickup_time);
        }

        builder.push(" WHERE id_ride = ");
        builder.push_bind(id_ride);
        builder.push(" RETURNING ");
        builder.push(RIDE_COLUMNS);

        builder.build_query_as::<Ride>().fetch_optional(pool).await
    }

    /// Deletes a ride
    ///
    /// This also deletes all of its events due to CASCADE.
    pub async fn delete(pool: &PgPool, id_ride: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rides WHERE id_ride = $1")
            .bind(id_ride)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
