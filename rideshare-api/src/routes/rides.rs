//! Ride endpoints (admin only)
//!
//! - `GET    /api/rides/`      - Paginated, filterable list
//! - `POST   /api/rides/`      - Create a ride
//! - `GET    /api/rides/:id/`  - Retrieve a ride
//! - `PUT    /api/rides/:id/`  - Replace a ride
//! - `PATCH  /api/rides/:id/`  - Partially update a ride
//! - `DELETE /api/rides/:id/`  - Delete a ride and its events
//!
//! # List parameters
//!
//! | Parameter         | Meaning                                             |
//! |-------------------|-----------------------------------------------------|
//! | `status`          | `en-route`, `pickup` or `dropoff`                   |
//! | `id_rider__email` | Rider's exact email                                 |
//! | `ordering`        | `pickup_time`, `-pickup_time` (default), `distance`, `-distance` |
//! | `lat`, `lng`      | Reference point, required for distance ordering     |
//! | `limit`, `offset` | Page window (default 20, max 100)                   |
//!
//! The list is wrapped in `{count, next, previous, results}`. `count` comes
//! from the pagination count cache and may lag writes by up to its TTL.
//!
//! Rides embed their rider, driver and recent events (within the configured
//! event window). Events for a whole page are loaded in one query.

use std::collections::HashMap;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{ResourceId, ValidatedJson},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rideshare_shared::{
    models::{
        ride::{CreateRide, Ride, RideStatus, RideWithParties, UpdateRide},
        ride_event::RideEvent,
        user::{User, UserSummary},
    },
    pagination::{cached_count, Page},
    query::RideListParams,
    validation::{check_latitude, check_longitude, FieldError},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::{Validate, ValidationError, ValidationErrors};

/// Ride as it appears in the list
#[derive(Debug, Serialize)]
pub struct RideListItem {
    pub id_ride: i64,
    pub status: RideStatus,
    pub id_rider: i64,
    pub id_driver: i64,
    pub rider: UserSummary,
    pub driver: UserSummary,
    pub pickup_time: DateTime<Utc>,
    pub events: Vec<RideEvent>,

    /// Only present when ordering by distance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl RideListItem {
    fn new(ride: RideWithParties, events: Vec<RideEvent>) -> Self {
        Self {
            id_ride: ride.ride.id_ride,
            status: ride.ride.status,
            id_rider: ride.ride.id_rider,
            id_driver: ride.ride.id_driver,
            rider: ride.rider,
            driver: ride.driver,
            pickup_time: ride.ride.pickup_time,
            events,
            distance_km: ride.distance_km,
        }
    }
}

/// Ride with coordinates, as returned by retrieve
#[derive(Debug, Serialize)]
pub struct RideDetail {
    pub id_ride: i64,
    pub status: RideStatus,
    pub rider: UserSummary,
    pub driver: UserSummary,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_time: DateTime<Utc>,
    pub events: Vec<RideEvent>,
}

impl RideDetail {
    fn new(ride: RideWithParties, events: Vec<RideEvent>) -> Self {
        Self {
            id_ride: ride.ride.id_ride,
            status: ride.ride.status,
            rider: ride.rider,
            driver: ride.driver,
            pickup_latitude: ride.ride.pickup_latitude,
            pickup_longitude: ride.ride.pickup_longitude,
            dropoff_latitude: ride.ride.dropoff_latitude,
            dropoff_longitude: ride.ride.dropoff_longitude,
            pickup_time: ride.ride.pickup_time,
            events,
        }
    }
}

/// Detail shape plus the writable party IDs, returned by create and update
#[derive(Debug, Serialize)]
pub struct RideWriteResponse {
    pub id_rider: i64,
    pub id_driver: i64,

    #[serde(flatten)]
    pub detail: RideDetail,
}

impl RideWriteResponse {
    fn new(ride: RideWithParties, events: Vec<RideEvent>) -> Self {
        Self {
            id_rider: ride.ride.id_rider,
            id_driver: ride.ride.id_driver,
            detail: RideDetail::new(ride, events),
        }
    }
}

/// Create and full update body; every field is required
#[derive(Debug, Clone, Deserialize)]
pub struct RideRequest {
    pub status: RideStatus,
    pub id_rider: i64,
    pub id_driver: i64,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub pickup_time: DateTime<Utc>,
}

/// Partial update body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchRideRequest {
    pub status: Option<RideStatus>,
    pub id_rider: Option<i64>,
    pub id_driver: Option<i64>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub pickup_time: Option<DateTime<Utc>>,
}

impl From<RideRequest> for PatchRideRequest {
    fn from(req: RideRequest) -> Self {
        Self {
            status: Some(req.status),
            id_rider: Some(req.id_rider),
            id_driver: Some(req.id_driver),
            pickup_latitude: Some(req.pickup_latitude),
            pickup_longitude: Some(req.pickup_longitude),
            dropoff_latitude: Some(req.dropoff_latitude),
            dropoff_longitude: Some(req.dropoff_longitude),
            pickup_time: Some(req.pickup_time),
        }
    }
}

impl From<PatchRideRequest> for UpdateRide {
    fn from(req: PatchRideRequest) -> Self {
        Self {
            status: req.status,
            id_rider: req.id_rider,
            id_driver: req.id_driver,
            pickup_latitude: req.pickup_latitude,
            pickup_longitude: req.pickup_longitude,
            dropoff_latitude: req.dropoff_latitude,
            dropoff_longitude: req.dropoff_longitude,
            pickup_time: req.pickup_time,
        }
    }
}

impl From<RideRequest> for CreateRide {
    fn from(req: RideRequest) -> Self {
        Self {
            status: req.status,
            id_rider: req.id_rider,
            id_driver: req.id_driver,
            pickup_latitude: req.pickup_latitude,
            pickup_longitude: req.pickup_longitude,
            dropoff_latitude: req.dropoff_latitude,
            dropoff_longitude: req.dropoff_longitude,
            pickup_time: req.pickup_time,
        }
    }
}

fn check_coordinate(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<f64>,
    check: fn(&str, f64) -> Result<(), FieldError>,
) {
    if let Some(Err(e)) = value.map(|value| check(field, value)) {
        let mut error = ValidationError::new("coordinate");
        error.message = Some(e.message.into());
        errors.add(field, error);
    }
}

impl Validate for PatchRideRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_coordinate(&mut errors, "pickup_latitude", self.pickup_latitude, check_latitude);
        check_coordinate(&mut errors, "pickup_longitude", self.pickup_longitude, check_longitude);
        check_coordinate(&mut errors, "dropoff_latitude", self.dropoff_latitude, check_latitude);
        check_coordinate(&mut errors, "dropoff_longitude", self.dropoff_longitude, check_longitude);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for RideRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        PatchRideRequest::from(self.clone()).validate()
    }
}

/// Rejects rider/driver IDs that don't reference a user
async fn check_parties(db: &PgPool, id_rider: Option<i64>, id_driver: Option<i64>) -> ApiResult<()> {
    let mut details = Vec::new();

    for (field, id_user) in [("id_rider", id_rider), ("id_driver", id_driver)] {
        if let Some(id_user) = id_user {
            if !User::exists(db, id_user).await? {
                details.push(ValidationErrorDetail::new(
                    field,
                    format!("Invalid pk \"{}\" - object does not exist.", id_user),
                ));
            }
        }
    }

    if !details.is_empty() {
        return Err(ApiError::ValidationError(details));
    }
    Ok(())
}

fn not_found(id_ride: i64) -> ApiError {
    ApiError::NotFound(format!("Ride {} not found", id_ride))
}

/// Loads a ride with its parties and recent events
async fn load_ride(state: &AppState, id_ride: i64) -> ApiResult<(RideWithParties, Vec<RideEvent>)> {
    let ride = Ride::find_with_parties(&state.db, id_ride)
        .await?
        .ok_or_else(|| not_found(id_ride))?;

    let events = RideEvent::list_recent_for_rides(&state.db, &[id_ride], state.event_window())
        .await?
        .remove(&id_ride)
        .unwrap_or_default();

    Ok((ride, events))
}

/// Attaches each ride's events, keeping page order
fn attach_events(
    rides: Vec<RideWithParties>,
    mut events: HashMap<i64, Vec<RideEvent>>,
) -> Vec<RideListItem> {
    rides
        .into_iter()
        .map(|ride| {
            let ride_events = events.remove(&ride.ride.id_ride).unwrap_or_default();
            RideListItem::new(ride, ride_events)
        })
        .collect()
}

/// Lists rides matching the query parameters, one page at a time
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status, bad page window, or distance ordering
///   without a valid `lat`/`lng`
pub async fn list_rides(
    State(state): State<AppState>,
    Query(params): Query<RideListParams>,
) -> ApiResult<Json<Page<RideListItem>>> {
    let (query, page) = params.parse()?;

    let cache_key = query.count_cache_key();
    let count = cached_count(state.count_cache.as_ref(), &cache_key, state.count_ttl(), || {
        Ride::count(&state.db, &query)
    })
    .await?;

    let rides = Ride::list(&state.db, &query, page).await?;
    let id_rides: Vec<i64> = rides.iter().map(|ride| ride.ride.id_ride).collect();
    let events =
        RideEvent::list_recent_for_rides(&state.db, &id_rides, state.event_window()).await?;

    tracing::debug!(
        count,
        returned = rides.len(),
        limit = page.limit,
        offset = page.offset,
        "Listed rides"
    );

    Ok(Json(Page::new(count, page, attach_events(rides, events))))
}

/// Creates a ride
///
/// # Errors
///
/// - `400 Bad Request`: Missing field, bad coordinate, or unknown rider/driver
pub async fn create_ride(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RideRequest>,
) -> ApiResult<(StatusCode, Json<RideWriteResponse>)> {
    check_parties(&state.db, Some(req.id_rider), Some(req.id_driver)).await?;

    let ride = Ride::create(&state.db, req.into()).await?;

    tracing::info!(
        id_ride = ride.id_ride,
        status = ride.status.as_str(),
        "Ride created"
    );

    let (ride, events) = load_ride(&state, ride.id_ride).await?;

    Ok((StatusCode::CREATED, Json(RideWriteResponse::new(ride, events))))
}

/// Retrieves a ride in detail shape
pub async fn get_ride(
    State(state): State<AppState>,
    ResourceId(id_ride): ResourceId,
) -> ApiResult<Json<RideDetail>> {
    let (ride, events) = load_ride(&state, id_ride).await?;

    Ok(Json(RideDetail::new(ride, events)))
}

/// Replaces every field of a ride
pub async fn replace_ride(
    State(state): State<AppState>,
    ResourceId(id_ride): ResourceId,
    ValidatedJson(req): ValidatedJson<RideRequest>,
) -> ApiResult<Json<RideWriteResponse>> {
    apply_update(&state, id_ride, req.into()).await
}

/// Updates the given fields of a ride
pub async fn patch_ride(
    State(state): State<AppState>,
    ResourceId(id_ride): ResourceId,
    ValidatedJson(req): ValidatedJson<PatchRideRequest>,
) -> ApiResult<Json<RideWriteResponse>> {
    apply_update(&state, id_ride, req).await
}

async fn apply_update(
    state: &AppState,
    id_ride: i64,
    req: PatchRideRequest,
) -> ApiResult<Json<RideWriteResponse>> {
    check_parties(&state.db, req.id_rider, req.id_driver).await?;

    Ride::update(&state.db, id_ride, req.into())
        .await?
        .ok_or_else(|| not_found(id_ride))?;

    tracing::info!(id_ride, "Ride updated");

    let (ride, events) = load_ride(state, id_ride).await?;

    Ok(Json(RideWriteResponse::new(ride, events)))
}

/// Deletes a ride; its events go with it
pub async fn delete_ride(
    State(state): State<AppState>,
    ResourceId(id_ride): ResourceId,
) -> ApiResult<StatusCode> {
    if !Ride::delete(&state.db, id_ride).await? {
        return Err(not_found(id_ride));
    }

    tracing::info!(id_ride, "Ride deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rideshare_shared::models::user::UserRole;

    fn summary(id_user: i64, role: UserRole) -> UserSummary {
        UserSummary {
            id_user,
            username: format!("user{}", id_user),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            role,
        }
    }

    fn ride(id_ride: i64, distance_km: Option<f64>) -> RideWithParties {
        RideWithParties {
            ride: Ride {
                id_ride,
                status: RideStatus::Pickup,
                id_rider: 1,
                id_driver: 2,
                pickup_latitude: 40.7128,
                pickup_longitude: -74.0060,
                dropoff_latitude: 40.7580,
                dropoff_longitude: -73.9855,
                pickup_time: Utc::now(),
            },
            rider: summary(1, UserRole::Passenger),
            driver: summary(2, UserRole::Driver),
            distance_km,
        }
    }

    fn event(id_ride_event: i64, id_ride: i64) -> RideEvent {
        RideEvent {
            id_ride_event,
            id_ride,
            description: "Status changed to pickup".to_string(),
            created_at: Utc::now(),
        }
    }

    fn keys(value: &serde_json::Value) -> Vec<String> {
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_list_shape() {
        let json = serde_json::to_value(RideListItem::new(ride(1, None), vec![])).unwrap();
        assert_eq!(
            keys(&json),
            vec!["driver", "events", "id_driver", "id_ride", "id_rider", "pickup_time", "rider", "status"]
        );
        assert_eq!(json["status"], "pickup");
        assert_eq!(keys(&json["rider"]), vec!["first_name", "id_user", "last_name", "role", "username"]);
    }

    #[test]
    fn test_list_shape_with_distance() {
        let json = serde_json::to_value(RideListItem::new(ride(1, Some(5.3)), vec![])).unwrap();
        assert_eq!(json["distance_km"], 5.3);
    }

    #[test]
    fn test_detail_and_write_shapes() {
        let detail = serde_json::to_value(RideDetail::new(ride(1, None), vec![event(1, 1)])).unwrap();
        assert_eq!(
            keys(&detail),
            vec![
                "driver",
                "dropoff_latitude",
                "dropoff_longitude",
                "events",
                "id_ride",
                "pickup_latitude",
                "pickup_longitude",
                "pickup_time",
                "rider",
                "status"
            ]
        );
        assert_eq!(detail["events"][0]["id_ride_event"], 1);

        let write = serde_json::to_value(RideWriteResponse::new(ride(1, None), vec![])).unwrap();
        let write_keys = keys(&write);
        assert_eq!(write_keys.len(), 12);
        assert!(write_keys.contains(&"id_rider".to_string()));
        assert!(write_keys.contains(&"id_driver".to_string()));
    }

    #[test]
    fn test_attach_events_keeps_page_order() {
        let mut events = HashMap::new();
        events.insert(2, vec![event(10, 2), event(9, 2)]);

        let items = attach_events(vec![ride(3, None), ride(2, None), ride(1, None)], events);

        let ids: Vec<i64> = items.iter().map(|item| item.id_ride).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert!(items[0].events.is_empty());
        assert_eq!(items[1].events.len(), 2);
    }

    #[test]
    fn test_request_coordinate_validation() {
        let req: RideRequest = serde_json::from_value(serde_json::json!({
            "status": "en-route",
            "id_rider": 1,
            "id_driver": 2,
            "pickup_latitude": 91.0,
            "pickup_longitude": -74.0,
            "dropoff_latitude": 40.0,
            "dropoff_longitude": 181.0,
            "pickup_time": "2025-01-01T12:00:00Z"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("pickup_latitude"));
        assert!(fields.contains_key("dropoff_longitude"));
    }

    #[test]
    fn test_request_rejects_unknown_status_and_missing_fields() {
        let unknown = serde_json::from_value::<RideRequest>(serde_json::json!({
            "status": "cancelled",
            "id_rider": 1,
            "id_driver": 2,
            "pickup_latitude": 0.0,
            "pickup_longitude": 0.0,
            "dropoff_latitude": 0.0,
            "dropoff_longitude": 0.0,
            "pickup_time": "2025-01-01T12:00:00Z"
        }));
        assert!(unknown.is_err());

        let missing = serde_json::from_value::<RideRequest>(serde_json::json!({
            "status": "pickup",
            "id_rider": 1
        }));
        assert!(missing.is_err());
    }

    #[test]
    fn test_patch_validates_present_fields_only() {
        let patch: PatchRideRequest =
            serde_json::from_value(serde_json::json!({ "status": "dropoff" })).unwrap();
        assert!(patch.validate().is_ok());

        let update = UpdateRide::from(patch);
        assert_eq!(update.status, Some(RideStatus::Dropoff));
        assert!(update.pickup_latitude.is_none());

        let bad = PatchRideRequest {
            pickup_longitude: Some(-200.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
