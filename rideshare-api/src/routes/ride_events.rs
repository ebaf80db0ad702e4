//! Ride event endpoints (admin only)
//!
//! - `GET    /api/ride-events/`            - Events from the last window (24h by default)
//! - `GET    /api/ride-events/?all=true`   - Every event
//! - `GET    /api/ride-events/?id_ride=N`  - Every event of ride N
//! - `POST   /api/ride-events/`            - Create an event
//! - `GET    /api/ride-events/:id/`        - Retrieve an event
//! - `PUT    /api/ride-events/:id/`        - Replace an event
//! - `PATCH  /api/ride-events/:id/`        - Partially update an event
//! - `DELETE /api/ride-events/:id/`        - Delete an event
//!
//! Lists are newest first. Addressing a single event by ID ignores the window.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ResourceId, ValidatedJson},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use rideshare_shared::{
    models::{
        ride::Ride,
        ride_event::{CreateRideEvent, RideEvent, UpdateRideEvent},
    },
    validation::FieldError,
};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

/// Raw list query parameters
#[derive(Debug, Default, Deserialize)]
pub struct RideEventListParams {
    pub all: Option<String>,
    pub id_ride: Option<String>,
}

/// Which events a list request reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Events inside the recent window
    Recent,

    /// Every event
    All,

    /// Every event of one ride
    Ride(i64),
}

impl RideEventListParams {
    /// Resolves the scope; `id_ride` takes precedence over `all`
    pub fn scope(&self) -> Result<EventScope, Vec<FieldError>> {
        if let Some(raw) = self.id_ride.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            return raw
                .parse::<i64>()
                .map(EventScope::Ride)
                .map_err(|_| vec![FieldError::new("id_ride", "A valid integer is required")]);
        }

        let all = self
            .all
            .as_deref()
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        Ok(if all { EventScope::All } else { EventScope::Recent })
    }
}

/// Create and full update body
#[derive(Debug, Deserialize, Validate)]
pub struct RideEventRequest {
    pub id_ride: i64,

    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters"))]
    pub description: String,
}

/// Partial update body
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchRideEventRequest {
    pub id_ride: Option<i64>,

    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters"))]
    pub description: Option<String>,
}

impl From<RideEventRequest> for PatchRideEventRequest {
    fn from(req: RideEventRequest) -> Self {
        Self {
            id_ride: Some(req.id_ride),
            description: Some(req.description),
        }
    }
}

async fn check_ride(db: &PgPool, id_ride: i64) -> ApiResult<()> {
    if !Ride::exists(db, id_ride).await? {
        return Err(ApiError::field(
            "id_ride",
            format!("Invalid pk \"{}\" - object does not exist.", id_ride),
        ));
    }
    Ok(())
}

fn not_found(id_ride_event: i64) -> ApiError {
    ApiError::NotFound(format!("Ride event {} not found", id_ride_event))
}

/// Lists events, newest first
pub async fn list_ride_events(
    State(state): State<AppState>,
    Query(params): Query<RideEventListParams>,
) -> ApiResult<Json<Vec<RideEvent>>> {
    let scope = params.scope()?;

    let events = match scope {
        EventScope::Recent => RideEvent::list_recent(&state.db, state.event_window()).await?,
        EventScope::All => RideEvent::list_all(&state.db).await?,
        EventScope::Ride(id_ride) => RideEvent::list_for_ride(&state.db, id_ride).await?,
    };

    tracing::debug!(?scope, returned = events.len(), "Listed ride events");

    Ok(Json(events))
}

/// Creates an event
///
/// # Errors
///
/// - `400 Bad Request`: Unknown ride or description outside 1..255 characters
pub async fn create_ride_event(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RideEventRequest>,
) -> ApiResult<(StatusCode, Json<RideEvent>)> {
    check_ride(&state.db, req.id_ride).await?;

    let event = RideEvent::create(
        &state.db,
        CreateRideEvent {
            id_ride: req.id_ride,
            description: req.description,
        },
    )
    .await?;

    tracing::info!(
        id_ride_event = event.id_ride_event,
        id_ride = event.id_ride,
        "Ride event created"
    );

    Ok((StatusCode::CREATED, Json(event)))
}

/// Retrieves an event regardless of its age
pub async fn get_ride_event(
    State(state): State<AppState>,
    ResourceId(id_ride_event): ResourceId,
) -> ApiResult<Json<RideEvent>> {
    let event = RideEvent::find_by_id(&state.db, id_ride_event)
        .await?
        .ok_or_else(|| not_found(id_ride_event))?;

    Ok(Json(event))
}

/// Replaces an event
pub async fn replace_ride_event(
    State(state): State<AppState>,
    ResourceId(id_ride_event): ResourceId,
    ValidatedJson(req): ValidatedJson<RideEventRequest>,
) -> ApiResult<Json<RideEvent>> {
    apply_update(&state, id_ride_event, req.into()).await
}

/// Updates the given fields of an event
pub async fn patch_ride_event(
    State(state): State<AppState>,
    ResourceId(id_ride_event): ResourceId,
    ValidatedJson(req): ValidatedJson<PatchRideEventRequest>,
) -> ApiResult<Json<RideEvent>> {
    apply_update(&state, id_ride_event, req).await
}

async fn apply_update(
    state: &AppState,
    id_ride_event: i64,
    req: PatchRideEventRequest,
) -> ApiResult<Json<RideEvent>> {
    if let Some(id_ride) = req.id_ride {
        check_ride(&state.db, id_ride).await?;
    }

    let event = RideEvent::update(
        &state.db,
        id_ride_event,
        UpdateRideEvent {
            id_ride: req.id_ride,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| not_found(id_ride_event))?;

    tracing::info!(id_ride_event, "Ride event updated");

    Ok(Json(event))
}

/// Deletes an event
pub async fn delete_ride_event(
    State(state): State<AppState>,
    ResourceId(id_ride_event): ResourceId,
) -> ApiResult<StatusCode> {
    if !RideEvent::delete(&state.db, id_ride_event).await? {
        return Err(not_found(id_ride_event));
    }

    tracing::info!(id_ride_event, "Ride event deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(all: Option<&str>, id_ride: Option<&str>) -> RideEventListParams {
        RideEventListParams {
            all: all.map(String::from),
            id_ride: id_ride.map(String::from),
        }
    }

    #[test]
    fn test_scope_defaults_to_recent() {
        assert_eq!(params(None, None).scope().unwrap(), EventScope::Recent);
        assert_eq!(params(Some("false"), None).scope().unwrap(), EventScope::Recent);
        assert_eq!(params(Some(""), Some("")).scope().unwrap(), EventScope::Recent);
    }

    #[test]
    fn test_scope_all() {
        for value in ["true", "True", "1", "yes"] {
            assert_eq!(params(Some(value), None).scope().unwrap(), EventScope::All);
        }
    }

    #[test]
    fn test_scope_ride_wins_over_all() {
        assert_eq!(params(Some("true"), Some("7")).scope().unwrap(), EventScope::Ride(7));
    }

    #[test]
    fn test_scope_rejects_bad_ride_id() {
        let errors = params(None, Some("seven")).scope().unwrap_err();
        assert_eq!(errors[0].field, "id_ride");
    }

    #[test]
    fn test_description_length() {
        let too_long = RideEventRequest {
            id_ride: 1,
            description: "x".repeat(256),
        };
        assert!(too_long.validate().is_err());

        let empty = PatchRideEventRequest {
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let fine = RideEventRequest {
            id_ride: 1,
            description: "x".repeat(255),
        };
        assert!(fine.validate().is_ok());
    }
}
