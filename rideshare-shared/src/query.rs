//! Ride list filtering and ordering
//!
//! [`RideListParams`] holds the raw query string values of `GET /api/rides/`.
//! Parsing it yields a [`RideQuery`] (filters and ordering) and a
//! [`PageRequest`]. The query renders itself into SQL through
//! `sqlx::QueryBuilder`, with every user value bound as a parameter.
//!
//! Supported parameters:
//!
//! | Parameter         | Meaning                                           |
//! |-------------------|---------------------------------------------------|
//! | `status`          | exact status match                                |
//! | `id_rider__email` | exact match on the rider's email                  |
//! | `ordering`        | `pickup_time`, `-pickup_time`, `distance`, `-distance` |
//! | `lat`, `lng`      | reference point, required for distance ordering   |
//! | `limit`, `offset` | page window                                       |
//!
//! Unknown `ordering` values fall back to `-pickup_time`. Every ordering ends
//! with `id_ride ASC` so pages are stable.

use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::{Postgres, QueryBuilder};

use crate::geo::EARTH_RADIUS_KM;
use crate::models::ride::RideStatus;
use crate::pagination::PageRequest;
use crate::validation::{check_latitude, check_longitude, FieldError};

/// Prefix of every pagination count cache key
pub const COUNT_KEY_PREFIX: &str = "pagination_count:";

/// Point that distances are measured from, in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub lat: f64,
    pub lng: f64,
}

/// Ride filters; `None` means unfiltered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideFilter {
    pub status: Option<RideStatus>,
    pub rider_email: Option<String>,
}

/// Ride list ordering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RideOrdering {
    PickupTimeAsc,
    PickupTimeDesc,
    DistanceAsc(ReferencePoint),
    DistanceDesc(ReferencePoint),
}

impl Default for RideOrdering {
    fn default() -> Self {
        RideOrdering::PickupTimeDesc
    }
}

impl RideOrdering {
    /// Reference point when ordering by distance
    pub fn reference_point(&self) -> Option<ReferencePoint> {
        match self {
            RideOrdering::DistanceAsc(point) | RideOrdering::DistanceDesc(point) => Some(*point),
            _ => None,
        }
    }

    fn as_param(&self) -> &'static str {
        match self {
            RideOrdering::PickupTimeAsc => "pickup_time",
            RideOrdering::PickupTimeDesc => "-pickup_time",
            RideOrdering::DistanceAsc(_) => "distance",
            RideOrdering::DistanceDesc(_) => "-distance",
        }
    }
}

/// Resolved ride list query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideQuery {
    pub filter: RideFilter,
    pub ordering: RideOrdering,
}

impl RideQuery {
    /// Canonical string of the filters, ordering and reference point
    ///
    /// Two queries selecting the same rows in the same order produce the same
    /// string. Page bounds are not included.
    pub fn canonical(&self) -> String {
        let point = self.ordering.reference_point();

        json!({
            "resource": "rides",
            "status": self.filter.status.map(|s| s.as_str()),
            "id_rider__email": self.filter.rider_email,
            "ordering": self.ordering.as_param(),
            "lat": point.map(|p| p.lat),
            "lng": point.map(|p| p.lng),
        })
        .to_string()
    }

    /// Cache key for this query's total count
    pub fn count_cache_key(&self) -> String {
        let digest = Sha256::digest(self.canonical().as_bytes());
        format!("{}{}", COUNT_KEY_PREFIX, hex::encode(digest))
    }

    /// Pushes the `distance_km` select column
    ///
    /// Renders `NULL::float8` when not ordering by distance.
    pub fn push_distance_column(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self.ordering.reference_point() {
            Some(point) => push_distance_expr(builder, point),
            None => {
                builder.push("NULL::float8");
            }
        }
        builder.push(" AS distance_km");
    }

    /// Pushes the `WHERE` clause, if any filter is set
    ///
    /// Expects the ride table aliased `r` and the rider join aliased `rider`.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut keyword = " WHERE ";

        if let Some(status) = self.filter.status {
            builder.push(keyword).push("r.status = ").push_bind(status);
            keyword = " AND ";
        }

        if let Some(email) = &self.filter.rider_email {
            builder
                .push(keyword)
                .push("rider.email = ")
                .push_bind(email.clone());
        }
    }

    /// Pushes the `ORDER BY` clause
    pub fn push_order_by(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let primary = match self.ordering {
            RideOrdering::PickupTimeAsc => "r.pickup_time ASC",
            RideOrdering::PickupTimeDesc => "r.pickup_time DESC",
            RideOrdering::DistanceAsc(_) => "distance_km ASC",
            RideOrdering::DistanceDesc(_) => "distance_km DESC",
        };

        builder.push(" ORDER BY ").push(primary).push(", r.id_ride ASC");
    }
}

/// Great-circle distance from `point` to the ride's pickup, in km
fn push_distance_expr(builder: &mut QueryBuilder<'_, Postgres>, point: ReferencePoint) {
    builder.push(format!(
        "({:.1} * acos(LEAST(1.0, GREATEST(-1.0, cos(radians(",
        EARTH_RADIUS_KM
    ));
    builder.push_bind(point.lat);
    builder.push("::float8)) * cos(radians(r.pickup_latitude)) * cos(radians(r.pickup_longitude) - radians(");
    builder.push_bind(point.lng);
    builder.push("::float8)) + sin(radians(");
    builder.push_bind(point.lat);
    builder.push("::float8)) * sin(radians(r.pickup_latitude))))))");
}

/// Raw query parameters of the ride list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideListParams {
    pub status: Option<String>,

    #[serde(rename = "id_rider__email")]
    pub rider_email: Option<String>,

    pub ordering: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl RideListParams {
    /// Resolves the parameters, collecting every invalid field
    pub fn parse(&self) -> Result<(RideQuery, PageRequest), Vec<FieldError>> {
        let mut errors = Vec::new();

        let status = match non_empty(&self.status) {
            None => None,
            Some(raw) => match RideStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    errors.push(FieldError::new(
                        "status",
                        format!("Select a valid choice. {} is not one of the available choices.", raw),
                    ));
                    None
                }
            },
        };

        let rider_email = non_empty(&self.rider_email).map(str::to_owned);

        let ordering = match non_empty(&self.ordering) {
            Some("pickup_time") => RideOrdering::PickupTimeAsc,
            Some("distance") => self
                .reference_point(&mut errors)
                .map(RideOrdering::DistanceAsc)
                .unwrap_or_default(),
            Some("-distance") => self
                .reference_point(&mut errors)
                .map(RideOrdering::DistanceDesc)
                .unwrap_or_default(),
            _ => RideOrdering::PickupTimeDesc,
        };

        let page = match PageRequest::parse(self.limit.as_deref(), self.offset.as_deref()) {
            Ok(page) => page,
            Err(page_errors) => {
                errors.extend(page_errors);
                PageRequest::default()
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok((
            RideQuery {
                filter: RideFilter {
                    status,
                    rider_email,
                },
                ordering,
            },
            page,
        ))
    }

    fn reference_point(&self, errors: &mut Vec<FieldError>) -> Option<ReferencePoint> {
        let lat = parse_coordinate("lat", non_empty(&self.lat), check_latitude);
        let lng = parse_coordinate("lng", non_empty(&self.lng), check_longitude);

        match (lat, lng) {
            (Ok(lat), Ok(lng)) => Some(ReferencePoint { lat, lng }),
            (lat, lng) => {
                errors.extend(lat.err());
                errors.extend(lng.err());
                None
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_coordinate(
    field: &str,
    raw: Option<&str>,
    check: fn(&str, f64) -> Result<(), FieldError>,
) -> Result<f64, FieldError> {
    let raw = raw.ok_or_else(|| {
        FieldError::new(field, "This parameter is required when ordering by distance")
    })?;

    let value = raw
        .parse::<f64>()
        .map_err(|_| FieldError::new(field, "A valid number is required"))?;

    check(field, value)?;
    Ok(value)
}
