//! Great-circle distance on a spherical Earth
//!
//! Distances are in kilometres using the mean Earth radius. The formula is the
//! spherical law of cosines:
//!
//! ```text
//! d = R * acos(cos(lat1) * cos(lat2) * cos(lng2 - lng1) + sin(lat1) * sin(lat2))
//! ```
//!
//! The `acos` argument is clamped to `[-1, 1]`; rounding can push it slightly
//! outside that range for identical or antipodal points.
//!
//! The same expression is rendered into SQL by [`crate::query`] so rides can
//! be ordered by distance inside the database. [`haversine_km`] is the Rust
//! reference for that expression.
//!
//! # Example
//!
//! ```
//! use rideshare_shared::geo::haversine_km;
//!
//! // New York City to Times Square
//! let d = haversine_km(40.7128, -74.0060, 40.7580, -73.9855);
//! assert!(d > 5.0 && d < 6.0);
//! ```

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Computes the great-circle distance in kilometres between two points given
/// in decimal degrees
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if lat1 == lat2 && lng1 == lng2 {
        return 0.0;
    }

    let (lat1, lng1, lat2, lng2) = (
        lat1.to_radians(),
        lng1.to_radians(),
        lat2.to_radians(),
        lng2.to_radians(),
    );

    let cosine = lat1.cos() * lat2.cos() * (lng2 - lng1).cos() + lat1.sin() * lat2.sin();

    EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
}
