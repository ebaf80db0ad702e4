//! Field-level validation errors
//!
//! Query parameter parsing (ride filters, pagination) reports problems as a
//! list of `FieldError`s so the API layer can return all of them at once.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single validation failure tied to a request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field or query parameter
    pub field: String,

    /// Human-readable description of the problem
    pub message: String,
}

impl FieldError {
    /// Creates a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Checks a latitude in decimal degrees
pub fn check_latitude(field: &str, value: f64) -> Result<(), FieldError> {
    if !value.is_finite() || !(-90.0..=90.0).contains(&value) {
        return Err(FieldError::new(
            field,
            "Latitude must be a number between -90 and 90",
        ));
    }
    Ok(())
}

/// Checks a longitude in decimal degrees
pub fn check_longitude(field: &str, value: f64) -> Result<(), FieldError> {
    if !value.is_finite() || !(-180.0..=180.0).contains(&value) {
        return Err(FieldError::new(
            field,
            "Longitude must be a number between -180 and 180",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latitude_bounds() {
        assert!(check_latitude("lat", 0.0).is_ok());
        assert!(check_latitude("lat", -90.0).is_ok());
        assert!(check_latitude("lat", 90.0).is_ok());
        assert!(check_latitude("lat", 90.0001).is_err());
        assert!(check_latitude("lat", f64::NAN).is_err());
    }

    #[test]
    fn test_longitude_bounds() {
        assert!(check_longitude("lng", -180.0).is_ok());
        assert!(check_longitude("lng", 180.0).is_ok());
        assert!(check_longitude("lng", -180.5).is_err());
        assert!(check_longitude("lng", f64::INFINITY).is_err());
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError::new("lat", "required");
        assert_eq!(err.to_string(), "lat: required");
    }
}
