//! Limit/offset pagination with a cached total count
//!
//! Responses use the envelope `{count, next, previous, results}` where `next`
//! and `previous` are offsets (or `null`). The total `count` comes from a
//! [`CountCache`] when possible; the database is only counted on a miss.
//!
//! ```
//! use rideshare_shared::pagination::PageRequest;
//!
//! let page = PageRequest::parse(Some("20"), Some("40")).unwrap();
//! assert_eq!(page.next_offset(100), Some(60));
//! assert_eq!(page.previous_offset(), Some(20));
//! assert_eq!(page.next_offset(55), None);
//! ```

use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::cache::CountCache;
use crate::validation::FieldError;

/// Page size when `limit` is absent or zero
pub const DEFAULT_LIMIT: i64 = 20;

/// Largest accepted page size; bigger requests are clamped
pub const MAX_LIMIT: i64 = 100;

/// A requested window over a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Parses raw `limit` and `offset` query values
    ///
    /// Absent or empty values take their defaults. A limit of zero means the
    /// default; limits above [`MAX_LIMIT`] are clamped. Negative or
    /// non-integer values are errors.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let limit = match parse_non_negative("limit", limit) {
            Ok(Some(0)) | Ok(None) => DEFAULT_LIMIT,
            Ok(Some(n)) => n.min(MAX_LIMIT),
            Err(e) => {
                errors.push(e);
                DEFAULT_LIMIT
            }
        };

        let offset = match parse_non_negative("offset", offset) {
            Ok(n) => n.unwrap_or(0),
            Err(e) => {
                errors.push(e);
                0
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self { limit, offset })
    }

    /// Offset of the following page, if any rows remain
    pub fn next_offset(&self, count: i64) -> Option<i64> {
        let next = self.offset.saturating_add(self.limit);
        (next < count).then_some(next)
    }

    /// Offset of the preceding page, if this isn't the first
    pub fn previous_offset(&self) -> Option<i64> {
        (self.offset > 0).then(|| (self.offset - self.limit).max(0))
    }
}

fn parse_non_negative(field: &str, raw: Option<&str>) -> Result<Option<i64>, FieldError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    match raw.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(Some(n)),
        _ => Err(FieldError::new(field, "Must be a non-negative integer")),
    }
}

/// Paginated response envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: i64, request: PageRequest, results: Vec<T>) -> Self {
        Self {
            count,
            next: request.next_offset(count),
            previous: request.previous_offset(),
            results,
        }
    }

    /// Converts the results, keeping the envelope
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Returns the count stored under `key`, computing and storing it on a miss
///
/// Cache failures are logged and treated as a miss; only `compute` can fail
/// the call.
pub async fn cached_count<F, Fut, E>(
    cache: &dyn CountCache,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<i64, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<i64, E>>,
{
    match cache.get(key).await {
        Ok(Some(count)) => {
            tracing::debug!(key, count, "Pagination count cache hit");
            return Ok(count);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(key, error = %e, backend = cache.backend(), "Count cache read failed");
        }
    }

    let count = compute().await?;

    if let Err(e) = cache.set(key, count, ttl).await {
        tracing::warn!(key, error = %e, backend = cache.backend(), "Count cache write failed");
    }

    Ok(count)
}
