//! Translation of the user-facing query surface into store predicates.

use chrono::{NaiveDate, NaiveTime};

/// A search request: free text plus optional shorthand filters and
/// inclusive calendar-date bounds.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free text and shorthand filters; empty means "match everything".
    pub query: String,
    /// Inclusive start date.
    pub since: Option<NaiveDate>,
    /// Inclusive end date.
    pub until: Option<NaiveDate>,
    /// Result cap.
    pub limit: i64,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            since: None,
            until: None,
            limit: 50,
        }
    }
}

/// Rewrite the shorthand filter tokens into the index's field-qualified
/// syntax. Everything else passes through verbatim; this layer does no
/// validation, so malformed match syntax surfaces as the engine's error.
pub fn translate(raw: &str) -> String {
    raw.replace("role:", "author_role:")
}

/// Unix seconds at midnight UTC of the given day.
pub fn day_start(date: NaiveDate) -> f64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp() as f64
}

/// Exclusive upper bound covering the whole of the given day, so `until`
/// is day-inclusive.
pub fn day_end(date: NaiveDate) -> f64 {
    day_start(date) + 86_400.0
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
