//! Input-error taxonomy for the core algorithms.
//!
//! Only malformed caller data is an error here. "No candidate found" and
//! similar empty outcomes are modeled as `Option`/empty results, not errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("task {id}: estimated duration {minutes}min is below the {floor}min floor")]
    DurationTooShort { id: String, minutes: i64, floor: i64 },

    #[error("task {id}: invalid status transition {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("task {id}: completed tasks keep their assignee; cannot reassign")]
    ReassignCompleted { id: String },

    #[error("task {id} belongs to department {actual}, expected {expected}")]
    WrongDepartment {
        id: String,
        actual: String,
        expected: String,
    },

    #[error("schedule {id}: interval must be >= 1")]
    ZeroInterval { id: String },

    #[error("schedule {id}: custom frequency requires a non-empty pattern")]
    MissingCustomPattern { id: String },

    #[error("schedule {id}: invalid timezone '{timezone}'")]
    InvalidTimezone { id: String, timezone: String },

    #[error("schedule {id}: local time {local} does not exist in {timezone} (DST gap)")]
    UnresolvableLocalTime {
        id: String,
        local: String,
        timezone: String,
    },

    #[error("invalid time of day '{value}' (expected HH:MM)")]
    InvalidTimeOfDay { value: String },
}
