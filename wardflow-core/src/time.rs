//! Time utilities: HH:MM parsing and timezone-aware instants.

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::InputError;

/// Parse a time-of-day like "09:00".
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, InputError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| InputError::InvalidTimeOfDay {
        value: value.to_string(),
    })
}

/// Resolve an optional IANA zone name, defaulting to UTC.
pub fn resolve_zone(id: &str, timezone: Option<&str>) -> Result<Tz, InputError> {
    match timezone {
        None => Ok(chrono_tz::UTC),
        Some(name) => name.parse().map_err(|_| InputError::InvalidTimezone {
            id: id.to_string(),
            timezone: name.to_string(),
        }),
    }
}

/// Map a local wall-clock time into UTC. DST fold picks the earlier
/// instant; a DST gap retries one hour later before giving up.
pub fn local_to_utc(id: &str, tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, InputError> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return Ok(dt.with_timezone(&Utc));
    }
    let shifted = local + chrono::Duration::hours(1);
    tz.from_local_datetime(&shifted)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| InputError::UnresolvableLocalTime {
            id: id.to_string(),
            local: local.to_string(),
            timezone: tz.name().to_string(),
        })
}
