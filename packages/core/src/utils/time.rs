// Работа со временем

use chrono::{DateTime, Duration, Utc};

/// Current wall-clock time in UTC.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Signed gap `later - earlier` in milliseconds.
pub fn gap_ms(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    later.signed_duration_since(earlier).num_milliseconds()
}

/// `true` if `at` lies no more than `hours` before `now`.
pub fn within_hours(at: DateTime<Utc>, now: DateTime<Utc>, hours: f64) -> bool {
    let window_ms = (hours * 3_600_000.0) as i64;
    now.signed_duration_since(at) <= Duration::milliseconds(window_ms)
}
