//! Time-bucketed cache keys.
//!
//! A key embeds the current local hour (or minute), so a new bucket starts a new key and
//! stale entries simply stop being asked for. Nothing has to invalidate them.

use chrono::DateTime;
use chrono_tz::Tz;

/// Granularity of the time component of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeBucket {
    #[default]
    Hour,
    Minute,
}

impl TimeBucket {
    /// Formats `now` at this bucket's granularity, e.g. `2024-03-10T14` for `Hour`.
    pub fn label(&self, now: &DateTime<Tz>) -> String {
        match self {
            TimeBucket::Hour => now.format("%Y-%m-%dT%H").to_string(),
            TimeBucket::Minute => now.format("%Y-%m-%dT%H:%M").to_string(),
        }
    }
}

/// Prefix of keys holding the hourly series.
pub const HOURLY_PREFIX: &str = "wind-hourly";
/// Prefix of keys holding the day series.
pub const DAYS_PREFIX: &str = "wind-days";
/// Prefix of keys holding the last generated forecast.
pub const FORECAST_PREFIX: &str = "forecast";

/// Builds `prefix:station:bucket`.
///
/// # Examples
///
/// ```
/// use buoy_wind::{cache_key, TimeBucket};
/// use chrono::TimeZone;
/// use chrono_tz::America::Los_Angeles;
///
/// let now = Los_Angeles.with_ymd_and_hms(2024, 3, 10, 14, 25, 0).unwrap();
/// assert_eq!(cache_key("wind-days", "46025", TimeBucket::Hour, &now), "wind-days:46025:2024-03-10T14");
/// ```
pub fn cache_key(prefix: &str, station: &str, bucket: TimeBucket, now: &DateTime<Tz>) -> String {
    format!("{prefix}:{station}:{}", bucket.label(now))
}
