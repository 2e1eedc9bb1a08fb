use crate::types::compass::CompassPoint;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One hour of wind observations, summarized in the station's local time.
///
/// `wind_speed_kt` is the mean of every sample that fell into the hour while
/// `gust_speed_kt` is the maximum gust seen in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindDataPoint {
    /// Start of the local hour, carrying the UTC offset in force at that moment.
    pub timestamp: DateTime<FixedOffset>,
    /// Local calendar date the hour belongs to.
    pub date: NaiveDate,
    /// Local hour of day, 0 to 23.
    pub hour: u32,
    pub wind_speed_kt: f64,
    pub gust_speed_kt: f64,
    /// Averaged direction in whole degrees, 0 to 359.
    pub direction: i32,
    pub direction_label: CompassPoint,
    /// Mean pressure in hPa over samples that reported it, `0.0` if none did.
    pub pressure: f64,
    pub air_temperature: f64,
    pub water_temperature: f64,
    /// Number of feed samples that contributed.
    pub sample_count: usize,
}
