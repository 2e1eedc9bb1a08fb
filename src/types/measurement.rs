//! Defines `RawMeasurement`, a single validated buoy sample as read from the feed.

use chrono::NaiveDateTime;

/// One buoy sample.
///
/// Only lines that carried both a wind direction and a sustained wind speed become a
/// `RawMeasurement`, so those two fields are never optional here. Every other field
/// falls back to `0.0` when the feed reported it as missing.
///
/// Speeds are in metres per second, exactly as reported by the buoy; conversion to knots
/// happens during hourly aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMeasurement {
    /// Observation time in the feed's native clock (UTC for NDBC).
    pub observed_at: NaiveDateTime,
    /// Wind direction in degrees true, 0 to 360.
    pub direction: f64,
    /// Sustained wind speed in m/s.
    pub wind_speed: f64,
    /// Peak gust in m/s, `0.0` when missing.
    pub gust_speed: f64,
    /// Sea level pressure in hPa, `0.0` when missing.
    pub pressure: f64,
    /// Air temperature in degrees Celsius, `0.0` when missing.
    pub air_temperature: f64,
    /// Sea surface temperature in degrees Celsius, `0.0` when missing.
    pub water_temperature: f64,
}
