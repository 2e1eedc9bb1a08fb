//! The one parse → aggregate → group composition every caller goes through.

use crate::aggregation::daily::group_by_day;
use crate::aggregation::direction::DirectionMean;
use crate::aggregation::hourly::aggregate_hourly;
use crate::feed::parser::{parse_feed_with_stats, FeedFormat};
use crate::types::day_data::DayData;
use crate::types::wind_data_point::WindDataPoint;
use chrono_tz::Tz;
use log::debug;

/// Settings for turning feed text into series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Zone whose civil time defines hours and dates.
    pub timezone: Tz,
    pub direction_mean: DirectionMean,
    pub format: FeedFormat,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Los_Angeles,
            direction_mean: DirectionMean::default(),
            format: FeedFormat::default(),
        }
    }
}

/// Raw feed text to hourly points, oldest first.
pub fn hourly_series(raw: &str, options: &PipelineOptions) -> Vec<WindDataPoint> {
    let (measurements, stats) = parse_feed_with_stats(raw, options.format);
    let points = aggregate_hourly(&measurements, options.timezone, options.direction_mean);
    debug!(
        "Aggregated {} measurements ({} data lines) into {} hourly points",
        stats.kept,
        stats.data_lines,
        points.len()
    );
    points
}

/// Raw feed text to day groups, newest day first.
pub fn day_series(raw: &str, options: &PipelineOptions) -> Vec<DayData> {
    group_by_day(&hourly_series(raw, options), options.direction_mean)
}
