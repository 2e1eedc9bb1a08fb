//! Defines `DayData` and `DaySummary`, the per-day view of the hourly series.

use crate::aggregation::daily::summarize_day;
use crate::aggregation::direction::DirectionMean;
use crate::types::compass::CompassPoint;
use crate::types::wind_data_point::WindDataPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Statistics over the hourly points of a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub avg_wind_speed_kt: f64,
    pub max_wind_speed_kt: f64,
    pub avg_gust_speed_kt: f64,
    pub max_gust_speed_kt: f64,
    /// Average of the hourly directions, whole degrees.
    pub avg_direction: i32,
    /// The most frequent hourly compass label. Ties go to the label seen first.
    pub primary_direction: Option<CompassPoint>,
    pub avg_air_temperature: f64,
    pub avg_water_temperature: f64,
    pub avg_pressure: f64,
    pub point_count: usize,
}

/// All hourly points observed on one local calendar day.
///
/// `points` is sorted by hour. Hours without observations are absent, nothing is
/// padded or interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayData {
    pub date: NaiveDate,
    pub points: Vec<WindDataPoint>,
    pub summary: DaySummary,
}

impl DayData {
    /// Returns `true` if an observation exists for the given local hour.
    pub fn has_hour(&self, hour: u32) -> bool {
        self.points.iter().any(|p| p.hour == hour)
    }

    /// A copy of this day restricted to `hours`, with the summary recomputed using the
    /// circular direction mean.
    pub fn within_hours(&self, hours: RangeInclusive<u32>) -> DayData {
        self.within_hours_with(hours, DirectionMean::default())
    }

    /// Same as [`DayData::within_hours`] with an explicit direction reduction.
    pub fn within_hours_with(&self, hours: RangeInclusive<u32>, direction_mean: DirectionMean) -> DayData {
        let points: Vec<_> = self
            .points
            .iter()
            .filter(|p| hours.contains(&p.hour))
            .cloned()
            .collect();
        let summary = summarize_day(&points, direction_mean);
        DayData {
            date: self.date,
            points,
            summary,
        }
    }
}
