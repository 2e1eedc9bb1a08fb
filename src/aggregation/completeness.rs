//! Finds days whose observation window is fully covered.

use crate::types::day_data::DayData;
use chrono::NaiveDate;
use std::ops::RangeInclusive;

/// Local hours considered daytime for sailing conditions.
pub const DAYTIME_HOURS: RangeInclusive<u32> = 10..=18;

/// Dates, oldest first, on which every hour of `hours` has an observation.
pub fn complete_days(days: &[DayData], hours: RangeInclusive<u32>) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = days
        .iter()
        .filter(|day| hours.clone().all(|hour| day.has_hour(hour)))
        .map(|day| day.date)
        .collect();
    dates.sort();
    dates
}
