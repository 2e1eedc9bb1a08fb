use crate::aggregation::direction::DirectionMean;
use crate::aggregation::{mean_of_reported, round1};
use crate::types::compass::CompassPoint;
use crate::types::day_data::{DayData, DaySummary};
use crate::types::wind_data_point::WindDataPoint;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Groups hourly points by local date.
///
/// Points within a day are sorted by hour; the days themselves are returned newest
/// first, whatever order the points came in. Consumers rely on that ordering.
pub fn group_by_day(points: &[WindDataPoint], direction_mean: DirectionMean) -> Vec<DayData> {
    let mut days: BTreeMap<NaiveDate, Vec<WindDataPoint>> = BTreeMap::new();
    for point in points {
        days.entry(point.date).or_default().push(point.clone());
    }

    days.into_iter()
        .rev()
        .map(|(date, mut day_points)| {
            day_points.sort_by_key(|p| p.hour);
            let summary = summarize_day(&day_points, direction_mean);
            DayData {
                date,
                points: day_points,
                summary,
            }
        })
        .collect()
}

/// Builds the summary statistics for one day's points (already in hour order).
pub(crate) fn summarize_day(points: &[WindDataPoint], direction_mean: DirectionMean) -> DaySummary {
    let count = points.len();
    let mean = |values: &[f64]| -> f64 {
        if values.is_empty() {
            0.0
        } else {
            round1(values.iter().sum::<f64>() / values.len() as f64)
        }
    };
    let max = |values: &[f64]| -> f64 { values.iter().copied().fold(0.0_f64, f64::max) };
    let speeds: Vec<f64> = points.iter().map(|p| p.wind_speed_kt).collect();
    let gusts: Vec<f64> = points.iter().map(|p| p.gust_speed_kt).collect();

    let directions: Vec<f64> = points.iter().map(|p| f64::from(p.direction)).collect();
    let avg_direction = direction_mean
        .average(&directions)
        .or_else(|| DirectionMean::Arithmetic.average(&directions))
        .unwrap_or(0);

    DaySummary {
        avg_wind_speed_kt: mean(&speeds),
        max_wind_speed_kt: max(&speeds),
        avg_gust_speed_kt: mean(&gusts),
        max_gust_speed_kt: max(&gusts),
        avg_direction,
        primary_direction: most_frequent_label(points),
        avg_air_temperature: round1(mean_of_reported(points.iter().map(|p| p.air_temperature))),
        avg_water_temperature: round1(mean_of_reported(
            points.iter().map(|p| p.water_temperature),
        )),
        avg_pressure: round1(mean_of_reported(points.iter().map(|p| p.pressure))),
        point_count: count,
    }
}

/// Most frequent compass label; on a tie the label encountered first wins.
fn most_frequent_label(points: &[WindDataPoint]) -> Option<CompassPoint> {
    let mut counts: Vec<(CompassPoint, usize)> = Vec::new();
    for point in points {
        match counts.iter_mut().find(|(label, _)| *label == point.direction_label) {
            Some((_, n)) => *n += 1,
            None => counts.push((point.direction_label, 1)),
        }
    }

    let mut best: Option<(CompassPoint, usize)> = None;
    for (label, n) in counts {
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((label, n));
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    pub(crate) fn point(date: NaiveDate, hour: u32, speed: f64, gust: f64, direction: i32) -> WindDataPoint {
        let offset = FixedOffset::west_opt(7 * 3600).unwrap();
        WindDataPoint {
            timestamp: offset
                .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
                .unwrap(),
            date,
            hour,
            wind_speed_kt: speed,
            gust_speed_kt: gust,
            direction,
            direction_label: CompassPoint::from_degrees(f64::from(direction)),
            pressure: 1013.0,
            air_temperature: 15.0,
            water_temperature: 0.0,
            sample_count: 6,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_days_newest_first_and_hours_ascending() {
        let points = vec![
            point(date(2), 14, 10.0, 12.0, 270),
            point(date(1), 15, 8.0, 10.0, 270),
            point(date(3), 11, 5.0, 7.0, 270),
            point(date(2), 10, 6.0, 8.0, 270),
            point(date(1), 11, 4.0, 6.0, 270),
        ];
        let days = group_by_day(&points, DirectionMean::Circular);
        let dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(3), date(2), date(1)]);
        let hours: Vec<u32> = days[1].points.iter().map(|p| p.hour).collect();
        assert_eq!(hours, vec![10, 14]);
    }

    #[test]
    fn test_summary_statistics() {
        let points = vec![
            point(date(1), 10, 6.0, 9.0, 260),
            point(date(1), 11, 8.0, 13.0, 270),
            point(date(1), 12, 10.0, 11.0, 280),
        ];
        let days = group_by_day(&points, DirectionMean::Circular);
        let summary = &days[0].summary;
        assert_eq!(summary.avg_wind_speed_kt, 8.0);
        assert_eq!(summary.max_wind_speed_kt, 10.0);
        assert_eq!(summary.avg_gust_speed_kt, 11.0);
        assert_eq!(summary.max_gust_speed_kt, 13.0);
        assert_eq!(summary.avg_direction, 270);
        assert_eq!(summary.avg_pressure, 1013.0);
        assert_eq!(summary.avg_water_temperature, 0.0);
        assert_eq!(summary.point_count, 3);
    }

    #[test]
    fn test_primary_direction_tie_goes_to_first_seen() {
        let points = vec![
            point(date(1), 12, 5.0, 6.0, 180), // S
            point(date(1), 10, 5.0, 6.0, 270), // W, first after sorting
            point(date(1), 13, 5.0, 6.0, 180),
            point(date(1), 11, 5.0, 6.0, 270),
        ];
        let days = group_by_day(&points, DirectionMean::Circular);
        assert_eq!(days[0].summary.primary_direction, Some(CompassPoint::West));
    }

    #[test]
    fn test_primary_direction_majority() {
        let points = vec![
            point(date(1), 10, 5.0, 6.0, 270),
            point(date(1), 11, 5.0, 6.0, 180),
            point(date(1), 12, 5.0, 6.0, 180),
        ];
        let days = group_by_day(&points, DirectionMean::Circular);
        assert_eq!(days[0].summary.primary_direction, Some(CompassPoint::South));
    }

    #[test]
    fn test_missing_hours_are_not_padded() {
        let points = vec![point(date(1), 10, 5.0, 6.0, 270), point(date(1), 17, 5.0, 6.0, 270)];
        let days = group_by_day(&points, DirectionMean::Circular);
        assert_eq!(days[0].points.len(), 2);
        assert!(!days[0].has_hour(12));
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_day(&[], DirectionMean::Circular).is_empty());
    }
}
