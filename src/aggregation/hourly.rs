//! Buckets raw measurements into local-time hours.
//!
//! Measurements carry UTC timestamps; each one is converted to the station's civil time
//! through its IANA zone, so daylight saving transitions move samples to the correct
//! local hour and date instead of applying a fixed offset.

use crate::aggregation::direction::DirectionMean;
use crate::aggregation::{mean_of_reported, round1};
use crate::types::compass::CompassPoint;
use crate::types::measurement::RawMeasurement;
use crate::types::wind_data_point::WindDataPoint;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Metres per second to knots.
pub const MS_TO_KNOTS: f64 = 1.94384;

struct HourBucket<'a> {
    first_local: DateTime<Tz>,
    members: Vec<&'a RawMeasurement>,
}

/// Aggregates measurements into one [`WindDataPoint`] per local (date, hour).
///
/// The output is ordered by local date then hour, and is identical for identical input
/// regardless of the order measurements arrive in within an hour.
///
/// Reductions per hour:
/// * sustained speed: mean, converted to knots
/// * gust: maximum, converted to knots
/// * direction: `direction_mean` of the samples
/// * pressure and temperatures: mean over samples that reported a non-zero value
///
/// # Examples
///
/// ```
/// use buoy_wind::{aggregate_hourly, parse_feed, DirectionMean};
///
/// let raw = "\
/// #YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
/// #yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
/// 2024 06 01 20 10 180  5.0  8.0   1.2     8   5.1 270 1013.0  16.0  17.0  12.3   MM   MM    MM
/// 2024 06 01 20 20 190  6.0  9.0   1.2     8   5.1 270 1013.0  16.0  17.0  12.3   MM   MM    MM
/// ";
/// let points = aggregate_hourly(&parse_feed(raw), chrono_tz::America::Los_Angeles, DirectionMean::Circular);
/// assert_eq!(points.len(), 1);
/// assert_eq!(points[0].hour, 13); // 20:10 UTC is 13:10 PDT
/// assert_eq!(points[0].wind_speed_kt, 10.7);
/// assert_eq!(points[0].gust_speed_kt, 17.5);
/// ```
pub fn aggregate_hourly(
    measurements: &[RawMeasurement],
    timezone: Tz,
    direction_mean: DirectionMean,
) -> Vec<WindDataPoint> {
    let mut buckets: BTreeMap<(NaiveDate, u32), HourBucket<'_>> = BTreeMap::new();

    for measurement in measurements {
        let local = Utc
            .from_utc_datetime(&measurement.observed_at)
            .with_timezone(&timezone);
        let key = (local.date_naive(), local.hour());
        let bucket = buckets.entry(key).or_insert_with(|| HourBucket {
            first_local: local,
            members: Vec::new(),
        });
        if local < bucket.first_local {
            bucket.first_local = local;
        }
        bucket.members.push(measurement);
    }

    buckets
        .into_iter()
        .map(|((date, hour), bucket)| summarize_hour(date, hour, bucket, direction_mean))
        .collect()
}

fn summarize_hour(
    date: NaiveDate,
    hour: u32,
    bucket: HourBucket<'_>,
    direction_mean: DirectionMean,
) -> WindDataPoint {
    let members = &bucket.members;
    let count = members.len();

    let mean_speed = members.iter().map(|m| m.wind_speed).sum::<f64>() / count as f64;
    let max_gust = members
        .iter()
        .map(|m| m.gust_speed)
        .fold(0.0_f64, f64::max);

    let directions: Vec<f64> = members.iter().map(|m| m.direction).collect();
    let direction = direction_mean
        .average(&directions)
        .or_else(|| DirectionMean::Arithmetic.average(&directions))
        .unwrap_or(0);

    WindDataPoint {
        timestamp: hour_start(bucket.first_local),
        date,
        hour,
        wind_speed_kt: round1(mean_speed * MS_TO_KNOTS),
        gust_speed_kt: round1(max_gust * MS_TO_KNOTS),
        direction,
        direction_label: CompassPoint::from_degrees(direction as f64),
        pressure: round1(mean_of_reported(members.iter().map(|m| m.pressure))),
        air_temperature: round1(mean_of_reported(members.iter().map(|m| m.air_temperature))),
        water_temperature: round1(mean_of_reported(
            members.iter().map(|m| m.water_temperature),
        )),
        sample_count: count,
    }
}

/// Truncates a local time to the top of its hour, keeping the offset of that instant.
fn hour_start(local: DateTime<Tz>) -> DateTime<chrono::FixedOffset> {
    let into_hour = Duration::seconds(i64::from(local.minute() * 60 + local.second()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));
    (local - into_hour).fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDateTime};
    use chrono_tz::America::Los_Angeles;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn sample(observed_at: NaiveDateTime, direction: f64, speed: f64, gust: f64) -> RawMeasurement {
        RawMeasurement {
            observed_at,
            direction,
            wind_speed: speed,
            gust_speed: gust,
            pressure: 1013.0,
            air_temperature: 15.0,
            water_temperature: 16.0,
        }
    }

    #[test]
    fn test_two_samples_one_hour() {
        let measurements = vec![
            sample(utc(2024, 6, 1, 20, 10), 180.0, 5.0, 8.0),
            sample(utc(2024, 6, 1, 20, 20), 190.0, 6.0, 9.0),
        ];
        let points = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.wind_speed_kt, 10.7);
        assert_eq!(p.gust_speed_kt, 17.5);
        assert_eq!(p.direction, 185);
        assert_eq!(p.direction_label, CompassPoint::South);
        assert_eq!(p.sample_count, 2);
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(p.hour, 13);
    }

    #[test]
    fn test_gust_is_max_and_speed_is_mean() {
        let measurements = vec![
            sample(utc(2024, 6, 1, 20, 0), 200.0, 5.0, 10.0),
            sample(utc(2024, 6, 1, 20, 10), 200.0, 6.0, 12.0),
            sample(utc(2024, 6, 1, 20, 20), 200.0, 5.5, 9.0),
        ];
        let points = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].wind_speed_kt, round1(5.5 * MS_TO_KNOTS));
        assert_eq!(points[0].gust_speed_kt, round1(12.0 * MS_TO_KNOTS));
    }

    #[test]
    fn test_timestamp_anchors_to_hour_start_with_offset() {
        let measurements = vec![sample(utc(2024, 6, 1, 20, 47), 200.0, 5.0, 6.0)];
        let points = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        let expected = FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 13, 0, 0)
            .unwrap();
        assert_eq!(points[0].timestamp, expected);
        assert_eq!(points[0].timestamp.to_rfc3339(), "2024-06-01T13:00:00-07:00");
    }

    #[test]
    fn test_spring_forward_groups_by_civil_hour() {
        // 2024-03-10: 02:00 PST jumps to 03:00 PDT, i.e. 10:00 UTC.
        let measurements = vec![
            sample(utc(2024, 3, 10, 9, 30), 200.0, 4.0, 5.0),  // 01:30 PST
            sample(utc(2024, 3, 10, 9, 50), 200.0, 4.0, 5.0),  // 01:50 PST
            sample(utc(2024, 3, 10, 10, 10), 200.0, 8.0, 9.0), // 03:10 PDT
            sample(utc(2024, 3, 10, 10, 50), 200.0, 8.0, 9.0), // 03:50 PDT
            sample(utc(2024, 3, 10, 11, 0), 200.0, 6.0, 7.0),  // 04:00 PDT
        ];
        let points = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        let hours: Vec<u32> = points.iter().map(|p| p.hour).collect();
        assert_eq!(hours, vec![1, 3, 4]);
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert!(points.iter().all(|p| p.date == day));
        assert_eq!(points[0].timestamp.to_rfc3339(), "2024-03-10T01:00:00-08:00");
        assert_eq!(points[1].timestamp.to_rfc3339(), "2024-03-10T03:00:00-07:00");
        assert_eq!(points[1].sample_count, 2);
    }

    #[test]
    fn test_fall_back_merges_repeated_hour() {
        // 2024-11-03: 02:00 PDT falls back to 01:00 PST at 09:00 UTC, so 01:xx happens twice.
        let measurements = vec![
            sample(utc(2024, 11, 3, 9, 30), 200.0, 6.0, 8.0),   // 01:30 PST
            sample(utc(2024, 11, 3, 8, 30), 200.0, 4.0, 5.0),   // 01:30 PDT
            sample(utc(2024, 11, 3, 10, 30), 200.0, 8.0, 9.0),  // 02:30 PST
        ];
        let points = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        let hours: Vec<u32> = points.iter().map(|p| p.hour).collect();
        assert_eq!(hours, vec![1, 2]);
        assert_eq!(points[0].sample_count, 2);
        assert_eq!(points[0].wind_speed_kt, round1(5.0 * MS_TO_KNOTS));
        assert_eq!(points[0].gust_speed_kt, round1(8.0 * MS_TO_KNOTS));
        // Anchored to the earlier of the two 01:00s.
        assert_eq!(points[0].timestamp.to_rfc3339(), "2024-11-03T01:00:00-07:00");
        assert_eq!(points[1].timestamp.to_rfc3339(), "2024-11-03T02:00:00-08:00");
        assert_eq!(points[1].sample_count, 1);
    }

    #[test]
    fn test_local_date_differs_from_utc_date() {
        // 03:00 UTC on June 2nd is still June 1st in California.
        let measurements = vec![sample(utc(2024, 6, 2, 3, 0), 200.0, 4.0, 5.0)];
        let points = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(points[0].hour, 20);
    }

    #[test]
    fn test_reported_means_skip_zero() {
        let mut a = sample(utc(2024, 6, 1, 20, 0), 200.0, 5.0, 6.0);
        let mut b = sample(utc(2024, 6, 1, 20, 10), 200.0, 5.0, 6.0);
        a.pressure = 0.0;
        b.pressure = 1012.44;
        a.air_temperature = 0.0;
        b.air_temperature = 0.0;
        let points = aggregate_hourly(&[a, b], Los_Angeles, DirectionMean::Circular);
        assert_eq!(points[0].pressure, 1012.4);
        assert_eq!(points[0].air_temperature, 0.0);
    }

    #[test]
    fn test_missing_gusts_aggregate_to_zero() {
        let measurements = vec![sample(utc(2024, 6, 1, 20, 0), 200.0, 5.0, 0.0)];
        let points = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        assert_eq!(points[0].gust_speed_kt, 0.0);
        assert_eq!(points[0].sample_count, 1);
    }

    #[test]
    fn test_output_is_order_independent() {
        let mut measurements = vec![
            sample(utc(2024, 6, 1, 21, 0), 200.0, 5.0, 6.0),
            sample(utc(2024, 6, 1, 20, 30), 210.0, 6.0, 7.0),
            sample(utc(2024, 6, 1, 20, 0), 220.0, 7.0, 8.0),
        ];
        let forward = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        measurements.reverse();
        let backward = aggregate_hourly(&measurements, Los_Angeles, DirectionMean::Circular);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
        assert!(forward[0].hour < forward[1].hour);
    }
}
