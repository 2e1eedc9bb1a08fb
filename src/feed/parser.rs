//! Parses NDBC standard meteorological text into [`RawMeasurement`]s.
//!
//! The current feed is whitespace delimited with the columns
//! `YY MM DD hh mm WDIR WSPD GST WVHT DPD APD MWD PRES ATMP WTMP DEWP VIS PTDY TIDE`,
//! preceded by two `#` header lines (names and units). Timestamps are UTC and wind
//! speeds are m/s.
//!
//! Yearly archives changed layout over time. Before 2005 there is no minute column,
//! older files call the direction and pressure columns `WD` and `BAR`, and before 2007
//! the names line has no leading `#`. Column positions are therefore read from the
//! names line; text without one is read with the current layout.

use crate::types::measurement::RawMeasurement;
use chrono::NaiveDate;
use log::{debug, warn};

/// Token the realtime feed writes in place of a missing value.
pub const MISSING_VALUE_TOKEN: &str = "MM";

/// Lines of the current layout with fewer fields than this (through `WTMP`) are skipped.
pub const MIN_FIELDS: usize = 15;

const HISTORICAL_SENTINELS: [f64; 3] = [99.0, 999.0, 9999.0];
const SENTINEL_TOLERANCE: f64 = 0.01;

/// Which flavour of the feed is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedFormat {
    /// The rolling realtime file. Only `MM` marks a missing value.
    #[default]
    Realtime,
    /// Yearly archive files, which also use `99`, `999` and `9999` as missing markers.
    /// A direction of 99° is still a valid bearing.
    Historical,
}

/// Counters describing one parse run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub data_lines: usize,
    pub kept: usize,
    pub too_few_fields: usize,
    pub malformed: usize,
    pub missing_wind: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Direction,
    Other,
}

/// Field index of every value read from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    year: usize,
    month: usize,
    day: usize,
    hour: usize,
    minute: Option<usize>,
    direction: usize,
    wind_speed: usize,
    gust: usize,
    pressure: usize,
    air_temperature: usize,
    water_temperature: usize,
}

const CURRENT_LAYOUT: Layout = Layout {
    year: 0,
    month: 1,
    day: 2,
    hour: 3,
    minute: Some(4),
    direction: 5,
    wind_speed: 6,
    gust: 7,
    pressure: 12,
    air_temperature: 13,
    water_temperature: 14,
};

impl Layout {
    /// Reads positions from a names line such as `#YY  MM DD hh mm WDIR ...` or
    /// `YYYY MM DD hh WD ...`. `None` when a required column is absent.
    fn from_names(names: &[&str]) -> Option<Self> {
        let find = |aliases: &[&str]| names.iter().position(|name| aliases.contains(name));
        Some(Layout {
            year: find(&["YY", "YYYY"])?,
            month: find(&["MM"])?,
            day: find(&["DD"])?,
            hour: find(&["hh"])?,
            minute: find(&["mm"]),
            direction: find(&["WDIR", "WD"])?,
            wind_speed: find(&["WSPD"])?,
            gust: find(&["GST"])?,
            pressure: find(&["PRES", "BAR"])?,
            air_temperature: find(&["ATMP"])?,
            water_temperature: find(&["WTMP"])?,
        })
    }

    /// One past the right-most column this layout reads.
    fn min_fields(&self) -> usize {
        let columns = [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute.unwrap_or(0),
            self.direction,
            self.wind_speed,
            self.gust,
            self.pressure,
            self.air_temperature,
            self.water_temperature,
        ];
        columns.into_iter().max().unwrap_or(0) + 1
    }

    fn value_columns(&self) -> [(usize, Column); 6] {
        [
            (self.direction, Column::Direction),
            (self.wind_speed, Column::Other),
            (self.gust, Column::Other),
            (self.pressure, Column::Other),
            (self.air_temperature, Column::Other),
            (self.water_temperature, Column::Other),
        ]
    }
}

/// Column names of a header line, or `None` for anything else (data, the units line).
fn column_names(line: &str) -> Option<Vec<&str>> {
    let names: Vec<&str> = line.trim_start_matches('#').split_whitespace().collect();
    matches!(names.first(), Some(&("YY" | "YYYY"))).then_some(names)
}

enum LineOutcome {
    Kept(RawMeasurement),
    MissingWind,
    Malformed,
}

/// Parses a realtime feed. Convenience for [`parse_feed_with_stats`] with
/// [`FeedFormat::Realtime`].
///
/// Header lines, blank lines, short lines and lines that fail to parse are skipped;
/// a bad line never stops the rest of the feed from being read.
///
/// # Examples
///
/// ```
/// use buoy_wind::parse_feed;
///
/// let raw = "\
/// #YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
/// #yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
/// 2024 06 01 20 50 280  7.0  9.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM
/// 2024 06 01 20 40  MM  6.0  8.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM
/// ";
/// let measurements = parse_feed(raw);
/// assert_eq!(measurements.len(), 1);
/// assert_eq!(measurements[0].direction, 280.0);
/// ```
pub fn parse_feed(raw: &str) -> Vec<RawMeasurement> {
    parse_feed_with_stats(raw, FeedFormat::Realtime).0
}

/// Parses feed text in the given format and reports how many lines were kept or dropped.
pub fn parse_feed_with_stats(raw: &str, format: FeedFormat) -> (Vec<RawMeasurement>, ParseStats) {
    let mut stats = ParseStats::default();
    let mut measurements = Vec::new();

    let mut layout = CURRENT_LAYOUT;
    let mut saw_names = false;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(names) = column_names(line) {
            saw_names = true;
            match Layout::from_names(&names) {
                Some(found) => {
                    if found != layout {
                        debug!("Feed columns: {:?}", found);
                    }
                    layout = found;
                }
                None => warn!("Unrecognised feed header, keeping previous columns: {}", line),
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        stats.data_lines += 1;

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < layout.min_fields() {
            stats.too_few_fields += 1;
            continue;
        }

        match parse_line(&fields, &layout, format) {
            LineOutcome::Kept(m) => {
                stats.kept += 1;
                measurements.push(m);
            }
            LineOutcome::MissingWind => stats.missing_wind += 1,
            LineOutcome::Malformed => stats.malformed += 1,
        }
    }

    if !saw_names && format == FeedFormat::Historical && stats.data_lines > 0 {
        warn!("Archive has no column header, reading it with the current layout");
    }
    debug!(
        "Parsed {} of {} data lines ({} short, {} malformed, {} without wind)",
        stats.kept, stats.data_lines, stats.too_few_fields, stats.malformed, stats.missing_wind
    );
    (measurements, stats)
}

fn parse_line(fields: &[&str], layout: &Layout, format: FeedFormat) -> LineOutcome {
    let Some(observed_at) = parse_timestamp(fields, layout) else {
        return LineOutcome::Malformed;
    };

    let parsed: Result<Vec<Option<f64>>, ()> = layout
        .value_columns()
        .iter()
        .map(|&(index, column)| parse_value(fields[index], column, format))
        .collect();

    let Ok(values) = parsed else {
        return LineOutcome::Malformed;
    };
    let [direction, wind_speed, gust, pressure, air_temp, water_temp] = values[..] else {
        return LineOutcome::Malformed;
    };

    let (Some(direction), Some(wind_speed)) = (direction, wind_speed) else {
        return LineOutcome::MissingWind;
    };

    LineOutcome::Kept(RawMeasurement {
        observed_at,
        direction,
        wind_speed,
        gust_speed: gust.unwrap_or(0.0),
        pressure: pressure.unwrap_or(0.0),
        air_temperature: air_temp.unwrap_or(0.0),
        water_temperature: water_temp.unwrap_or(0.0),
    })
}

fn parse_timestamp(fields: &[&str], layout: &Layout) -> Option<chrono::NaiveDateTime> {
    let mut year: i32 = fields[layout.year].parse().ok()?;
    if year < 100 {
        // Archives before 1999 carry a two digit year.
        year += 1900;
    }
    let month: u32 = fields[layout.month].parse().ok()?;
    let day: u32 = fields[layout.day].parse().ok()?;
    let hour: u32 = fields[layout.hour].parse().ok()?;
    let minute: u32 = match layout.minute {
        Some(index) => fields[index].parse().ok()?,
        None => 0,
    };
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// `Ok(None)` for a missing value, `Err` for text that is not a number at all.
fn parse_value(token: &str, column: Column, format: FeedFormat) -> Result<Option<f64>, ()> {
    if token == MISSING_VALUE_TOKEN {
        return Ok(None);
    }
    let value: f64 = token.parse().map_err(|_| ())?;
    if !value.is_finite() {
        return Err(());
    }
    if format == FeedFormat::Historical && is_sentinel(value, column) {
        return Ok(None);
    }
    if column == Column::Direction && !(0.0..=360.0).contains(&value) {
        return Ok(None);
    }
    Ok(Some(value))
}

fn is_sentinel(value: f64, column: Column) -> bool {
    HISTORICAL_SENTINELS.iter().any(|sentinel| {
        let hit = (value - sentinel).abs() < SENTINEL_TOLERANCE;
        let valid_bearing = column == Column::Direction && *sentinel == 99.0;
        hit && !valid_bearing
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "\
#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
#yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
";

    fn feed(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_parses_complete_line() {
        let raw = feed(&["2024 06 01 20 50 280  7.0  9.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM"]);
        let parsed = parse_feed(&raw);
        assert_eq!(parsed.len(), 1);
        let m = parsed[0];
        assert_eq!(
            m.observed_at,
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(20, 50, 0)
                .unwrap()
        );
        assert_eq!(m.direction, 280.0);
        assert_eq!(m.wind_speed, 7.0);
        assert_eq!(m.gust_speed, 9.0);
        assert_eq!(m.pressure, 1013.2);
        assert_eq!(m.air_temperature, 16.1);
        assert_eq!(m.water_temperature, 17.0);
    }

    #[test]
    fn test_missing_direction_or_speed_drops_line() {
        let raw = feed(&[
            "2024 06 01 20 50  MM  7.0  9.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM",
            "2024 06 01 20 40 280   MM  9.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM",
        ]);
        let (parsed, stats) = parse_feed_with_stats(&raw, FeedFormat::Realtime);
        assert!(parsed.is_empty());
        assert_eq!(stats.missing_wind, 2);
    }

    #[test]
    fn test_missing_optional_fields_default_to_zero() {
        let raw = feed(&["2024 06 01 20 50 280  7.0   MM   1.2     8   5.1 270     MM    MM    MM  12.3   MM   MM    MM"]);
        let parsed = parse_feed(&raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].gust_speed, 0.0);
        assert_eq!(parsed[0].pressure, 0.0);
        assert_eq!(parsed[0].air_temperature, 0.0);
        assert_eq!(parsed[0].water_temperature, 0.0);
    }

    #[test]
    fn test_bad_lines_do_not_abort_feed() {
        let raw = feed(&[
            "2024 06 01 20 50 280  7.0  9.0",
            "garbage line with plenty of fields a b c d e f g h i j k l",
            "2024 13 01 20 50 280  7.0  9.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM",
            "",
            "2024 06 01 20 40 270  6.0  8.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM",
        ]);
        let (parsed, stats) = parse_feed_with_stats(&raw, FeedFormat::Realtime);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].direction, 270.0);
        assert_eq!(stats.too_few_fields, 1);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.data_lines, 4);
    }

    #[test]
    fn test_out_of_range_direction_is_missing() {
        let raw = feed(&["2024 06 01 20 50 361  7.0  9.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM"]);
        assert!(parse_feed(&raw).is_empty());
    }

    #[test]
    fn test_historical_sentinels() {
        let raw = feed(&[
            "2016 10 04 10 50  99  7.0 99.0  99.00 99.00 99.00 999 9999.0 999.0 999.0 999.0 99.0 99.00",
            "2016 10 04 11 00 999  7.0  9.0  99.00 99.00 99.00 999 1013.0  15.0  16.0 999.0 99.0 99.00",
            "2016 10 04 11 10 200 99.0  9.0  99.00 99.00 99.00 999 1013.0  15.0  16.0 999.0 99.0 99.00",
        ]);
        let (parsed, stats) = parse_feed_with_stats(&raw, FeedFormat::Historical);
        assert_eq!(parsed.len(), 1);
        assert_eq!(stats.missing_wind, 2);
        let m = parsed[0];
        assert_eq!(m.direction, 99.0);
        assert_eq!(m.gust_speed, 0.0);
        assert_eq!(m.pressure, 0.0);
        assert_eq!(m.air_temperature, 0.0);
    }

    #[test]
    fn test_realtime_keeps_sentinel_like_values() {
        let raw = feed(&["2024 06 01 20 50 280  7.0  9.0   1.2     8   5.1 270  999.0  16.1  17.0  12.3   MM   MM    MM"]);
        let parsed = parse_feed(&raw);
        assert_eq!(parsed[0].pressure, 999.0);
    }

    #[test]
    fn test_current_layout_needs_min_fields() {
        assert_eq!(CURRENT_LAYOUT.min_fields(), MIN_FIELDS);
        let names = column_names(HEADER.lines().next().unwrap()).unwrap();
        assert_eq!(Layout::from_names(&names), Some(CURRENT_LAYOUT));
        assert!(column_names("#yr  mo dy hr mn degT m/s").is_none());
    }

    #[test]
    fn test_archive_without_minute_column() {
        let raw = "\
YYYY MM DD hh  WD  WSPD GST  WVHT  DPD   APD  MWD  BAR    ATMP  WTMP  DEWP  VIS  TIDE
2003 01 01 00 045  5.0  7.0  1.20  9.09  6.52 999 1014.0  14.0  15.1 999.0 99.0 99.00
2003 01 01 01 999  5.0  7.0  1.20  9.09  6.52 999 1014.0  14.0  15.1 999.0 99.0 99.00
";
        let (parsed, stats) = parse_feed_with_stats(raw, FeedFormat::Historical);
        assert_eq!(stats.data_lines, 2);
        assert_eq!(stats.missing_wind, 1);
        assert_eq!(parsed.len(), 1);
        let m = parsed[0];
        assert_eq!(
            m.observed_at,
            NaiveDate::from_ymd_opt(2003, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(m.direction, 45.0);
        assert_eq!(m.wind_speed, 5.0);
        assert_eq!(m.gust_speed, 7.0);
        assert_eq!(m.pressure, 1014.0);
        assert_eq!(m.air_temperature, 14.0);
        assert_eq!(m.water_temperature, 15.1);
    }

    #[test]
    fn test_archive_with_minute_column_but_no_hash() {
        let raw = "\
YYYY MM DD hh mm  WD  WSPD GST  WVHT  DPD   APD  MWD  BAR    ATMP  WTMP  DEWP  VIS  TIDE
2005 07 04 18 50 280  8.0  9.5  1.20  9.09  6.52 999 1012.0  18.0  17.1 999.0 99.0 99.00
";
        let parsed = parse_feed_with_stats(raw, FeedFormat::Historical).0;
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].observed_at.time().to_string(), "18:50:00");
        assert_eq!(parsed[0].direction, 280.0);
        assert_eq!(parsed[0].pressure, 1012.0);
    }

    #[test]
    fn test_two_digit_year() {
        let raw = "\
YY MM DD hh WD   WSPD GST  WVHT  DPD   APD  MWD  BAR    ATMP  WTMP  DEWP  VIS
98 01 02 03 180  5.0  6.0 99.00 99.00 99.00 999 1015.0  12.0  13.0 999.0 99.0
";
        let (parsed, _) = parse_feed_with_stats(raw, FeedFormat::Historical);
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].observed_at,
            NaiveDate::from_ymd_opt(1998, 1, 2)
                .unwrap()
                .and_hms_opt(3, 0, 0)
                .unwrap()
        );
        assert_eq!(parsed[0].direction, 180.0);
        assert_eq!(parsed[0].pressure, 1015.0);
    }

    #[test]
    fn test_unrecognised_header_keeps_current_layout() {
        let raw = "\
#YY  MM DD hh mm WIND WSPD GST
2024 06 01 20 50 280  7.0  9.0   1.2     8   5.1 270 1013.2  16.1  17.0  12.3   MM   MM    MM
";
        let (parsed, stats) = parse_feed_with_stats(raw, FeedFormat::Realtime);
        assert_eq!(stats.data_lines, 1);
        assert_eq!(parsed[0].direction, 280.0);
    }
}
