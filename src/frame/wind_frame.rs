//! A Polars view of an hourly wind series.

use crate::types::wind_data_point::WindDataPoint;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use polars::prelude::{col, df, lit, Expr, IntoLazy, LazyFrame, PolarsResult};

/// Lazily evaluated table of hourly points, one row per point.
///
/// Columns: `datetime` (start of the hour, naive UTC), `date` and `hour` (local),
/// `wspd_kt`, `gst_kt`, `wdir`, `label`, `pres`, `atmp`, `wtmp` and `samples`.
///
/// # Examples
///
/// ```no_run
/// # use buoy_wind::{BuoyWind, WindFrame};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use polars::prelude::{col, lit};
///
/// let client = BuoyWind::new().await?;
/// let hourly = client.hourly().await?;
/// let windy = WindFrame::from_points(&hourly.payload)?
///     .within_hours(10, 18)
///     .filter(col("wspd_kt").gt_eq(lit(12.0)))
///     .frame
///     .collect()?;
/// println!("{windy}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WindFrame {
    pub frame: LazyFrame,
}

impl WindFrame {
    /// Wraps an existing frame that already has the columns listed on [`WindFrame`].
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Builds the frame from hourly points, keeping their order.
    ///
    /// `datetime` is the start of each hour converted to naive UTC, so rows from both
    /// sides of a daylight saving change compare correctly. Fails only if Polars rejects
    /// the columns.
    pub fn from_points(points: &[WindDataPoint]) -> PolarsResult<Self> {
        let datetimes: Vec<NaiveDateTime> = points.iter().map(|p| p.timestamp.naive_utc()).collect();
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        let hours: Vec<u32> = points.iter().map(|p| p.hour).collect();
        let speeds: Vec<f64> = points.iter().map(|p| p.wind_speed_kt).collect();
        let gusts: Vec<f64> = points.iter().map(|p| p.gust_speed_kt).collect();
        let directions: Vec<i32> = points.iter().map(|p| p.direction).collect();
        let labels: Vec<&str> = points.iter().map(|p| p.direction_label.label()).collect();
        let pressures: Vec<f64> = points.iter().map(|p| p.pressure).collect();
        let air: Vec<f64> = points.iter().map(|p| p.air_temperature).collect();
        let water: Vec<f64> = points.iter().map(|p| p.water_temperature).collect();
        let samples: Vec<u32> = points
            .iter()
            .map(|p| u32::try_from(p.sample_count).unwrap_or(u32::MAX))
            .collect();

        let frame = df!(
            "datetime" => datetimes,
            "date" => dates,
            "hour" => hours,
            "wspd_kt" => speeds,
            "gst_kt" => gusts,
            "wdir" => directions,
            "label" => labels,
            "pres" => pressures,
            "atmp" => air,
            "wtmp" => water,
            "samples" => samples
        )?;
        Ok(Self::new(frame.lazy()))
    }

    /// Keeps the rows matching `predicate`. Nothing is evaluated until the inner
    /// `frame` is collected, so filters can be chained freely.
    ///
    /// ```
    /// use buoy_wind::WindFrame;
    /// use polars::prelude::{col, lit};
    ///
    /// let frame = WindFrame::from_points(&[]).unwrap();
    /// let gusty = frame.filter(col("gst_kt").gt(lit(25.0))).frame.collect().unwrap();
    /// assert_eq!(gusty.height(), 0);
    /// ```
    pub fn filter(&self, predicate: Expr) -> WindFrame {
        WindFrame::new(self.frame.clone().filter(predicate))
    }

    /// Rows whose hour starts within `start..=end`.
    pub fn get_range<Tz: TimeZone>(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> WindFrame {
        self.filter(
            col("datetime")
                .gt_eq(lit(start.naive_utc()))
                .and(col("datetime").lt_eq(lit(end.naive_utc()))),
        )
    }

    /// Rows of one local calendar date.
    pub fn for_date(&self, date: NaiveDate) -> WindFrame {
        self.filter(col("date").eq(lit(date)))
    }

    /// Rows whose local hour lies in `start_hour..=end_hour`.
    pub fn within_hours(&self, start_hour: u32, end_hour: u32) -> WindFrame {
        self.filter(
            col("hour")
                .gt_eq(lit(start_hour))
                .and(col("hour").lt_eq(lit(end_hour))),
        )
    }
}
