//! The main entry point: a client for one buoy station.
//!
//! [`BuoyWind`] wires a [`FeedFetcher`], the shared [`pipeline`](crate::pipeline) and a
//! [`RequestCache`] together. Reads of the realtime series go through the cache under a
//! time-bucketed key, so repeated requests within one bucket cost a single upstream
//! download.

use crate::aggregation::direction::DirectionMean;
use crate::cache::key::{cache_key, TimeBucket, DAYS_PREFIX, FORECAST_PREFIX, HOURLY_PREFIX};
use crate::cache::request_cache::{Cached, Conditional, RequestCache, DEFAULT_TTL};
use crate::error::BuoyWindError;
use crate::feed::fetcher::{FeedFetcher, NDBC_BASE_URL};
use crate::feed::parser::FeedFormat;
use crate::pipeline::{day_series, hourly_series, PipelineOptions};
use crate::types::day_data::DayData;
use crate::types::wind_data_point::WindDataPoint;
use crate::utils::cache_dir_candidates;
use bon::{bon, Builder};
use chrono::Utc;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Station used when none is configured: Santa Monica Basin.
pub const DEFAULT_STATION: &str = "46025";

/// Parses an IANA zone name such as `America/Los_Angeles`.
pub fn parse_timezone(name: &str) -> Result<Tz, BuoyWindError> {
    name.parse::<Tz>()
        .map_err(|_| BuoyWindError::UnknownTimezone(name.to_string()))
}

/// Settings for a [`BuoyWind`] client.
///
/// # Examples
///
/// ```
/// use buoy_wind::{BuoyWindConfig, TimeBucket};
/// use std::time::Duration;
///
/// let config = BuoyWindConfig::builder()
///     .station("46221")
///     .cache_ttl(Duration::from_secs(300))
///     .time_bucket(TimeBucket::Minute)
///     .build();
/// assert_eq!(config.station, "46221");
/// assert_eq!(config.timezone, chrono_tz::America::Los_Angeles);
/// assert!(config.request_timeout.is_none());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct BuoyWindConfig {
    /// NDBC station identifier.
    #[builder(default = DEFAULT_STATION.to_string(), into)]
    pub station: String,
    /// Local zone of the station; hours and dates are civil time in this zone.
    #[builder(default = chrono_tz::America::Los_Angeles)]
    pub timezone: Tz,
    #[builder(default = DEFAULT_TTL)]
    pub cache_ttl: Duration,
    #[builder(default)]
    pub time_bucket: TimeBucket,
    #[builder(default)]
    pub direction_mean: DirectionMean,
    #[builder(default = NDBC_BASE_URL.to_string(), into)]
    pub base_url: String,
    /// Upper bound for one upstream request. Without it a slow feed blocks the caller.
    pub request_timeout: Option<Duration>,
    /// Request cache location. When unset it is chosen from the environment, see
    /// [`cache_dir_candidates`].
    pub cache_dir: Option<PathBuf>,
}

impl Default for BuoyWindConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Client for the wind series of one station.
///
/// ```no_run
/// # use buoy_wind::{BuoyWind, BuoyWindError};
/// # #[tokio::main]
/// # async fn main() -> Result<(), BuoyWindError> {
/// let client = BuoyWind::new().await?;
/// let days = client.days().await?;
/// for day in &days.payload {
///     println!("{}: avg {} kt, max gust {} kt", day.date, day.summary.avg_wind_speed_kt, day.summary.max_gust_speed_kt);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BuoyWind {
    config: BuoyWindConfig,
    fetcher: FeedFetcher,
    cache: RequestCache,
}

#[bon]
impl BuoyWind {
    /// A client with the default configuration.
    pub async fn new() -> Result<Self, BuoyWindError> {
        Self::with_config(BuoyWindConfig::default()).await
    }

    /// A client for `config`. The request cache is opened here; a location that cannot
    /// be written degrades the cache and never fails construction.
    pub async fn with_config(config: BuoyWindConfig) -> Result<Self, BuoyWindError> {
        let cache = match &config.cache_dir {
            Some(dir) => RequestCache::open(dir.clone()).await,
            None => RequestCache::open_first_writable(cache_dir_candidates()).await,
        };
        Self::with_cache(config, cache)
    }

    /// A client using an already opened cache.
    pub fn with_cache(config: BuoyWindConfig, cache: RequestCache) -> Result<Self, BuoyWindError> {
        let fetcher = FeedFetcher::new(&config.base_url, config.request_timeout)?;
        Ok(Self {
            config,
            fetcher,
            cache,
        })
    }

    pub fn config(&self) -> &BuoyWindConfig {
        &self.config
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn pipeline_options(&self, format: FeedFormat) -> PipelineOptions {
        PipelineOptions {
            timezone: self.config.timezone,
            direction_mean: self.config.direction_mean,
            format,
        }
    }

    /// Hourly points of the realtime feed, oldest first.
    pub async fn hourly(&self) -> Result<Cached<Vec<WindDataPoint>>, BuoyWindError> {
        self.cache
            .get_or_compute(&self.key(HOURLY_PREFIX), self.config.cache_ttl, || {
                self.realtime_series(hourly_series)
            })
            .await
    }

    /// Day groups of the realtime feed, newest day first.
    pub async fn days(&self) -> Result<Cached<Vec<DayData>>, BuoyWindError> {
        self.cache
            .get_or_compute(&self.key(DAYS_PREFIX), self.config.cache_ttl, || {
                self.realtime_series(day_series)
            })
            .await
    }

    /// Day groups for a caller that may already hold them.
    ///
    /// Pass the fingerprint of the payload the caller has with `.if_none_match(..)`.
    /// When it is still current the result is [`Conditional::NotModified`], which an
    /// HTTP layer would answer with `304`. Any other fingerprint refetches the feed even
    /// when the cache still holds a fresh copy.
    ///
    /// ```no_run
    /// # use buoy_wind::{BuoyWind, BuoyWindError, Conditional};
    /// # async fn run(client: BuoyWind, etag: &str) -> Result<(), BuoyWindError> {
    /// match client.days_conditional().if_none_match(etag).call().await? {
    ///     Conditional::NotModified { .. } => println!("unchanged"),
    ///     Conditional::Modified(days) => println!("{} days", days.payload.len()),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn days_conditional(
        &self,
        if_none_match: Option<&str>,
    ) -> Result<Conditional<Vec<DayData>>, BuoyWindError> {
        self.cache
            .conditional_get(
                &self.key(DAYS_PREFIX),
                self.config.cache_ttl,
                if_none_match,
                || self.realtime_series(day_series),
            )
            .await
    }

    /// Day groups of a yearly archive, bypassing the request cache.
    ///
    /// Column positions come from the archive's own header, so years without a minute
    /// column (before 2005) are read correctly; those rows fall on the top of the hour.
    ///
    /// Start with `.history(year)`, optionally pick another station with
    /// `.station(..)`, then `.call().await`.
    #[builder(start_fn = history)]
    #[doc(hidden)]
    pub async fn build_history(
        &self,
        #[builder(start_fn)] year: i32,
        station: Option<&str>,
    ) -> Result<Vec<DayData>, BuoyWindError> {
        let station = station.unwrap_or(&self.config.station);
        let raw = self.fetcher.fetch_history(station, year).await?;
        let options = self.pipeline_options(FeedFormat::Historical);
        Ok(tokio::task::spawn_blocking(move || day_series(&raw, &options)).await?)
    }

    /// The forecast remembered for this station in the current time bucket, if any.
    pub async fn cached_forecast<T>(&self) -> Option<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.cache
            .get::<T>(&self.key(FORECAST_PREFIX), Some(self.config.cache_ttl))
            .await
            .map(|entry| entry.payload)
    }

    /// Remembers a generated forecast for this station and time bucket. Returns its
    /// fingerprint.
    pub async fn remember_forecast<T>(&self, forecast: &T) -> String
    where
        T: Serialize + Clone + Send + 'static,
    {
        self.cache
            .set(&self.key(FORECAST_PREFIX), forecast, self.config.cache_ttl)
            .await
    }

    fn key(&self, prefix: &str) -> String {
        let now = Utc::now().with_timezone(&self.config.timezone);
        cache_key(prefix, &self.config.station, self.config.time_bucket, &now)
    }

    async fn realtime_series<T, F>(&self, series: F) -> Result<T, BuoyWindError>
    where
        T: Send + 'static,
        F: FnOnce(&str, &PipelineOptions) -> T + Send + 'static,
    {
        let raw = self.fetcher.fetch_realtime(&self.config.station).await?;
        let options = self.pipeline_options(FeedFormat::Realtime);
        Ok(tokio::task::spawn_blocking(move || series(&raw, &options)).await?)
    }
}
