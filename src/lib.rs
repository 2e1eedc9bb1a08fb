//! Wind observations from NDBC buoys as a timezone-correct hourly series.
//!
//! Raw realtime (or yearly archive) feed text is parsed into measurements,
//! bucketed into local hours, and grouped into days. Reads are memoised in a file-backed
//! request cache keyed by time bucket; generated forecasts are kept in a SQLite store
//! that deduplicates them by the bulletin they were made from.

mod aggregation;
mod buoy_wind;
mod cache;
mod error;
mod feed;
mod frame;
mod pipeline;
mod store;
mod types;
mod utils;

pub use buoy_wind::*;
pub use error::BuoyWindError;

pub use aggregation::completeness::{complete_days, DAYTIME_HOURS};
pub use aggregation::daily::group_by_day;
pub use aggregation::direction::DirectionMean;
pub use aggregation::hourly::{aggregate_hourly, MS_TO_KNOTS};

pub use feed::error::FeedError;
pub use feed::fetcher::{FeedFetcher, NDBC_BASE_URL};
pub use feed::parser::{parse_feed, parse_feed_with_stats, FeedFormat, ParseStats, MISSING_VALUE_TOKEN};

pub use pipeline::{day_series, hourly_series, PipelineOptions};

pub use cache::error::CacheError;
pub use cache::key::{cache_key, TimeBucket};
pub use cache::request_cache::{
    fingerprint, CacheEntry, Cached, Conditional, RequestCache, StorageAvailability, DEFAULT_TTL,
};

pub use store::error::StoreError;
pub use store::forecast_store::{forecast_fingerprint, ForecastStore, StoreOutcome};
pub use store::verification::{verify_forecast, ForecastVerification, HourComparison};

pub use frame::wind_frame::WindFrame;

pub use types::compass::CompassPoint;
pub use types::day_data::{DayData, DaySummary};
pub use types::forecast::{
    DayPredictions, GenerationParameters, HourlyPrediction, NewForecast, StoredForecast,
};
pub use types::measurement::RawMeasurement;
pub use types::wind_data_point::WindDataPoint;

pub use utils::{cache_dir_candidates, CACHE_DIR_ENV};
