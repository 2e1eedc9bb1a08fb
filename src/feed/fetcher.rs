use crate::feed::error::FeedError;
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::{Client, Response};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

/// Root of the public NDBC site.
pub const NDBC_BASE_URL: &str = "https://www.ndbc.noaa.gov";

/// Downloads raw feed text from NDBC (or any server with the same layout).
///
/// Two files are known per station:
/// * `data/realtime2/{station}.txt`, the rolling realtime window, served as plain text;
/// * `data/historical/stdmet/{station}h{year}.txt.gz`, one gzip archive per past year,
///   decompressed while it streams in.
///
/// The fetcher only moves bytes. Parsing happens in [`crate::parse_feed_with_stats`].
/// A non-success status becomes [`FeedError::HttpStatus`], so a station without an
/// archive for some year is reported as a 404 rather than an empty series.
///
/// # Examples
///
/// ```no_run
/// # use buoy_wind::{FeedFetcher, NDBC_BASE_URL};
/// # use std::time::Duration;
/// # #[tokio::main]
/// # async fn main() -> Result<(), buoy_wind::FeedError> {
/// let fetcher = FeedFetcher::new(NDBC_BASE_URL, Some(Duration::from_secs(20)))?;
/// let raw = fetcher.fetch_realtime("46025").await?;
/// println!("{}", raw.lines().take(3).collect::<Vec<_>>().join("\n"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    base_url: String,
    client: Client,
}

impl FeedFetcher {
    /// Builds a fetcher for `base_url`. A trailing `/` is ignored.
    ///
    /// `timeout` bounds each whole request; `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, FeedError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FeedError::ClientBuild)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// URL of the realtime file of `station`.
    pub fn realtime_url(&self, station: &str) -> String {
        format!("{}/data/realtime2/{}.txt", self.base_url, station)
    }

    /// URL of the yearly archive of `station`. Archive names use lower case station ids.
    pub fn history_url(&self, station: &str, year: i32) -> String {
        format!(
            "{}/data/historical/stdmet/{}h{}.txt.gz",
            self.base_url,
            station.to_lowercase(),
            year
        )
    }

    /// Downloads the rolling realtime file (roughly the last 45 days at 10 minute resolution).
    pub async fn fetch_realtime(&self, station: &str) -> Result<String, FeedError> {
        let url = self.realtime_url(station);
        info!("Downloading realtime feed from {}", url);

        let response = self.get(&url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::NetworkRequest(url.clone(), e))?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| FeedError::InvalidEncoding(url.clone(), e))?;
        info!("Downloaded {} bytes for station {}", text.len(), station);
        Ok(text)
    }

    /// Downloads and decompresses the yearly archive for a station.
    ///
    /// The body is piped through a gzip decoder as it arrives; a truncated or corrupt
    /// stream surfaces as [`FeedError::DownloadIo`].
    pub async fn fetch_history(&self, station: &str, year: i32) -> Result<String, FeedError> {
        let url = self.history_url(station, year);
        info!("Downloading historical archive from {}", url);

        let response = self.get(&url).await?;
        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(BufReader::new(stream_reader));
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .await
            .map_err(|e| FeedError::DownloadIo(url.clone(), e))?;
        info!(
            "Downloaded and decompressed {} bytes for station {} ({})",
            decompressed.len(),
            station,
            year
        );
        String::from_utf8(decompressed).map_err(|e| FeedError::InvalidEncoding(url, e))
    }

    async fn get(&self, url: &str) -> Result<Response, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::NetworkRequest(url.to_string(), e))?;

        match response.error_for_status() {
            Ok(resp) => Ok(resp),
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                Err(if let Some(status) = e.status() {
                    FeedError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    FeedError::NetworkRequest(url.to_string(), e)
                })
            }
        }
    }
}
