use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    // Covers errors during download stream processing and decompression
    #[error("Feed download or decompression failed for {0}")]
    DownloadIo(String, #[source] std::io::Error),

    #[error("Feed from {0} is not valid UTF-8")]
    InvalidEncoding(String, #[source] std::string::FromUtf8Error),
}
