use std::path::PathBuf;

/// Failures of the ingestion pipeline. Everything except `StateLoad` and
/// `Persist` is recovered inside the feed processor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to fetch feed {url}: {reason}")]
    SourceFetch { url: String, reason: String },

    #[error("unparseable date: {0}")]
    DateParse(String),

    #[error("lookback of {0} hours is out of range")]
    InvalidLookback(u64),

    #[error("translation failed: {0}")]
    Translation(String),

    #[error("failed to scrape {link}: {reason}")]
    Enrichment { link: String, reason: String },

    #[error("failed to persist seen links to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load seen links from {path}: {reason}")]
    StateLoad { path: PathBuf, reason: String },

    #[error("{what} timed out after {seconds}s")]
    Timeout { what: &'static str, seconds: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
