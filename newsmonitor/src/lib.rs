/*
newsmonitor - lib.rs
Feed monitoring pipeline: recency filter, seen-link store, title translation, excerpts.
*/

pub mod error;
pub mod ingestion;
pub mod model;
pub mod output;
pub mod processing;
pub mod recency;
pub mod runner;
pub mod scraping;
pub mod storage;
pub mod translation;

pub use error::{MonitorError, Result};
pub use model::{Entry, FeedReport, RunStats, StoryRecord};
pub use processing::{FeedProcessor, RunContext};
pub use runner::Runner;
pub use storage::SeenStore;
