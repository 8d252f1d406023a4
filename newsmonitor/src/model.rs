use std::time::Duration;

/// Title used when a feed entry carries none.
pub const DEFAULT_TITLE: &str = "No title";

/// One item yielded by a feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Canonical article URL, used as identity
    pub link: String,
    pub title: Option<String>,
    /// Free-text publication timestamp as found in (or rendered from) the feed
    pub published: Option<String>,
}

impl Entry {
    pub fn new(link: impl Into<String>, title: Option<&str>, published: Option<&str>) -> Self {
        Self {
            link: link.into(),
            title: title.map(str::to_string),
            published: published.map(str::to_string),
        }
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }
}

/// A newly accepted entry, ready for the output sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    /// Title, translated when needed
    pub title: String,
    pub published: String,
    pub source_label: String,
    pub link: String,
    /// First characters of the article body, empty when scraping failed
    pub excerpt: String,
}

/// Outcome of one feed source within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub url: String,
    pub label: String,
    pub new_items: usize,
    /// False when the feed could not be fetched or parsed
    pub fetched: bool,
}

/// Counters for a single run, never persisted.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub feeds: Vec<FeedReport>,
    pub total_new: usize,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn failed_feeds(&self) -> usize {
        self.feeds.iter().filter(|f| !f.fetched).count()
    }
}
