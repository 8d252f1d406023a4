use chrono::{DateTime, Utc};
use common::{FeedSource, PersistFailurePolicy};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::ingestion::FeedFetcher;
use crate::model::{FeedReport, RunStats, StoryRecord};
use crate::output::StorySink;
use crate::recency::{self, is_recent};
use crate::scraping::Enricher;
use crate::storage::SeenStore;
use crate::translation::TitleTranslator;

/// Mutable state of one run, created at start and threaded through every feed.
pub struct RunContext {
    pub store: SeenStore,
    /// Entries published at or before this instant are ignored
    pub threshold: DateTime<Utc>,
    pub started: Instant,
    pub stats: RunStats,
}

impl RunContext {
    pub fn new(store: SeenStore, now: DateTime<Utc>, lookback_hours: u64) -> Result<Self> {
        Ok(Self {
            store,
            threshold: recency::threshold(now, lookback_hours)?,
            started: Instant::now(),
            stats: RunStats::default(),
        })
    }
}

/// Runs one feed source through filter, de-duplication, translation and scraping.
pub struct FeedProcessor {
    fetcher: Box<dyn FeedFetcher>,
    translator: Option<TitleTranslator>,
    enricher: Option<Enricher>,
    sink: Arc<dyn StorySink>,
    on_persist_failure: PersistFailurePolicy,
}

impl FeedProcessor {
    pub fn new(fetcher: Box<dyn FeedFetcher>, sink: Arc<dyn StorySink>) -> Self {
        Self {
            fetcher,
            translator: None,
            enricher: None,
            sink,
            on_persist_failure: PersistFailurePolicy::Continue,
        }
    }

    pub fn with_translator(mut self, translator: Option<TitleTranslator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_enricher(mut self, enricher: Option<Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_persist_policy(mut self, policy: PersistFailurePolicy) -> Self {
        self.on_persist_failure = policy;
        self
    }

    pub fn sink(&self) -> &Arc<dyn StorySink> {
        &self.sink
    }

    /// Process every entry of `source` in feed order.
    ///
    /// Fetch, translation and scraping failures are recovered here. The only
    /// error returned is a persist failure under `PersistFailurePolicy::Abort`.
    pub async fn process_feed(&self, ctx: &mut RunContext, source: &FeedSource) -> Result<FeedReport> {
        let mut report = FeedReport {
            url: source.url.clone(),
            label: source.label.clone(),
            new_items: 0,
            fetched: false,
        };

        let entries = match self.fetcher.fetch(&source.url).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(url = %source.url, "{}", e);
                return Ok(report);
            }
        };
        report.fetched = true;
        debug!(url = %source.url, entries = entries.len(), "feed fetched");

        for entry in &entries {
            if !is_recent(entry, ctx.threshold) {
                continue;
            }
            // Marked seen below before the next entry is looked at, so a link
            // repeated within one fetch is only accepted once.
            if ctx.store.contains(&entry.link) {
                continue;
            }

            let raw_title = entry.title_or_default();
            let title = match &self.translator {
                Some(translator) => translator.translate(raw_title).await,
                None => raw_title.to_string(),
            };

            let mut story = StoryRecord {
                title,
                published: entry.published.clone().unwrap_or_default(),
                source_label: source.label.clone(),
                link: entry.link.clone(),
                excerpt: String::new(),
            };
            self.sink.story(&story);

            ctx.store.add(&entry.link);
            report.new_items += 1;
            ctx.stats.total_new += 1;

            if let Some(enricher) = &self.enricher {
                story.excerpt = enricher.fetch_excerpt(&entry.link).await;
                if !story.excerpt.is_empty() {
                    self.sink.excerpt(&story);
                }
            }
        }

        if let Err(e) = ctx.store.persist().await {
            match self.on_persist_failure {
                PersistFailurePolicy::Continue => {
                    error!("{}; continuing with in-memory state", e);
                }
                PersistFailurePolicy::Abort => {
                    warn!(url = %source.url, "aborting run after persist failure");
                    info!("{} new articles processed.", report.new_items);
                    ctx.stats.feeds.push(report);
                    return Err(e);
                }
            }
        }

        info!("{} new articles processed.", report.new_items);
        Ok(report)
    }
}
