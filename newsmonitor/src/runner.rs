use common::FeedSource;
use std::time::Duration;
use tracing::{error, info};

use crate::error::Result;
use crate::model::RunStats;
use crate::processing::{FeedProcessor, RunContext};

/// Walks the configured feed sources once, in configuration order.
pub struct Runner {
    processor: FeedProcessor,
    feeds: Vec<FeedSource>,
    /// Pause between two consecutive feed sources
    delay: Duration,
}

impl Runner {
    pub fn new(processor: FeedProcessor, feeds: Vec<FeedSource>, delay: Duration) -> Self {
        Self {
            processor,
            feeds,
            delay,
        }
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    /// Process every feed source once. The summary is always emitted; an
    /// error is returned only when a persist failure aborted the run.
    pub async fn run(&self, ctx: &mut RunContext) -> Result<RunStats> {
        let mut outcome = Ok(());

        for (idx, source) in self.feeds.iter().enumerate() {
            if idx > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            info!("Fetching feed: {}", source.url);
            match self.processor.process_feed(ctx, source).await {
                Ok(report) => ctx.stats.feeds.push(report),
                Err(e) => {
                    error!(url = %source.url, "run aborted: {}", e);
                    outcome = Err(e);
                    break;
                }
            }
        }

        ctx.stats.elapsed = ctx.started.elapsed();
        info!(
            total_new = ctx.stats.total_new,
            failed_feeds = ctx.stats.failed_feeds(),
            seen = ctx.store.len(),
            "{} articles processed. {:.2} seconds consumed.",
            ctx.stats.total_new,
            ctx.stats.elapsed.as_secs_f64()
        );
        self.processor.sink().summary(&ctx.stats);

        outcome.map(|_| ctx.stats.clone())
    }
}
