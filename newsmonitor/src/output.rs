use crate::model::{RunStats, StoryRecord};

/// Line-oriented destination for accepted stories and the run summary.
pub trait StorySink: Send + Sync {
    /// Called once per new story, before scraping
    fn story(&self, story: &StoryRecord);

    /// Called after scraping, only when an excerpt was retrieved
    fn excerpt(&self, story: &StoryRecord);

    fn summary(&self, stats: &RunStats);
}

/// Prints to stdout, separate from the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl StorySink for ConsoleSink {
    fn story(&self, story: &StoryRecord) {
        println!("{} {} - Published: {}", story.source_label, story.title, story.published);
        println!("{}", story.link);
    }

    fn excerpt(&self, story: &StoryRecord) {
        println!("{}", story.excerpt);
    }

    fn summary(&self, stats: &RunStats) {
        println!("{}", "-".repeat(42));
        println!(
            "{} articles processed. {:.2} seconds consumed.",
            stats.total_new,
            stats.elapsed.as_secs_f64()
        );
    }
}
