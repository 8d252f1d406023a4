use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use feed_rs::parser::{self, ParseFeedResult};
use reqwest::Client;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{MonitorError, Result};
use crate::model::Entry;
use crate::recency;

/// Turns a feed URL into its entries, in feed order.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>>;
}

/// Fetches a feed over HTTP and parses it with feed-rs. No retries.
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_and_parse_feed(&self, url: &str) -> Result<Feed> {
        let fail = |reason: String| MonitorError::SourceFetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(format!("network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("feed fetch failed with status: {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fail(format!("failed to read response body: {}", e)))?;
        parse_feed(bytes.as_ref()).map_err(|e| fail(format!("failed to parse feed: {}", e)))
    }
}

/// Parse feed XML, reading timestamps with the lenient recency parser
/// instead of feed-rs's built-in one.
pub fn parse_feed<R: Read>(source: R) -> ParseFeedResult<Feed> {
    parser::Builder::new()
        .timestamp_parser(feed_timestamp)
        .build()
        .parse(source)
}

fn feed_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match recency::parse_timestamp(raw) {
        Ok(instant) => Some(instant),
        Err(e) => {
            info!("Date parse failed: {}", e);
            None
        }
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>> {
        let feed = self.fetch_and_parse_feed(url).await?;
        Ok(entries_from_feed(feed))
    }
}

/// Map parsed feed entries to pipeline entries. Entries without a link
/// have no identity and are dropped.
pub fn entries_from_feed(feed: Feed) -> Vec<Entry> {
    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content);
            let Some(link) = entry.links.into_iter().next().map(|l| l.href) else {
                debug!("Skipping entry without URL: {:?}", title);
                return None;
            };
            Some(Entry {
                link,
                title,
                published: entry.published.map(|d| d.to_rfc3339()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test feed</title>
    <link>https://news.example.com/</link>
    <description>Test</description>
    <item>
      <title>First story</title>
      <link>https://news.example.com/a</link>
      <pubDate>Sat, 03 May 2025 10:15:00 GMT</pubDate>
    </item>
    <item>
      <link>https://news.example.com/b</link>
    </item>
    <item>
      <title>No link at all</title>
      <description>dropped</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn maps_links_titles_and_dates_in_order() {
        let feed = parse_feed(RSS.as_bytes()).expect("parse");
        let entries = entries_from_feed(feed);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].link, "https://news.example.com/a");
        assert_eq!(entries[0].title.as_deref(), Some("First story"));
        assert_eq!(entries[0].published.as_deref(), Some("2025-05-03T10:15:00+00:00"));

        assert_eq!(entries[1].link, "https://news.example.com/b");
        assert_eq!(entries[1].title, None);
        assert_eq!(entries[1].published, None);
        assert_eq!(entries[1].title_or_default(), "No title");
    }

    fn single_item(pub_date: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>t</title><link>https://news.example.com/</link><description>d</description>
<item><title>Story</title><link>https://news.example.com/x</link><pubDate>{}</pubDate></item>
</channel></rss>"#,
            pub_date
        )
    }

    #[test]
    fn lenient_timestamps_survive_feed_parsing() {
        let feed = parse_feed(single_item("2025-05-03 10:15:00").as_bytes()).expect("parse");
        let entries = entries_from_feed(feed);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].published.as_deref(), Some("2025-05-03T10:15:00+00:00"));

        let feed = parse_feed(single_item("Sat, 03 May 2025 12:15:00 +0200").as_bytes()).expect("parse");
        assert_eq!(
            entries_from_feed(feed)[0].published.as_deref(),
            Some("2025-05-03T10:15:00+00:00")
        );
    }

    #[test]
    fn unparseable_timestamp_yields_no_date() {
        let feed = parse_feed(single_item("le 3 mai 2025").as_bytes()).expect("parse");
        let entries = entries_from_feed(feed);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].published, None);
        assert_eq!(feed_timestamp("le 3 mai 2025"), None);
    }
}
