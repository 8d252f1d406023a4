use common::EnrichmentConfig;
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{MonitorError, Result};

/// Turns an article URL into its body text.
#[async_trait::async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String>;
}

/// Downloads the page and extracts the main content with readability.
pub struct ReadabilityExtractor {
    client: Client,
}

impl ReadabilityExtractor {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ArticleExtractor for ReadabilityExtractor {
    async fn extract(&self, url: &str) -> Result<String> {
        let fail = |reason: String| MonitorError::Enrichment {
            link: url.to_string(),
            reason,
        };

        let url_obj = url::Url::parse(url).map_err(|e| fail(format!("invalid URL: {}", e)))?;

        let response = self
            .client
            .get(url_obj.clone())
            .send()
            .await
            .map_err(|e| fail(format!("failed to fetch article page: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("article fetch failed with status: {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(fail(format!("not an HTML page: {}", content_type)));
        }

        // Readability requires a Reader, so we fetch bytes
        let bytes = response
            .bytes()
            .await
            .map_err(|e| fail(format!("failed to read response body: {}", e)))?;
        let mut reader = Cursor::new(bytes);

        let product = readability::extractor::extract(&mut reader, &url_obj)
            .map_err(|e| fail(format!("readability failed: {}", e)))?;

        match html2text::from_read(product.content.as_bytes(), 80) {
            Ok(text) => {
                debug!("scraping: extracted {} chars from {}", text.len(), url);
                Ok(text)
            }
            Err(e) => {
                debug!("scraping: html2text failed for {} ({}), using plain text", url, e);
                Ok(product.text)
            }
        }
    }
}

/// Best-effort retrieval of an excerpt for a new story.
pub struct Enricher {
    extractor: Box<dyn ArticleExtractor>,
    excerpt_chars: usize,
    timeout: Duration,
}

impl Enricher {
    pub fn new(extractor: Box<dyn ArticleExtractor>, excerpt_chars: usize, timeout: Duration) -> Self {
        Self {
            extractor,
            excerpt_chars,
            timeout,
        }
    }

    pub fn from_config(cfg: &EnrichmentConfig, extractor: Box<dyn ArticleExtractor>) -> Self {
        Self::new(extractor, cfg.excerpt_chars, Duration::from_secs(cfg.timeout_seconds))
    }

    /// Excerpt of the article body, or an error if it could not be retrieved.
    pub async fn try_fetch_excerpt(&self, link: &str) -> Result<String> {
        let text = tokio::time::timeout(self.timeout, self.extractor.extract(link))
            .await
            .map_err(|_| MonitorError::Timeout {
                what: "article scraping",
                seconds: self.timeout.as_secs(),
            })??;
        Ok(excerpt(&text, self.excerpt_chars))
    }

    /// Never fails: errors are logged with the link and yield an empty excerpt.
    pub async fn fetch_excerpt(&self, link: &str) -> String {
        match self.try_fetch_excerpt(link).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to scrape: {} ({})", link, e);
                String::new()
            }
        }
    }
}

/// First `max_chars` characters of `text`, leading/trailing whitespace removed.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}
