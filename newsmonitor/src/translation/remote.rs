use serde::Deserialize;
use std::time::Duration;

use super::RemoteTranslator;
use crate::error::{MonitorError, Result};

/// Client for a LibreTranslate-compatible `/translate` endpoint
pub struct LibreTranslateClient {
    api_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LibreTranslateClient {
    pub fn new(api_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            api_url: api_url.into(),
            api_key: None,
            client,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

#[async_trait::async_trait]
impl RemoteTranslator for LibreTranslateClient {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let mut form = vec![
            ("q", text),
            ("source", "auto"),
            ("target", target_lang),
            ("format", "text"),
        ];
        if let Some(key) = self.api_key.as_deref() {
            form.push(("api_key", key));
        }

        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| MonitorError::Translation(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MonitorError::Translation(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(MonitorError::Translation(format!("API error {}: {}", status, body)));
        }

        let parsed: TranslateResponse = serde_json::from_str(&body)
            .map_err(|e| MonitorError::Translation(format!("malformed response: {}", e)))?;

        match parsed.translated_text {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(MonitorError::Translation(
                parsed.error.unwrap_or_else(|| "response has no translatedText".to_string()),
            )),
        }
    }
}
