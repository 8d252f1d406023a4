use common::{TranslationConfig, UndetectedPolicy};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};

pub mod detect;
pub mod remote;

/// Language identification for a piece of text.
pub trait LanguageDetector: Send + Sync {
    /// ISO 639-1 code where one exists, `None` when the language is undetectable
    fn detect(&self, text: &str) -> Option<String>;
}

/// Remote machine translation (LibreTranslate and compatibles)
#[async_trait::async_trait]
pub trait RemoteTranslator: Send + Sync {
    /// Translate `text` into `target_lang`, letting the service detect the source
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

/// Why a title was or was not sent to the translation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Detected language is already acceptable
    Accepted(String),
    /// Detected language needs translation
    Foreign(String),
    /// Detection failed; the policy decides
    Undetected,
}

/// Best-effort normalization of titles to one target language.
pub struct TitleTranslator {
    detector: Box<dyn LanguageDetector>,
    remote: Box<dyn RemoteTranslator>,
    target_lang: String,
    /// Target language plus bypass languages
    accepted: Vec<String>,
    on_undetected: UndetectedPolicy,
    timeout: Duration,
}

impl TitleTranslator {
    pub fn new(
        detector: Box<dyn LanguageDetector>,
        remote: Box<dyn RemoteTranslator>,
        target_lang: impl Into<String>,
    ) -> Self {
        let target_lang = target_lang.into();
        Self {
            detector,
            remote,
            accepted: vec![target_lang.clone()],
            target_lang,
            on_undetected: UndetectedPolicy::Translate,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(
        cfg: &TranslationConfig,
        detector: Box<dyn LanguageDetector>,
        remote: Box<dyn RemoteTranslator>,
    ) -> Self {
        Self::new(detector, remote, cfg.target_lang.clone())
            .with_bypass(cfg.bypass_langs.iter().cloned())
            .with_undetected_policy(cfg.on_undetected)
            .with_timeout(Duration::from_secs(cfg.timeout_seconds))
    }

    /// Languages passed through untouched besides the target language.
    pub fn with_bypass(mut self, langs: impl IntoIterator<Item = String>) -> Self {
        for lang in langs {
            if !self.accepted.contains(&lang) {
                self.accepted.push(lang);
            }
        }
        self
    }

    pub fn with_undetected_policy(mut self, policy: UndetectedPolicy) -> Self {
        self.on_undetected = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn decide(&self, text: &str) -> Decision {
        match self.detector.detect(text) {
            Some(lang) if self.accepted.contains(&lang) => Decision::Accepted(lang),
            Some(lang) => Decision::Foreign(lang),
            None => Decision::Undetected,
        }
    }

    /// `Ok(None)` when no translation is needed, `Ok(Some(..))` with the
    /// translated text, `Err` when the service failed or timed out.
    pub async fn try_translate(&self, text: &str) -> Result<Option<String>> {
        match self.decide(text) {
            Decision::Accepted(lang) => {
                debug!(%lang, "title already in an accepted language");
                return Ok(None);
            }
            Decision::Undetected if self.on_undetected == UndetectedPolicy::Keep => {
                debug!("title language undetected, keeping as is");
                return Ok(None);
            }
            Decision::Foreign(_) | Decision::Undetected => {}
        }

        let translated = tokio::time::timeout(self.timeout, self.remote.translate(text, &self.target_lang))
            .await
            .map_err(|_| MonitorError::Timeout {
                what: "translation",
                seconds: self.timeout.as_secs(),
            })??;
        Ok(Some(translated))
    }

    /// Never fails: any translation error falls back to the original text.
    pub async fn translate(&self, text: &str) -> String {
        match self.try_translate(text).await {
            Ok(Some(translated)) => translated,
            Ok(None) => text.to_string(),
            Err(e) => {
                warn!("Translation failed: {}", e);
                text.to_string()
            }
        }
    }
}
