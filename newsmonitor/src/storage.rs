use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{MonitorError, Result};

/// Set of article links already processed, backed by a JSON array on disk.
///
/// Links are compared byte-for-byte; nothing is ever removed.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    links: HashSet<String>,
}

impl SeenStore {
    /// Empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            links: HashSet::new(),
        }
    }

    /// Load the snapshot at `path`. A missing file yields an empty store,
    /// a file that is not a JSON array of strings is an error.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no seen-links file yet, starting empty");
                return Ok(Self::new(path));
            }
            Err(e) => {
                return Err(MonitorError::StateLoad {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        let links: Vec<String> = serde_json::from_str(&data).map_err(|e| MonitorError::StateLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), count = links.len(), "loaded seen links");

        Ok(Self {
            path,
            links: links.into_iter().collect(),
        })
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Mark `link` as seen. Returns false if it already was.
    pub fn add(&mut self, link: &str) -> bool {
        self.links.insert(link.to_string())
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(String::as_str)
    }

    /// Write a complete snapshot, replacing whatever was there.
    ///
    /// The snapshot goes to a sibling temp file first and is renamed over the
    /// target, so readers never observe a half-written array.
    pub async fn persist(&self) -> Result<()> {
        let mut sorted: Vec<&str> = self.links().collect();
        sorted.sort_unstable();
        let body = serde_json::to_string_pretty(&sorted).map_err(|e| MonitorError::Persist {
            path: self.path.clone(),
            source: e.into(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.persist_error(e))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body).await.map_err(|e| self.persist_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), "failed to remove temporary state file: {}", cleanup);
            }
            return Err(self.persist_error(e));
        }

        debug!(path = %self.path.display(), count = sorted.len(), "persisted seen links");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen_articles.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_error(&self, source: std::io::Error) -> MonitorError {
        MonitorError::Persist {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::load(dir.path().join("seen.json")).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn persist_then_reload_yields_same_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let mut store = SeenStore::new(&path);
        assert!(store.add("https://b.example/2"));
        assert!(store.add("https://a.example/1"));
        assert!(!store.add("https://a.example/1"));
        store.persist().await.unwrap();

        let reloaded = SeenStore::load(&path).await.unwrap();
        let mut links: Vec<&str> = reloaded.links().collect();
        links.sort_unstable();
        assert_eq!(links, vec!["https://a.example/1", "https://b.example/2"]);
        assert!(!dir.path().join("seen.json.tmp").exists());
    }

    #[tokio::test]
    async fn persist_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        tokio::fs::write(&path, r#"["https://old.example/x", "https://old.example/y"]"#)
            .await
            .unwrap();

        let mut store = SeenStore::load(&path).await.unwrap();
        store.add("https://new.example/z");
        store.persist().await.unwrap();
        store.persist().await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let on_disk: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk.len(), 3);
    }

    #[tokio::test]
    async fn links_compare_byte_for_byte() {
        let mut store = SeenStore::new("unused.json");
        store.add("https://example.com/a");
        assert!(store.contains("https://example.com/a"));
        assert!(!store.contains("https://example.com/a/"));
        assert!(!store.contains("http://example.com/a"));
        assert!(!store.contains("https://example.com/a?utm_source=rss"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let err = SeenStore::load(&path).await.unwrap_err();
        assert!(matches!(err, MonitorError::StateLoad { .. }));
    }

    #[tokio::test]
    async fn persist_into_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("seen.json");
        let mut store = SeenStore::new(&path);
        store.add("https://example.com/a");
        store.persist().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        // a directory in place of the state file makes the final rename fail
        std::fs::create_dir(&state).unwrap();

        let mut store = SeenStore::new(&state);
        store.add("https://example.com/a");
        let err = store.persist().await.unwrap_err();

        assert!(matches!(err, MonitorError::Persist { ref path, .. } if path == &state));
        assert!(!dir.path().join("seen.json.tmp").exists());
        assert!(state.is_dir());
    }
}
