//! Day-scoped cache for tag-search results.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed memoization of tag searches.
///
/// Entries are keyed by `(day, tag, limit)` so identical queries on the
/// same calendar day cost nothing. Old days are never matched again and
/// never purged. A missing or corrupt backing file is treated as an empty
/// cache; reads and writes are best-effort and never fatal.
#[derive(Debug)]
pub struct TagCache {
    path: PathBuf,
    entries: HashMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize, Default)]
struct CacheFile(HashMap<String, Vec<String>>);

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn key(day: &str, tag: &str, limit: usize) -> String {
    format!("{}:{}:{}", day, tag, limit)
}

impl TagCache {
    /// Load the cache from disk, falling back to empty on any failure.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<CacheFile>(&contents) {
                Ok(file) => file.0,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt tag cache, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable tag cache, starting empty");
                HashMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Look up today's entry for a tag and limit.
    pub fn get(&self, tag: &str, limit: usize) -> Option<&[String]> {
        self.entries
            .get(&key(&today(), tag, limit))
            .map(|ids| ids.as_slice())
    }

    /// Record today's results for a tag and limit.
    pub fn put(&mut self, tag: &str, limit: usize, video_ids: Vec<String>) {
        self.entries.insert(key(&today(), tag, limit), video_ids);
    }

    /// Write the cache back to disk. Failures are logged and swallowed.
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %self.path.display(), error = %e, "failed to create cache directory");
                return;
            }
        }

        match serde_json::to_string(&CacheFile(self.entries.clone())) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "failed to write tag cache");
                } else {
                    debug!(entries = self.entries.len(), "tag cache saved");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize tag cache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag_cache.json");

        let mut cache = TagCache::load(&path);
        assert!(cache.get("rust", 5).is_none());

        cache.put("rust", 5, vec!["a".to_string(), "b".to_string()]);
        cache.save();

        let reloaded = TagCache::load(&path);
        assert_eq!(reloaded.get("rust", 5).unwrap(), &["a", "b"]);
    }

    #[test]
    fn test_limit_is_part_of_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TagCache::load(&dir.path().join("c.json"));

        cache.put("rust", 5, vec!["a".to_string()]);
        assert!(cache.get("rust", 10).is_none());
        assert!(cache.get("rust", 5).is_some());
    }

    #[test]
    fn test_stale_day_never_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag_cache.json");

        let mut stale = HashMap::new();
        stale.insert("2000-01-01:rust:5".to_string(), vec!["old".to_string()]);
        std::fs::write(&path, serde_json::to_string(&CacheFile(stale)).unwrap()).unwrap();

        let cache = TagCache::load(&path);
        assert!(cache.get("rust", 5).is_none());
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag_cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut cache = TagCache::load(&path);
        assert!(cache.get("rust", 5).is_none());

        // still usable after the bad load
        cache.put("rust", 5, vec!["a".to_string()]);
        cache.save();
        assert!(TagCache::load(&path).get("rust", 5).is_some());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TagCache::load(&dir.path().join("absent.json"));
        assert!(cache.get("anything", 1).is_none());
    }
}
