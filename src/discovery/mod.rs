//! Corpus discovery: tag search and channel-uploads enumeration.
//!
//! Finds videos related to a seed and feeds them through the indexing
//! pipeline, gated by the retrieval scope.

mod cache;

pub use cache::TagCache;

use crate::error::{OmfangError, Result};
use crate::pipeline::Indexer;
use crate::scope::Scope;
use crate::video::{is_valid_channel_id, VideoMeta, VideoProvider};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of results requested per tag search.
pub const DEFAULT_PER_TAG: usize = 5;
/// Default cap on channel-uploads enumeration.
pub const DEFAULT_CHANNEL_MAX: usize = 25;
/// Default budget of external tag-search calls per invocation.
pub const DEFAULT_MAX_SEARCH_CALLS: usize = 2;

/// How many of the seed's tags are considered for tag search.
const TAGS_CONSIDERED: usize = 3;

/// Concurrent indexing fan-out during expansion.
const INDEX_CONCURRENCY: usize = 4;

/// Remove duplicates while keeping the first occurrence of each id.
pub fn dedup_preserve_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Finds related videos via tag search and channel enumeration.
///
/// Tag searches are memoized per calendar day through [`TagCache`] and
/// capped at `max_search_calls` external calls per invocation.
pub struct DiscoveryEngine {
    provider: Arc<dyn VideoProvider>,
    cache_path: PathBuf,
    per_tag: usize,
    channel_max: usize,
    max_search_calls: usize,
}

impl DiscoveryEngine {
    pub fn new(provider: Arc<dyn VideoProvider>, cache_path: PathBuf) -> Self {
        Self {
            provider,
            cache_path,
            per_tag: DEFAULT_PER_TAG,
            channel_max: DEFAULT_CHANNEL_MAX,
            max_search_calls: DEFAULT_MAX_SEARCH_CALLS,
        }
    }

    /// Override the discovery limits.
    pub fn with_limits(
        mut self,
        per_tag: usize,
        channel_max: usize,
        max_search_calls: usize,
    ) -> Self {
        self.per_tag = per_tag;
        self.channel_max = channel_max;
        self.max_search_calls = max_search_calls;
        self
    }

    /// Search for videos matching the seed's first few tags.
    ///
    /// Cached results are free; at most `max_search_calls` external calls
    /// are made. A quota error stops the remaining tags without failing,
    /// returning whatever was gathered so far. Other per-tag failures skip
    /// that tag.
    #[instrument(skip(self, tags), fields(tags = tags.len()))]
    pub async fn search_by_tags(&self, tags: &[String]) -> Vec<String> {
        let mut cache = TagCache::load(&self.cache_path);
        let mut found = Vec::new();
        let mut calls_made = 0;

        for tag in tags.iter().take(TAGS_CONSIDERED) {
            if let Some(cached) = cache.get(tag, self.per_tag) {
                debug!(tag, "tag cache hit");
                found.extend_from_slice(cached);
                continue;
            }

            if calls_made >= self.max_search_calls {
                debug!(tag, "search budget exhausted, skipping");
                continue;
            }

            match self.provider.search_by_tag(tag, self.per_tag).await {
                Ok(ids) => {
                    calls_made += 1;
                    cache.put(tag, self.per_tag, ids.clone());
                    found.extend(ids);
                }
                Err(OmfangError::QuotaExceeded(msg)) => {
                    warn!(tag, %msg, "search quota exceeded, stopping tag search");
                    break;
                }
                Err(e) => {
                    warn!(tag, error = %e, "tag search failed, skipping tag");
                }
            }
        }

        cache.save();
        found
    }

    /// List recent uploads of a channel, excluding the seed video.
    ///
    /// The channel id must be a canonical `UC…` id.
    #[instrument(skip(self))]
    pub async fn channel_uploads(
        &self,
        channel_id: &str,
        seed_video_id: &str,
    ) -> Result<Vec<String>> {
        if !is_valid_channel_id(channel_id) {
            return Err(OmfangError::InvalidInput(format!(
                "Invalid channel ID: {}",
                channel_id
            )));
        }

        let ids = self
            .provider
            .list_channel_uploads(channel_id, self.channel_max)
            .await?;

        Ok(ids.into_iter().filter(|id| id != seed_video_id).collect())
    }

    /// Union of channel uploads and tag search for a seed, minus the seed
    /// itself, deduplicated preserving first-seen order.
    #[instrument(skip(self, seed), fields(video_id = %seed.video_id))]
    pub async fn discover(&self, seed: &VideoMeta) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        if let Some(channel_id) = seed.channel_id.as_deref() {
            ids.extend(self.channel_uploads(channel_id, &seed.video_id).await?);
        }

        ids.extend(self.search_by_tags(&seed.tags).await);
        ids.retain(|id| *id != seed.video_id);

        Ok(dedup_preserve_order(ids))
    }

    /// Run only the strategies the scope permits: channel uploads first,
    /// then tag search. A failing channel strategy degrades to no channel
    /// results rather than aborting the tag strategy.
    async fn discover_within(&self, scope: Scope, seed: &VideoMeta) -> Vec<String> {
        let mut ids = Vec::new();

        if scope.allows_channel_expansion() {
            if let Some(channel_id) = seed.channel_id.as_deref() {
                match self.channel_uploads(channel_id, &seed.video_id).await {
                    Ok(uploads) => ids.extend(uploads),
                    Err(e) => warn!(error = %e, "channel expansion failed, continuing"),
                }
            }
        }

        if scope.allows_tag_expansion() {
            ids.extend(self.search_by_tags(&seed.tags).await);
        }

        ids.retain(|id| *id != seed.video_id);
        dedup_preserve_order(ids)
    }
}

/// Result of one scope-gated expansion.
#[derive(Debug)]
pub struct ExpandOutcome {
    /// Discovered video ids in first-seen order.
    pub video_ids: Vec<String>,
    /// How many discovered videos were indexed (or already present).
    pub indexed: usize,
    /// How many discovered videos failed to index.
    pub failed: usize,
}

/// Discovers related videos within a scope and indexes each of them.
pub struct Expander {
    engine: DiscoveryEngine,
    indexer: Arc<Indexer>,
}

impl Expander {
    pub fn new(engine: DiscoveryEngine, indexer: Arc<Indexer>) -> Self {
        Self { engine, indexer }
    }

    /// Expand the corpus around a seed, honoring the scope's permission
    /// table. Per-item indexing failures are counted, never fatal.
    #[instrument(skip(self, seed), fields(%scope, video_id = %seed.video_id))]
    pub async fn expand(&self, scope: Scope, seed: &VideoMeta) -> ExpandOutcome {
        let video_ids = self.engine.discover_within(scope, seed).await;

        let mut indexed = 0;
        let mut failed = 0;

        let mut results = stream::iter(video_ids.clone())
            .map(|id| {
                let indexer = self.indexer.clone();
                async move { (id.clone(), indexer.index(&id, false).await) }
            })
            .buffer_unordered(INDEX_CONCURRENCY);

        while let Some((id, result)) = results.next().await {
            match result {
                Ok(_) => indexed += 1,
                Err(e) => {
                    warn!(video_id = %id, error = %e, "failed to index discovered video");
                    failed += 1;
                }
            }
        }

        info!(
            discovered = video_ids.len(),
            indexed, failed, "expansion complete"
        );

        ExpandOutcome {
            video_ids,
            indexed,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{meta, FakeEmbedder, FakeProvider, FakeTranscripts};
    use crate::vector_store::{MemoryVectorStore, VectorStore};

    fn cache_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("tag_cache.json")
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_preserve_order() {
        let ids = strings(&["a", "b", "a", "c", "b"]);
        assert_eq!(dedup_preserve_order(ids), strings(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_tag_search_respects_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider.tag_hits.insert("t1".to_string(), strings(&["a"]));
        provider.tag_hits.insert("t2".to_string(), strings(&["b"]));
        provider.tag_hits.insert("t3".to_string(), strings(&["c"]));
        let provider = Arc::new(provider);

        let engine = DiscoveryEngine::new(provider.clone(), cache_path(&dir))
            .with_limits(5, 25, 2);

        let found = engine
            .search_by_tags(&strings(&["t1", "t2", "t3"]))
            .await;

        assert_eq!(found, strings(&["a", "b"]));
        assert_eq!(*provider.search_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_tag_search_considers_first_three_tags_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        for tag in ["t1", "t2", "t3", "t4"] {
            provider
                .tag_hits
                .insert(tag.to_string(), strings(&[&format!("{}-hit", tag)]));
        }
        let provider = Arc::new(provider);

        let engine = DiscoveryEngine::new(provider.clone(), cache_path(&dir))
            .with_limits(5, 25, 10);

        let found = engine
            .search_by_tags(&strings(&["t1", "t2", "t3", "t4"]))
            .await;

        assert_eq!(found, strings(&["t1-hit", "t2-hit", "t3-hit"]));
        assert_eq!(*provider.search_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_tag_search_cache_avoids_external_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(&dir);
        let mut provider = FakeProvider::default();
        provider.tag_hits.insert("rust".to_string(), strings(&["a"]));
        let provider = Arc::new(provider);

        let engine = DiscoveryEngine::new(provider.clone(), path.clone());
        let first = engine.search_by_tags(&strings(&["rust"])).await;
        assert_eq!(first, strings(&["a"]));
        assert_eq!(*provider.search_calls.lock().unwrap(), 1);

        // same day, same tag, same limit: served from the cache file
        let engine = DiscoveryEngine::new(provider.clone(), path);
        let second = engine.search_by_tags(&strings(&["rust"])).await;
        assert_eq!(second, strings(&["a"]));
        assert_eq!(*provider.search_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tag_search_quota_stops_remaining_tags() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider.tag_hits.insert("t1".to_string(), strings(&["a"]));
        provider.tag_hits.insert("t2".to_string(), strings(&["b"]));
        provider.quota_after = Some(1);
        let provider = Arc::new(provider);

        let engine = DiscoveryEngine::new(provider.clone(), cache_path(&dir))
            .with_limits(5, 25, 3);

        let found = engine
            .search_by_tags(&strings(&["t1", "t2", "t3"]))
            .await;

        // partial results, no error, and the third tag was never attempted
        assert_eq!(found, strings(&["a"]));
        assert_eq!(*provider.search_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_channel_uploads_excludes_seed_and_validates_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider.channel_uploads.insert(
            "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            strings(&["seed", "v1", "v2"]),
        );
        let provider = Arc::new(provider);

        let engine = DiscoveryEngine::new(provider, cache_path(&dir));

        let uploads = engine
            .channel_uploads("UCaaaaaaaaaaaaaaaaaaaaaa", "seed")
            .await
            .unwrap();
        assert_eq!(uploads, strings(&["v1", "v2"]));

        assert!(engine.channel_uploads("not-a-channel", "seed").await.is_err());
    }

    #[tokio::test]
    async fn test_discover_unions_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider.channel_uploads.insert(
            "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            strings(&["v1", "v2"]),
        );
        provider
            .tag_hits
            .insert("rust".to_string(), strings(&["v2", "v3", "seed"]));
        let provider = Arc::new(provider);

        let engine = DiscoveryEngine::new(provider, cache_path(&dir));
        let seed = meta("seed", Some("UCaaaaaaaaaaaaaaaaaaaaaa"), &["rust"]);

        let ids = engine.discover(&seed).await.unwrap();
        assert_eq!(ids, strings(&["v1", "v2", "v3"]));
    }

    fn expander_with(provider: Arc<FakeProvider>, dir: &tempfile::TempDir) -> (Expander, Arc<MemoryVectorStore>) {
        let store = Arc::new(MemoryVectorStore::new());
        let mut transcripts = FakeTranscripts::default();
        for id in ["v1", "v2", "v3"] {
            transcripts
                .texts
                .insert(id.to_string(), format!("transcript for {}", id));
        }

        let indexer = Arc::new(Indexer::new(
            provider.clone(),
            Arc::new(transcripts),
            Arc::new(FakeEmbedder),
            store.clone(),
        ));
        let engine = DiscoveryEngine::new(provider, cache_path(dir));

        (Expander::new(engine, indexer), store)
    }

    #[tokio::test]
    async fn test_expand_one_video_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider
            .tag_hits
            .insert("rust".to_string(), strings(&["v1"]));
        let provider = Arc::new(provider);

        let (expander, store) = expander_with(provider.clone(), &dir);
        let seed = meta("seed", Some("UCaaaaaaaaaaaaaaaaaaaaaa"), &["rust"]);

        let outcome = expander.expand(Scope::OneVideo, &seed).await;

        assert!(outcome.video_ids.is_empty());
        assert_eq!(outcome.indexed, 0);
        assert_eq!(*provider.search_calls.lock().unwrap(), 0);
        assert_eq!(store.fragment_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expand_channel_scope_skips_tag_search() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider.channel_uploads.insert(
            "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            strings(&["v1"]),
        );
        provider
            .tag_hits
            .insert("rust".to_string(), strings(&["v2"]));
        provider.videos.insert("v1".to_string(), meta("v1", None, &[]));
        let provider = Arc::new(provider);

        let (expander, store) = expander_with(provider.clone(), &dir);
        let seed = meta("seed", Some("UCaaaaaaaaaaaaaaaaaaaaaa"), &["rust"]);

        let outcome = expander.expand(Scope::SeedPlusChannel, &seed).await;

        assert_eq!(outcome.video_ids, strings(&["v1"]));
        assert_eq!(outcome.indexed, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(*provider.search_calls.lock().unwrap(), 0);
        assert!(store.is_video_indexed("v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expand_any_runs_channel_before_tags() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider.channel_uploads.insert(
            "UCaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            strings(&["v1"]),
        );
        provider
            .tag_hits
            .insert("rust".to_string(), strings(&["v2", "v1"]));
        for id in ["v1", "v2"] {
            provider.videos.insert(id.to_string(), meta(id, None, &[]));
        }
        let provider = Arc::new(provider);

        let (expander, _store) = expander_with(provider, &dir);
        let seed = meta("seed", Some("UCaaaaaaaaaaaaaaaaaaaaaa"), &["rust"]);

        let outcome = expander.expand(Scope::Any, &seed).await;

        assert_eq!(outcome.video_ids, strings(&["v1", "v2"]));
        assert_eq!(outcome.indexed, 2);
    }

    #[tokio::test]
    async fn test_expand_counts_per_item_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FakeProvider::default();
        provider
            .tag_hits
            .insert("rust".to_string(), strings(&["v1", "missing"]));
        provider.videos.insert("v1".to_string(), meta("v1", None, &[]));
        // "missing" has no metadata, so its indexing fails
        let provider = Arc::new(provider);

        let (expander, store) = expander_with(provider, &dir);
        let seed = meta("seed", None, &["rust"]);

        let outcome = expander.expand(Scope::SeedPlusTag, &seed).await;

        assert_eq!(outcome.video_ids, strings(&["v1", "missing"]));
        assert_eq!(outcome.indexed, 1);
        assert_eq!(outcome.failed, 1);
        assert!(store.is_video_indexed("v1").await.unwrap());
    }
}
