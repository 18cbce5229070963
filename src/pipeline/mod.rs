//! Indexing pipeline.
//!
//! Coordinates the process from metadata fetch to fragment indexing.

use crate::chunking::chunk_text;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{Fragment, VectorStore};
use crate::video::{TranscriptProvider, VideoMeta, VideoProvider};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Default maximum chunk size in characters.
pub const DEFAULT_CHUNK_CHARS: usize = 1000;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Result of indexing one video.
#[derive(Debug)]
pub struct IndexOutcome {
    /// Video ID.
    pub video_id: String,
    /// Title.
    pub title: String,
    /// Number of fragments indexed.
    pub fragments_indexed: usize,
    /// Whether indexing was skipped (already indexed).
    pub skipped: bool,
}

/// Runs the metadata, transcript, chunking and embedding steps for a video
/// and upserts the result into the vector store.
pub struct Indexer {
    provider: Arc<dyn VideoProvider>,
    transcripts: Arc<dyn TranscriptProvider>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    max_chars: usize,
    overlap: usize,
}

impl Indexer {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        transcripts: Arc<dyn TranscriptProvider>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            provider,
            transcripts,
            embedder,
            store,
            max_chars: DEFAULT_CHUNK_CHARS,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Override the chunking window.
    pub fn with_chunking(mut self, max_chars: usize, overlap: usize) -> Self {
        self.max_chars = max_chars;
        self.overlap = overlap;
        self
    }

    /// Fetch metadata for a video without indexing it.
    pub async fn fetch_meta(&self, video_id: &str) -> Result<VideoMeta> {
        self.provider.fetch_meta(video_id).await
    }

    /// Index a video: fetch metadata and transcript, chunk, embed, upsert.
    ///
    /// Already-indexed videos are skipped unless `force` is set. A video
    /// without a transcript indexes zero fragments and is not an error.
    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn index(&self, video_id: &str, force: bool) -> Result<IndexOutcome> {
        if !force && self.store.is_video_indexed(video_id).await? {
            info!("Video {} is already indexed, skipping", video_id);
            return Ok(IndexOutcome {
                video_id: video_id.to_string(),
                title: "Already indexed".to_string(),
                fragments_indexed: 0,
                skipped: true,
            });
        }

        let meta = self.provider.fetch_meta(video_id).await?;
        info!("Indexing '{}'", meta.title);

        let transcript = self.transcripts.fetch_text(video_id).await?;
        if transcript.trim().is_empty() {
            warn!(video_id, "no transcript available, indexing zero fragments");
            return Ok(IndexOutcome {
                video_id: meta.video_id,
                title: meta.title,
                fragments_indexed: 0,
                skipped: false,
            });
        }

        let chunks = chunk_text(&transcript, self.max_chars, self.overlap);
        let fragments: Vec<Fragment> = chunks
            .iter()
            .enumerate()
            .map(|(idx, text)| Fragment::new(&meta, idx, text.clone()))
            .collect();

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        let count = self.store.upsert_batch(&fragments, &embeddings).await?;

        info!("Indexed {} fragments for {}", count, video_id);

        Ok(IndexOutcome {
            video_id: meta.video_id,
            title: meta.title,
            fragments_indexed: count,
            skipped: false,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::OmfangError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned metadata and transcript provider for pipeline tests.
    #[derive(Default)]
    pub struct FakeProvider {
        pub videos: HashMap<String, VideoMeta>,
        pub channel_uploads: HashMap<String, Vec<String>>,
        pub tag_hits: HashMap<String, Vec<String>>,
        pub search_calls: Mutex<usize>,
        /// When set, tag searches beyond this many calls return QuotaExceeded.
        pub quota_after: Option<usize>,
    }

    impl FakeProvider {
        pub fn with_video(mut self, meta: VideoMeta) -> Self {
            self.videos.insert(meta.video_id.clone(), meta);
            self
        }
    }

    #[async_trait]
    impl VideoProvider for FakeProvider {
        async fn fetch_meta(&self, video_id: &str) -> Result<VideoMeta> {
            self.videos
                .get(video_id)
                .cloned()
                .ok_or_else(|| OmfangError::VideoNotFound(video_id.to_string()))
        }

        async fn list_channel_uploads(
            &self,
            channel_id: &str,
            max_results: usize,
        ) -> Result<Vec<String>> {
            let mut ids = self
                .channel_uploads
                .get(channel_id)
                .cloned()
                .unwrap_or_default();
            ids.truncate(max_results);
            Ok(ids)
        }

        async fn search_by_tag(&self, tag: &str, max_results: usize) -> Result<Vec<String>> {
            let calls = {
                let mut calls = self.search_calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if let Some(limit) = self.quota_after {
                if calls > limit {
                    return Err(OmfangError::QuotaExceeded("daily quota".to_string()));
                }
            }
            let mut ids = self.tag_hits.get(tag).cloned().unwrap_or_default();
            ids.truncate(max_results);
            Ok(ids)
        }
    }

    /// Transcript provider returning canned text, empty when unset.
    #[derive(Default)]
    pub struct FakeTranscripts {
        pub texts: HashMap<String, String>,
    }

    #[async_trait]
    impl TranscriptProvider for FakeTranscripts {
        async fn fetch_text(&self, video_id: &str) -> Result<String> {
            Ok(self.texts.get(video_id).cloned().unwrap_or_default())
        }
    }

    /// Deterministic embedder: a tiny vector derived from text bytes.
    pub struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let sum: u32 = text.bytes().map(u32::from).sum();
            Ok(vec![1.0, (sum % 97) as f32 / 97.0, text.len() as f32])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    pub fn meta(video_id: &str, channel_id: Option<&str>, tags: &[&str]) -> VideoMeta {
        VideoMeta {
            video_id: video_id.to_string(),
            title: format!("Video {}", video_id),
            channel: Some("Channel".to_string()),
            channel_id: channel_id.map(|s| s.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            url: VideoMeta::watch_url(video_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::vector_store::MemoryVectorStore;

    fn indexer_with(
        provider: FakeProvider,
        transcripts: FakeTranscripts,
        store: Arc<MemoryVectorStore>,
    ) -> Indexer {
        Indexer::new(
            Arc::new(provider),
            Arc::new(transcripts),
            Arc::new(FakeEmbedder),
            store,
        )
    }

    #[tokio::test]
    async fn test_index_produces_fragments() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = FakeProvider::default().with_video(meta("vid1", None, &["rust"]));
        let mut transcripts = FakeTranscripts::default();
        transcripts
            .texts
            .insert("vid1".to_string(), "word ".repeat(600));

        let indexer =
            indexer_with(provider, transcripts, store.clone()).with_chunking(1000, 150);
        let outcome = indexer.index("vid1", false).await.unwrap();

        assert!(!outcome.skipped);
        assert!(outcome.fragments_indexed > 1);
        assert_eq!(
            store.fragment_count().await.unwrap(),
            outcome.fragments_indexed
        );
    }

    #[tokio::test]
    async fn test_index_without_transcript_is_empty_success() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = FakeProvider::default().with_video(meta("vid1", None, &[]));

        let indexer = indexer_with(provider, FakeTranscripts::default(), store.clone());
        let outcome = indexer.index("vid1", false).await.unwrap();

        assert!(!outcome.skipped);
        assert_eq!(outcome.fragments_indexed, 0);
        assert_eq!(store.fragment_count().await.unwrap(), 0);
        assert!(!store.is_video_indexed("vid1").await.unwrap());
    }

    #[tokio::test]
    async fn test_index_skips_when_already_indexed() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = FakeProvider::default().with_video(meta("vid1", None, &[]));
        let mut transcripts = FakeTranscripts::default();
        transcripts
            .texts
            .insert("vid1".to_string(), "short transcript".to_string());

        let indexer = indexer_with(provider, transcripts, store.clone());
        let first = indexer.index("vid1", false).await.unwrap();
        assert_eq!(first.fragments_indexed, 1);

        let second = indexer.index("vid1", false).await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.fragments_indexed, 0);
        assert_eq!(store.fragment_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_force_reindexes() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = FakeProvider::default().with_video(meta("vid1", None, &[]));
        let mut transcripts = FakeTranscripts::default();
        transcripts
            .texts
            .insert("vid1".to_string(), "short transcript".to_string());

        let indexer = indexer_with(provider, transcripts, store.clone());
        indexer.index("vid1", false).await.unwrap();

        let outcome = indexer.index("vid1", true).await.unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.fragments_indexed, 1);
        assert_eq!(store.fragment_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_unknown_video_fails() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer_with(FakeProvider::default(), FakeTranscripts::default(), store);

        assert!(indexer.index("missing", false).await.is_err());
    }
}
