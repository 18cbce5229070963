//! Vector store abstraction.
//!
//! Provides a trait-based interface for fragment storage backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use crate::scope::QueryFilter;
use crate::video::VideoMeta;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single indexed span of a video's transcript.
///
/// The owning video is embedded rather than referenced so fragments are
/// self-describing payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// Deterministic identity: `{video_id}#{chunk_idx}`.
    pub id: String,
    /// The owning video.
    pub video: VideoMeta,
    /// Zero-based position of this chunk within the video.
    pub chunk_idx: usize,
    /// The literal text span.
    pub text: String,
    /// Tag set inherited from the owning video.
    pub tag_set: Vec<String>,
}

impl Fragment {
    /// Build the fragment for one chunk of a video's transcript.
    pub fn new(video: &VideoMeta, chunk_idx: usize, text: String) -> Self {
        Self {
            id: Self::fragment_id(&video.video_id, chunk_idx),
            video: video.clone(),
            chunk_idx,
            text,
            tag_set: video.tags.clone(),
        }
    }

    /// Deterministic fragment identity, stable across re-indexing runs so
    /// that upserts replace instead of append.
    pub fn fragment_id(video_id: &str, chunk_idx: usize) -> String {
        format!("{}#{}", video_id, chunk_idx)
    }

    /// Whether this fragment falls inside a filter boundary.
    pub fn matches(&self, filter: &QueryFilter) -> bool {
        match filter {
            QueryFilter::Video(id) => self.video.video_id == *id,
            QueryFilter::Channel(id) => self.video.channel_id.as_deref() == Some(id.as_str()),
            QueryFilter::Videos(ids) => ids.iter().any(|v| *v == self.video.video_id),
        }
    }
}

/// A search result with similarity score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched fragment.
    pub fragment: Fragment,
    /// Cosine similarity to the query (higher is better).
    pub score: f32,
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    /// Video ID.
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// Channel name.
    pub channel: Option<String>,
    /// Number of indexed fragments.
    pub fragment_count: u32,
    /// When the video was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store fragments with their embeddings, pairwise by position.
    ///
    /// Fragment identity decides replacement: re-indexing a video with an
    /// unchanged transcript overwrites the existing rows.
    async fn upsert_batch(&self, fragments: &[Fragment], embeddings: &[Vec<f32>])
        -> Result<usize>;

    /// Similarity search returning hits in descending score order,
    /// optionally restricted to a filter boundary.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<SearchHit>>;

    /// List all indexed videos, most recently indexed first.
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>>;

    /// Check whether any fragments exist for a video.
    async fn is_video_indexed(&self, video_id: &str) -> Result<bool>;

    /// Total fragment count across all videos.
    async fn fragment_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) fn test_video(video_id: &str, channel_id: Option<&str>, tags: &[&str]) -> VideoMeta {
    VideoMeta {
        video_id: video_id.to_string(),
        title: format!("Video {}", video_id),
        channel: Some("Test Channel".to_string()),
        channel_id: channel_id.map(|s| s.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        url: VideoMeta::watch_url(video_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_fragment_identity_is_deterministic() {
        let video = test_video("abc123def45", Some("UCx"), &["rust"]);
        let first = Fragment::new(&video, 3, "text".to_string());
        let second = Fragment::new(&video, 3, "text".to_string());
        assert_eq!(first.id, "abc123def45#3");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_fragment_inherits_tags() {
        let video = test_video("vid", None, &["a", "b"]);
        let fragment = Fragment::new(&video, 0, "text".to_string());
        assert_eq!(fragment.tag_set, vec!["a", "b"]);
    }

    #[test]
    fn test_fragment_filter_matching() {
        let video = test_video("vid1", Some("UCchan"), &[]);
        let fragment = Fragment::new(&video, 0, "text".to_string());

        assert!(fragment.matches(&QueryFilter::Video("vid1".to_string())));
        assert!(!fragment.matches(&QueryFilter::Video("vid2".to_string())));
        assert!(fragment.matches(&QueryFilter::Channel("UCchan".to_string())));
        assert!(!fragment.matches(&QueryFilter::Channel("UCother".to_string())));
        assert!(fragment.matches(&QueryFilter::Videos(vec![
            "vid1".to_string(),
            "vid9".to_string()
        ])));
        assert!(!fragment.matches(&QueryFilter::Videos(vec!["vid9".to_string()])));
    }

    #[test]
    fn test_fragment_without_channel_never_matches_channel_filter() {
        let video = test_video("vid1", None, &[]);
        let fragment = Fragment::new(&video, 0, "text".to_string());
        assert!(!fragment.matches(&QueryFilter::Channel("".to_string())));
    }
}
