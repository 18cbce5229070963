//! Retrieval-augmented answering over indexed transcript fragments.

pub mod context;
pub mod rank;
mod response;

pub use context::Retriever;
pub use response::{RagEngine, RagResponse};

use crate::vector_store::SearchHit;

/// A retrieved fragment with the fields the prompt and display need.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Video ID.
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// Channel name.
    pub channel: Option<String>,
    /// Fragment text.
    pub text: String,
    /// Similarity score (cosine, before any re-ranking).
    pub score: f32,
    /// Watch URL.
    pub url: String,
}

impl From<SearchHit> for ContextChunk {
    fn from(hit: SearchHit) -> Self {
        Self {
            video_id: hit.fragment.video.video_id,
            title: hit.fragment.video.title,
            channel: hit.fragment.video.channel,
            text: hit.fragment.text,
            score: hit.score,
            url: hit.fragment.video.url,
        }
    }
}
