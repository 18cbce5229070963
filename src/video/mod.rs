//! Video metadata and transcript providers.
//!
//! Provides trait-based interfaces for fetching video metadata, listing
//! channel uploads, tag search, and transcript retrieval.

mod rate_limit;
mod transcript;
mod youtube;

pub use rate_limit::RateLimiter;
pub use transcript::YtDlpTranscript;
pub use youtube::YouTubeDataApi;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Metadata about a YouTube video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMeta {
    /// Video ID (the 11-character watch ID).
    pub video_id: String,
    /// Title.
    pub title: String,
    /// Channel name (if available).
    pub channel: Option<String>,
    /// Channel ID (required for same-channel expansion).
    pub channel_id: Option<String>,
    /// Normalized tags: lowercased, whitespace-collapsed, deduplicated, sorted.
    pub tags: Vec<String>,
    /// Canonical watch URL.
    pub url: String,
}

impl VideoMeta {
    /// Canonical watch URL for a video ID.
    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn video_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .unwrap()
    })
}

fn channel_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^UC[a-zA-Z0-9_-]{22}$").unwrap())
}

/// Extract a video ID from a YouTube URL or bare 11-character ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_re().captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Check whether a string is a canonical `UC...` channel ID.
pub fn is_valid_channel_id(channel_id: &str) -> bool {
    channel_id_re().is_match(channel_id)
}

/// Normalize tags: lowercase, collapse inner whitespace, trim, drop empties,
/// deduplicate, sort.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = std::collections::BTreeSet::new();
    for tag in tags {
        let collapsed = whitespace_re().replace_all(tag.as_ref(), " ");
        let normalized = collapsed.trim().to_lowercase();
        if !normalized.is_empty() {
            set.insert(normalized);
        }
    }
    set.into_iter().collect()
}

/// Trait for video metadata providers.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Fetch metadata for a video by ID.
    async fn fetch_meta(&self, video_id: &str) -> Result<VideoMeta>;

    /// List recent upload IDs for a channel. The seed video is not excluded
    /// here; callers filter it out.
    async fn list_channel_uploads(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<String>>;

    /// Search for video IDs matching a single tag, ordered by relevance.
    async fn search_by_tag(&self, tag: &str, max_results: usize) -> Result<Vec<String>>;
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch the full transcript text for a video.
    ///
    /// An empty string means no transcript is available; that is not an
    /// error condition.
    async fn fetch_text(&self, video_id: &str) -> Result<String>;
}
