//! Retrieval scope policy.
//!
//! A scope is the boundary of videos a query may draw from. It gates which
//! expansion strategies run and renders into a storage-layer query filter.

mod infer;

pub use infer::ScopeClassifier;

use serde::{Deserialize, Serialize};

/// The permitted boundary of videos a retrieval query may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only the seed video.
    OneVideo,
    /// Seed plus tag-similar videos.
    SeedPlusTag,
    /// Seed plus other videos from the same channel.
    SeedPlusChannel,
    /// Seed plus any helpful related sources.
    Any,
}

impl Scope {
    /// Whether this scope permits tag-search expansion.
    pub fn allows_tag_expansion(&self) -> bool {
        matches!(self, Scope::SeedPlusTag | Scope::Any)
    }

    /// Whether this scope permits same-channel expansion.
    pub fn allows_channel_expansion(&self) -> bool {
        matches!(self, Scope::SeedPlusChannel | Scope::Any)
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one_video" => Ok(Scope::OneVideo),
            "seed_plus_tag" => Ok(Scope::SeedPlusTag),
            "seed_plus_channel" => Ok(Scope::SeedPlusChannel),
            "any" => Ok(Scope::Any),
            _ => Err(format!("Unknown scope: {}", s)),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::OneVideo => write!(f, "one_video"),
            Scope::SeedPlusTag => write!(f, "seed_plus_tag"),
            Scope::SeedPlusChannel => write!(f, "seed_plus_channel"),
            Scope::Any => write!(f, "any"),
        }
    }
}

/// Storage-layer rendering of a scope boundary. Each store backend
/// interprets the variant against its fragment payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFilter {
    /// Exactly one video.
    Video(String),
    /// All videos belonging to one channel.
    Channel(String),
    /// An explicit allow-list of videos.
    Videos(Vec<String>),
}

/// Render a scope into the filter a similarity query should apply.
///
/// Total over all four scope values; never fails. `SeedPlusTag` without an
/// explicit allow-list yields no hard filter, leaving re-ranking to bias
/// results (a documented weaker guarantee).
pub fn render_filter(
    scope: Scope,
    seed_video_id: &str,
    seed_channel_id: &str,
    allowed_video_ids: Option<&[String]>,
) -> Option<QueryFilter> {
    match scope {
        Scope::OneVideo => Some(QueryFilter::Video(seed_video_id.to_string())),
        Scope::SeedPlusChannel => Some(QueryFilter::Channel(seed_channel_id.to_string())),
        Scope::SeedPlusTag => allowed_video_ids
            .filter(|ids| !ids.is_empty())
            .map(|ids| QueryFilter::Videos(ids.to_vec())),
        Scope::Any => None,
    }
}

/// Per-question retrieval settings. Constructed once per question and
/// read-only thereafter.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    /// Resolved scope for this question.
    pub scope: Scope,
    /// Whether agent tools may expand the corpus at all.
    pub allow_expand: bool,
    /// Whether to re-rank hits with tag overlap.
    pub tag_rerank: bool,
    /// Weight for cosine similarity.
    pub rerank_alpha: f32,
    /// Weight for tag Jaccard overlap.
    pub rerank_beta: f32,
    /// Seed video tags, used by filters and re-ranking.
    pub seed_tags: Vec<String>,
    /// The seed video.
    pub seed_video_id: String,
    /// Channel of the seed video (empty if unknown).
    pub seed_channel_id: String,
    /// Optional allow-list of video IDs retrieval may use.
    pub allowed_video_ids: Option<Vec<String>>,
}

impl RetrievalContext {
    /// Render this context's scope into a query filter.
    pub fn filter(&self) -> Option<QueryFilter> {
        render_filter(
            self.scope,
            &self.seed_video_id,
            &self.seed_channel_id,
            self.allowed_video_ids.as_deref(),
        )
    }
}

impl Default for RetrievalContext {
    fn default() -> Self {
        Self {
            scope: Scope::Any,
            allow_expand: true,
            tag_rerank: true,
            rerank_alpha: 0.8,
            rerank_beta: 0.2,
            seed_tags: Vec::new(),
            seed_video_id: String::new(),
            seed_channel_id: String::new(),
            allowed_video_ids: None,
        }
    }
}
