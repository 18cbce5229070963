//! Transcript retrieval via yt-dlp caption metadata.

use super::{RateLimiter, TranscriptProvider, VideoMeta};
use crate::error::{OmfangError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const CAPTION_LANGUAGES: [&str; 3] = ["en", "en-US", "en-GB"];

/// Transcript provider that resolves caption tracks with yt-dlp and
/// downloads the track over HTTP.
///
/// Every fetch goes through the shared rate limiter. Any failure degrades
/// to an empty transcript so that indexing can continue without one.
pub struct YtDlpTranscript {
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl YtDlpTranscript {
    pub fn new(rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rate_limiter,
        }
    }

    /// Find the URL of an English json3 caption track, manual tracks first.
    async fn caption_url(&self, video_id: &str) -> Result<Option<String>> {
        let url = VideoMeta::watch_url(video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args(["--dump-json", "--no-download", "--no-warnings", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OmfangError::ToolNotFound("yt-dlp".to_string())
                } else {
                    OmfangError::Transcript(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OmfangError::ToolFailed(format!(
                "yt-dlp failed for {}: {}",
                video_id, stderr
            )));
        }

        let json: serde_json::Value =
            serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

        for field in ["subtitles", "automatic_captions"] {
            for lang in CAPTION_LANGUAGES {
                if let Some(tracks) = json[field][lang].as_array() {
                    let track_url = tracks
                        .iter()
                        .find(|t| t["ext"].as_str() == Some("json3"))
                        .and_then(|t| t["url"].as_str());
                    if let Some(track_url) = track_url {
                        return Ok(Some(track_url.to_string()));
                    }
                }
            }
        }

        Ok(None)
    }

    async fn fetch_inner(&self, video_id: &str) -> Result<String> {
        let track_url = match self.caption_url(video_id).await? {
            Some(url) => url,
            None => return Ok(String::new()),
        };

        let response = self.client.get(&track_url).send().await?;
        if !response.status().is_success() {
            return Err(OmfangError::Transcript(format!(
                "Caption download for {} returned {}",
                video_id,
                response.status()
            )));
        }

        let track: serde_json::Value = response.json().await?;
        Ok(join_segments(&track))
    }
}

/// Join the text segments of a json3 caption track with single spaces.
fn join_segments(track: &serde_json::Value) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(events) = track["events"].as_array() {
        for event in events {
            if let Some(segs) = event["segs"].as_array() {
                for seg in segs {
                    if let Some(text) = seg["utf8"].as_str() {
                        let text = text.trim();
                        if !text.is_empty() {
                            parts.push(text);
                        }
                    }
                }
            }
        }
    }
    parts.join(" ")
}

#[async_trait]
impl TranscriptProvider for YtDlpTranscript {
    #[instrument(skip(self))]
    async fn fetch_text(&self, video_id: &str) -> Result<String> {
        self.rate_limiter.wait_if_needed().await;

        match self.fetch_inner(video_id).await {
            Ok(text) => {
                debug!(chars = text.len(), "transcript fetched");
                Ok(text)
            }
            Err(e) => {
                warn!(video_id, error = %e, "transcript unavailable, continuing without one");
                Ok(String::new())
            }
        }
    }
}
