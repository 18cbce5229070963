//! YouTube Data API v3 provider.

use super::{is_valid_channel_id, normalize_tags, VideoMeta, VideoProvider};
use crate::error::{OmfangError, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Video metadata provider backed by the YouTube Data API v3.
///
/// Channel enumeration goes through the uploads playlist rather than the
/// search endpoint because playlistItems costs a fraction of the quota.
pub struct YouTubeDataApi {
    client: reqwest::Client,
    api_key: String,
}

impl YouTubeDataApi {
    /// Create a provider. The API key comes from the argument or the
    /// `YOUTUBE_API_KEY` environment variable; a missing key is a
    /// configuration error.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("YOUTUBE_API_KEY").ok())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                OmfangError::Config(
                    "YouTube API key not set. Set youtube.api_key in config or the YOUTUBE_API_KEY environment variable."
                        .to_string(),
                )
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }

    async fn get_json(&self, resource: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{}/{}", API_BASE, resource);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::FORBIDDEN && body.to_lowercase().contains("quota") {
                return Err(OmfangError::QuotaExceeded(format!(
                    "YouTube API quota exhausted on {}",
                    resource
                )));
            }
            return Err(OmfangError::Metadata(format!(
                "YouTube API {} returned {}: {}",
                resource, status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Resolve the playlist that contains all uploads for a channel.
    async fn uploads_playlist_id(&self, channel_id: &str) -> Result<Option<String>> {
        let json = self
            .get_json("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .await?;

        let playlist = json["items"]
            .get(0)
            .and_then(|item| item["contentDetails"]["relatedPlaylists"]["uploads"].as_str())
            .map(|s| s.to_string());
        Ok(playlist)
    }
}

#[async_trait]
impl VideoProvider for YouTubeDataApi {
    #[instrument(skip(self))]
    async fn fetch_meta(&self, video_id: &str) -> Result<VideoMeta> {
        let json = self
            .get_json("videos", &[("part", "snippet"), ("id", video_id)])
            .await?;

        let snippet = json["items"]
            .get(0)
            .map(|item| &item["snippet"])
            .ok_or_else(|| OmfangError::VideoNotFound(video_id.to_string()))?;

        let tags = snippet["tags"]
            .as_array()
            .map(|arr| normalize_tags(arr.iter().filter_map(|t| t.as_str())))
            .unwrap_or_default();

        let meta = VideoMeta {
            video_id: video_id.to_string(),
            title: snippet["title"].as_str().unwrap_or("").to_string(),
            channel: snippet["channelTitle"].as_str().map(|s| s.to_string()),
            channel_id: snippet["channelId"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            tags,
            url: VideoMeta::watch_url(video_id),
        };

        debug!(title = %meta.title, tags = meta.tags.len(), "fetched video metadata");
        Ok(meta)
    }

    #[instrument(skip(self))]
    async fn list_channel_uploads(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<String>> {
        if !is_valid_channel_id(channel_id) {
            return Err(OmfangError::InvalidInput(format!(
                "Invalid channel ID '{}'. Expected a UC... YouTube channel ID.",
                channel_id
            )));
        }

        let uploads = match self.uploads_playlist_id(channel_id).await? {
            Some(playlist_id) => playlist_id,
            None => return Ok(Vec::new()),
        };

        // playlistItems pages top out at 50
        let capped = max_results.min(50).to_string();
        let json = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", uploads.as_str()),
                    ("maxResults", capped.as_str()),
                ],
            )
            .await?;

        let ids: Vec<String> = json["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        item["contentDetails"]["videoId"]
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(channel_id, uploads = ids.len(), "listed channel uploads");
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn search_by_tag(&self, tag: &str, max_results: usize) -> Result<Vec<String>> {
        let max = max_results.to_string();
        let json = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("q", tag),
                    ("maxResults", max.as_str()),
                    ("order", "relevance"),
                ],
            )
            .await?;

        let ids: Vec<String> = json["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["id"]["videoId"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        debug!(tag, hits = ids.len(), "tag search complete");
        Ok(ids)
    }
}
