//! In-memory vector store for tests and ephemeral sessions.

use super::{cosine_similarity, Fragment, IndexedVideo, SearchHit, VectorStore};
use crate::error::{OmfangError, Result};
use crate::scope::QueryFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredFragment {
    fragment: Fragment,
    embedding: Vec<f32>,
    indexed_at: DateTime<Utc>,
}

/// Vector store that keeps everything in a `HashMap`.
///
/// Rows are keyed by fragment identity, so re-indexing an unchanged video
/// replaces rows instead of appending.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    fragments: RwLock<HashMap<String, StoredFragment>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, StoredFragment>> {
        match self.fragments.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, StoredFragment>> {
        match self.fragments.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(
        &self,
        fragments: &[Fragment],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        if fragments.len() != embeddings.len() {
            return Err(OmfangError::InvalidInput(format!(
                "Fragment/embedding count mismatch: {} vs {}",
                fragments.len(),
                embeddings.len()
            )));
        }

        let now = Utc::now();
        let mut store = self.write();
        for (fragment, embedding) in fragments.iter().zip(embeddings.iter()) {
            store.insert(
                fragment.id.clone(),
                StoredFragment {
                    fragment: fragment.clone(),
                    embedding: embedding.clone(),
                    indexed_at: now,
                },
            );
        }

        Ok(fragments.len())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<SearchHit>> {
        let store = self.read();

        let mut hits: Vec<SearchHit> = store
            .values()
            .filter(|stored| filter.map_or(true, |f| stored.fragment.matches(f)))
            .map(|stored| SearchHit {
                fragment: stored.fragment.clone(),
                score: cosine_similarity(embedding, &stored.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let store = self.read();

        let mut by_video: HashMap<String, IndexedVideo> = HashMap::new();
        for stored in store.values() {
            let video = &stored.fragment.video;
            let entry = by_video
                .entry(video.video_id.clone())
                .or_insert_with(|| IndexedVideo {
                    video_id: video.video_id.clone(),
                    title: video.title.clone(),
                    channel: video.channel.clone(),
                    fragment_count: 0,
                    indexed_at: stored.indexed_at,
                });
            entry.fragment_count += 1;
            if stored.indexed_at > entry.indexed_at {
                entry.indexed_at = stored.indexed_at;
            }
        }

        let mut videos: Vec<IndexedVideo> = by_video.into_values().collect();
        videos.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));

        Ok(videos)
    }

    async fn is_video_indexed(&self, video_id: &str) -> Result<bool> {
        Ok(self
            .read()
            .values()
            .any(|stored| stored.fragment.video.video_id == video_id))
    }

    async fn fragment_count(&self) -> Result<usize> {
        Ok(self.read().len())
    }
}
