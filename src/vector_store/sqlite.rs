//! SQLite-based vector store.
//!
//! Cosine similarity is computed in Rust over all candidate rows. For large
//! corpora consider the sqlite-vec extension or a dedicated vector database.

use super::{cosine_similarity, Fragment, IndexedVideo, SearchHit, VectorStore};
use crate::error::{OmfangError, Result};
use crate::scope::QueryFilter;
use crate::video::VideoMeta;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS fragments (
    id TEXT PRIMARY KEY,
    fragment_id TEXT NOT NULL,
    video_id TEXT NOT NULL,
    title TEXT NOT NULL,
    channel TEXT,
    channel_id TEXT,
    tags TEXT NOT NULL,
    url TEXT NOT NULL,
    chunk_idx INTEGER NOT NULL,
    content TEXT NOT NULL,
    tag_set TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fragments_video_id ON fragments(video_id);
CREATE INDEX IF NOT EXISTS idx_fragments_channel_id ON fragments(channel_id);
"#;

/// SQLite-backed vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Stable row key derived from the fragment identity, so the same chunk
    /// of the same video always maps to the same row.
    fn row_id(video_id: &str, chunk_idx: usize) -> String {
        let name = format!("yt::{}::{}", video_id, chunk_idx);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_fragment(row: &Row<'_>) -> rusqlite::Result<(Fragment, Vec<f32>)> {
        let tags_json: String = row.get(6)?;
        let tag_set_json: String = row.get(10)?;
        let embedding_bytes: Vec<u8> = row.get(11)?;
        let chunk_idx: i64 = row.get(8)?;

        let video = VideoMeta {
            video_id: row.get(2)?,
            title: row.get(3)?,
            channel: row.get(4)?,
            channel_id: row.get(5)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            url: row.get(7)?,
        };

        let fragment = Fragment {
            id: row.get(1)?,
            video,
            chunk_idx: chunk_idx as usize,
            text: row.get(9)?,
            tag_set: serde_json::from_str(&tag_set_json).unwrap_or_default(),
        };

        Ok((fragment, Self::bytes_to_embedding(&embedding_bytes)))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, fragments, embeddings))]
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

        let conn = self
            .conn
            .lock()
            .map_err(|e| OmfangError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for (fragment, embedding) in fragments.iter().zip(embeddings.iter()) {
            let tags_json = serde_json::to_string(&fragment.video.tags)?;
            let tag_set_json = serde_json::to_string(&fragment.tag_set)?;

            tx.execute(
                r#"
                INSERT OR REPLACE INTO fragments
                (id, fragment_id, video_id, title, channel, channel_id, tags, url,
                 chunk_idx, content, tag_set, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    Self::row_id(&fragment.video.video_id, fragment.chunk_idx),
                    fragment.id,
                    fragment.video.video_id,
                    fragment.video.title,
                    fragment.video.channel,
                    fragment.video.channel_id,
                    tags_json,
                    fragment.video.url,
                    fragment.chunk_idx as i64,
                    fragment.text,
                    tag_set_json,
                    Self::embedding_to_bytes(embedding),
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} fragments", fragments.len());
        Ok(fragments.len())
    }

    #[instrument(skip(self, embedding, filter))]
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<SearchHit>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| OmfangError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, fragment_id, video_id, title, channel, channel_id, tags, url,
                   chunk_idx, content, tag_set, embedding, indexed_at
            FROM fragments
            "#,
        )?;

        let rows = stmt.query_map([], Self::row_to_fragment)?;

        let mut hits: Vec<SearchHit> = rows
            .filter_map(|r| r.ok())
            .filter(|(fragment, _)| filter.map_or(true, |f| fragment.matches(f)))
            .map(|(fragment, stored)| SearchHit {
                score: cosine_similarity(embedding, &stored),
                fragment,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        debug!("Found {} matching fragments", hits.len());
        Ok(hits)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| OmfangError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, title, channel, COUNT(*) as fragment_count,
                   MAX(indexed_at) as indexed_at
            FROM fragments
            GROUP BY video_id
            ORDER BY indexed_at DESC
            "#,
        )?;

        let videos = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(4)?;
            Ok(IndexedVideo {
                video_id: row.get(0)?,
                title: row.get(1)?,
                channel: row.get(2)?,
                fragment_count: row.get(3)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        Ok(videos.filter_map(|v| v.ok()).collect())
    }

    async fn is_video_indexed(&self, video_id: &str) -> Result<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| OmfangError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fragments WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    async fn fragment_count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| OmfangError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM fragments", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
