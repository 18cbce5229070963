//! Scope-filtered retrieval and context formatting.

use super::rank::rerank;
use super::ContextChunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::scope::RetrievalContext;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of fragments retrieved per question.
pub const DEFAULT_TOP_K: usize = 8;

/// Embeds a query, runs the filtered similarity search and applies the
/// hybrid re-rank when the retrieval context asks for it.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set how many fragments to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Retrieve context for a question within a scope boundary.
    pub async fn retrieve(
        &self,
        question: &str,
        ctx: &RetrievalContext,
    ) -> Result<Vec<ContextChunk>> {
        self.retrieve_k(question, ctx, self.top_k).await
    }

    /// Retrieve with an explicit fragment count.
    #[instrument(skip(self, ctx), fields(question = %question, top_k))]
    pub async fn retrieve_k(
        &self,
        question: &str,
        ctx: &RetrievalContext,
        top_k: usize,
    ) -> Result<Vec<ContextChunk>> {
        let embedding = self.embedder.embed(question).await?;
        let filter = ctx.filter();

        let mut hits = self.store.query(&embedding, top_k, filter.as_ref()).await?;
        debug!(hits = hits.len(), "retrieved raw hits");

        if ctx.tag_rerank {
            rerank(&mut hits, &ctx.seed_tags, ctx.rerank_alpha, ctx.rerank_beta);
        }

        Ok(hits.into_iter().map(ContextChunk::from).collect())
    }

    /// Unscoped similarity search, used by the `search` command.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContextChunk>> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.query(&embedding, limit, None).await?;
        Ok(hits.into_iter().map(ContextChunk::from).collect())
    }
}

/// Format context chunks for inclusion in a prompt.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "---\n[{}] {} ({})\n{}\n---",
                i + 1,
                chunk.title,
                chunk.url,
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{meta, FakeEmbedder};
    use crate::scope::Scope;
    use crate::vector_store::{Fragment, MemoryVectorStore};

    async fn seeded_store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        let seed = meta("seed", Some("UCseed"), &["rust"]);
        let other = meta("other", Some("UCother"), &["cooking"]);

        store
            .upsert_batch(
                &[
                    Fragment::new(&seed, 0, "seed fragment".to_string()),
                    Fragment::new(&other, 0, "other fragment".to_string()),
                ],
                &[vec![1.0, 0.0, 1.0], vec![1.0, 0.0, 2.0]],
            )
            .await
            .unwrap();

        store
    }

    #[tokio::test]
    async fn test_retrieve_honors_scope_filter() {
        let store = seeded_store().await;
        let retriever = Retriever::new(store, Arc::new(FakeEmbedder));

        let ctx = RetrievalContext {
            scope: Scope::OneVideo,
            seed_video_id: "seed".to_string(),
            tag_rerank: false,
            ..Default::default()
        };

        let chunks = retriever.retrieve("question", &ctx).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].video_id, "seed");
    }

    #[tokio::test]
    async fn test_retrieve_any_scope_sees_everything() {
        let store = seeded_store().await;
        let retriever = Retriever::new(store, Arc::new(FakeEmbedder));

        let ctx = RetrievalContext {
            scope: Scope::Any,
            seed_video_id: "seed".to_string(),
            tag_rerank: false,
            ..Default::default()
        };

        let chunks = retriever.retrieve("question", &ctx).await.unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_rerank_biases_toward_seed_tags() {
        let store = Arc::new(MemoryVectorStore::new());
        let tagged = meta("tagged", None, &["rust"]);
        let plain = meta("plain", None, &[]);

        // plain has much higher cosine similarity to any query vector,
        // tagged only wins through the tag-overlap term
        store
            .upsert_batch(
                &[
                    Fragment::new(&tagged, 0, "tagged".to_string()),
                    Fragment::new(&plain, 0, "plain".to_string()),
                ],
                &[vec![0.0, 1.0, 0.0], vec![1.0, 0.0, 0.0]],
            )
            .await
            .unwrap();

        let embedder = Arc::new(FakeEmbedder);
        let retriever = Retriever::new(store, embedder);

        let ctx = RetrievalContext {
            scope: Scope::Any,
            seed_tags: vec!["rust".to_string()],
            tag_rerank: true,
            rerank_alpha: 0.5,
            rerank_beta: 0.5,
            ..Default::default()
        };

        let chunks = retriever.retrieve("q", &ctx).await.unwrap();
        assert_eq!(chunks[0].video_id, "tagged");
    }

    #[tokio::test]
    async fn test_search_is_unscoped() {
        let store = seeded_store().await;
        let retriever = Retriever::new(store, Arc::new(FakeEmbedder));

        let chunks = retriever.search("anything", 10).await.unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_format_context_for_prompt() {
        let chunks = vec![ContextChunk {
            video_id: "vid".to_string(),
            title: "A Title".to_string(),
            channel: None,
            text: "some text".to_string(),
            score: 0.9,
            url: "https://www.youtube.com/watch?v=vid".to_string(),
        }];

        let formatted = format_context_for_prompt(&chunks);
        assert!(formatted.contains("[1] A Title"));
        assert!(formatted.contains("some text"));
        assert!(formatted.contains("watch?v=vid"));
    }
}
