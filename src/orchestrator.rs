//! Wiring and answer flow for Omfang.
//!
//! Constructs each collaborator once at startup and passes handles
//! explicitly. The answer flow runs the deterministic pipeline: index the
//! seed, infer the scope, expand within it, then retrieve and generate
//! with the scope filter applied.

use crate::agent::{Agent, AgentResponse, ToolContext};
use crate::config::Settings;
use crate::discovery::{DiscoveryEngine, Expander};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::pipeline::{IndexOutcome, Indexer};
use crate::rag::{ContextChunk, RagEngine, RagResponse, Retriever};
use crate::scope::{RetrievalContext, Scope, ScopeClassifier};
use crate::vector_store::{IndexedVideo, MemoryVectorStore, SqliteVectorStore, VectorStore};
use crate::video::{RateLimiter, VideoMeta, VideoProvider, YouTubeDataApi, YtDlpTranscript};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// The main orchestrator for the Omfang pipeline.
pub struct Orchestrator {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    indexer: Arc<Indexer>,
    expander: Arc<Expander>,
    classifier: ScopeClassifier,
}

impl Orchestrator {
    /// Create a new orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let provider: Arc<dyn VideoProvider> =
            Arc::new(YouTubeDataApi::new(settings.youtube_api_key())?);

        let rate_limiter = match (
            settings.youtube.rate_limit_requests,
            settings.youtube.rate_limit_window_seconds,
        ) {
            (Some(max), Some(window)) => {
                Arc::new(RateLimiter::new(max, Duration::from_secs(window)))
            }
            _ => Arc::new(RateLimiter::default()),
        };
        let transcripts = Arc::new(YtDlpTranscript::new(rate_limiter));

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "memory" => Arc::new(MemoryVectorStore::new()),
            _ => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        };

        let indexer = Arc::new(
            Indexer::new(
                provider.clone(),
                transcripts,
                embedder.clone(),
                store.clone(),
            )
            .with_chunking(settings.chunking.max_chars, settings.chunking.overlap),
        );

        let engine = DiscoveryEngine::new(provider, settings.cache_path()).with_limits(
            settings.discovery.per_tag,
            settings.discovery.channel_max,
            settings.discovery.max_search_calls,
        );
        let expander = Arc::new(Expander::new(engine, indexer.clone()));

        let classifier = ScopeClassifier::new(&settings.rag.scope_model);

        Ok(Self {
            settings,
            embedder,
            store,
            indexer,
            expander,
            classifier,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        indexer: Arc<Indexer>,
        expander: Arc<Expander>,
    ) -> Self {
        let classifier = ScopeClassifier::new(&settings.rag.scope_model);
        Self {
            settings,
            embedder,
            store,
            indexer,
            expander,
            classifier,
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Index a single video.
    pub async fn index_video(&self, video_id: &str, force: bool) -> Result<IndexOutcome> {
        self.indexer.index(video_id, force).await
    }

    /// List all indexed videos.
    pub async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        self.store.list_videos().await
    }

    /// Unscoped similarity search over indexed fragments.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContextChunk>> {
        self.retriever().search(query, limit).await
    }

    /// Answer a question about a seed video.
    ///
    /// Indexes the seed, infers the retrieval scope, runs the deterministic
    /// expansion within it, then retrieves and generates with the scope
    /// filter in place. Expansion during answering is disabled since it
    /// already ran.
    #[instrument(skip(self, question), fields(video_id = %video_id))]
    pub async fn answer(&self, video_id: &str, question: &str) -> Result<AnswerOutcome> {
        self.indexer.index(video_id, false).await?;
        let seed = self.indexer.fetch_meta(video_id).await?;

        let (scope, scope_reason) = self
            .classifier
            .infer(question, &seed.title, &seed.tags)
            .await;
        info!(%scope, reason = %scope_reason, "resolved scope");

        let expanded = self.expander.expand(scope, &seed).await;

        let allowed_video_ids = allow_list(scope, &seed, &expanded.video_ids);
        let ctx = self.retrieval_context(scope, &seed, false, allowed_video_ids);

        let engine = RagEngine::new(self.retriever(), &self.settings.rag.model);
        let response = engine.ask(question, &ctx).await?;

        Ok(AnswerOutcome {
            scope,
            scope_reason,
            discovered: expanded.video_ids.len(),
            indexed: expanded.indexed,
            response,
        })
    }

    /// Run the tool-calling agent on a task about a seed video.
    ///
    /// No deterministic pre-expansion happens here; the agent may request
    /// it through the `expand` tool, gated by the inferred scope.
    #[instrument(skip(self, task), fields(video_id = %video_id))]
    pub async fn run_agent(&self, video_id: &str, task: &str) -> Result<AgentResponse> {
        self.indexer.index(video_id, false).await?;
        let seed = self.indexer.fetch_meta(video_id).await?;

        let (scope, scope_reason) = self.classifier.infer(task, &seed.title, &seed.tags).await;
        info!(%scope, reason = %scope_reason, "resolved scope");

        let ctx = self.retrieval_context(scope, &seed, true, None);
        let context_line = format!(
            "Seed video: '{}' ({}). Retrieval scope: {}.",
            seed.title, seed.video_id, scope
        );

        let tools = ToolContext::new(
            self.retriever(),
            self.indexer.clone(),
            self.expander.clone(),
            ctx,
            seed,
        );

        let agent = Agent::new(tools, &self.settings.agent.model)
            .with_max_iterations(self.settings.agent.max_iterations);
        agent.run(task, Some(&context_line)).await
    }

    fn retriever(&self) -> Retriever {
        Retriever::new(self.store.clone(), self.embedder.clone())
            .with_top_k(self.settings.rag.top_k)
    }

    fn retrieval_context(
        &self,
        scope: Scope,
        seed: &VideoMeta,
        allow_expand: bool,
        allowed_video_ids: Option<Vec<String>>,
    ) -> RetrievalContext {
        RetrievalContext {
            scope,
            allow_expand,
            tag_rerank: self.settings.rerank.enabled,
            rerank_alpha: self.settings.rerank.alpha,
            rerank_beta: self.settings.rerank.beta,
            seed_tags: seed.tags.clone(),
            seed_video_id: seed.video_id.clone(),
            seed_channel_id: seed.channel_id.clone().unwrap_or_default(),
            allowed_video_ids,
        }
    }

    /// Check whether a video is already indexed.
    pub async fn is_video_indexed(&self, video_id: &str) -> Result<bool> {
        self.store.is_video_indexed(video_id).await
    }

    /// Resolve a video ID or URL into metadata without indexing.
    pub async fn fetch_meta(&self, video_id: &str) -> Result<VideoMeta> {
        self.indexer.fetch_meta(video_id).await
    }
}

/// Build the retrieval allow-list for a scope from the expansion result.
///
/// One-video questions pin to the seed; tag-scoped questions pin to the
/// seed plus what the gated expansion discovered. Channel and open scopes
/// carry no allow-list, their filters come from the scope itself.
fn allow_list(scope: Scope, seed: &VideoMeta, expanded_ids: &[String]) -> Option<Vec<String>> {
    match scope {
        Scope::OneVideo => Some(vec![seed.video_id.clone()]),
        Scope::SeedPlusTag => {
            let mut ids = vec![seed.video_id.clone()];
            for id in expanded_ids {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
            Some(ids)
        }
        Scope::SeedPlusChannel | Scope::Any => None,
    }
}

/// Result of answering one question.
#[derive(Debug)]
pub struct AnswerOutcome {
    /// Scope the classifier resolved.
    pub scope: Scope,
    /// The classifier's short rationale.
    pub scope_reason: String,
    /// How many related videos the expansion discovered.
    pub discovered: usize,
    /// How many of those are now indexed.
    pub indexed: usize,
    /// The generated answer with its sources.
    pub response: RagResponse,
}
