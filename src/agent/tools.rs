//! Scope-bounded tool set for the answering agent.
//!
//! The dispatcher holds the resolved retrieval context; every tool runs
//! through the same filters and permission table as the deterministic
//! pipeline, so a model request can never widen the scope.

use crate::discovery::Expander;
use crate::error::{OmfangError, Result};
use crate::pipeline::Indexer;
use crate::rag::Retriever;
use crate::scope::RetrievalContext;
use crate::video::VideoMeta;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Available tools for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Search indexed fragments within the current scope.
    RagSearch {
        query: String,
        #[serde(default = "default_k")]
        k: u32,
    },

    /// Index a single video into the store.
    IndexVideo { video_id: String },

    /// Discover and index related videos within the current scope.
    Expand,
}

fn default_k() -> u32 {
    8
}

/// Tool execution context carrying the resolved retrieval context.
pub struct ToolContext {
    retriever: Retriever,
    indexer: Arc<Indexer>,
    expander: Arc<Expander>,
    ctx: RetrievalContext,
    seed: VideoMeta,
}

impl ToolContext {
    /// Create a new tool context bound to one question's scope.
    pub fn new(
        retriever: Retriever,
        indexer: Arc<Indexer>,
        expander: Arc<Expander>,
        ctx: RetrievalContext,
        seed: VideoMeta,
    ) -> Self {
        Self {
            retriever,
            indexer,
            expander,
            ctx,
            seed,
        }
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::RagSearch { query, k } => self.execute_rag_search(query, *k).await,
            ToolCall::IndexVideo { video_id } => self.execute_index_video(video_id).await,
            ToolCall::Expand => self.execute_expand().await,
        }
    }

    async fn execute_rag_search(&self, query: &str, k: u32) -> Result<String> {
        let chunks = self
            .retriever
            .retrieve_k(query, &self.ctx, k as usize)
            .await?;

        if chunks.is_empty() {
            return Ok("No relevant fragments found within the current scope.".to_string());
        }

        let formatted = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "{}. {} ({})\n   {}",
                    i + 1,
                    chunk.title,
                    chunk.url,
                    chunk.text.chars().take(500).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(format!(
            "Found {} fragments:\n\n{}",
            chunks.len(),
            formatted
        ))
    }

    async fn execute_index_video(&self, video_id: &str) -> Result<String> {
        let outcome = self.indexer.index(video_id, false).await?;

        if outcome.skipped {
            Ok(format!("'{}' is already indexed.", outcome.title))
        } else {
            Ok(format!(
                "Indexed '{}' ({} fragments).",
                outcome.title, outcome.fragments_indexed
            ))
        }
    }

    async fn execute_expand(&self) -> Result<String> {
        if !self.ctx.allow_expand {
            return Ok("Expansion is disabled for this question.".to_string());
        }

        let outcome = self.expander.expand(self.ctx.scope, &self.seed).await;

        if outcome.video_ids.is_empty() {
            return Ok(
                "No videos to expand into: the scope forbids it or nothing new was found."
                    .to_string(),
            );
        }

        Ok(format!(
            "Discovered {} videos: {} indexed, {} failed.",
            outcome.video_ids.len(),
            outcome.indexed,
            outcome.failed
        ))
    }
}

/// Get OpenAI function/tool definitions for the agent.
pub fn tool_definitions() -> Vec<async_openai::types::ChatCompletionTool> {
    use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

    vec![
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "rag_search".to_string(),
                description: Some(
                    "Search indexed video fragments for relevant content. \
                    Results are filtered to the current scope automatically."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        },
                        "k": {
                            "type": "integer",
                            "description": "Maximum number of fragments (default: 8)",
                            "default": 8
                        }
                    },
                    "required": ["query"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "index_video".to_string(),
                description: Some(
                    "Fetch, transcribe and index a single video so its content \
                    becomes searchable. Skips videos that are already indexed."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "video_id": {
                            "type": "string",
                            "description": "The 11-character video ID"
                        }
                    },
                    "required": ["video_id"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "expand".to_string(),
                description: Some(
                    "Discover and index videos related to the seed, limited to \
                    what the current scope permits. Use only when the indexed \
                    corpus is insufficient."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {}
                })),
                strict: None,
            },
        },
    ]
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| OmfangError::Agent(format!("Invalid tool arguments: {}", e)))?;

    match name {
        "rag_search" => {
            let query = args["query"]
                .as_str()
                .ok_or_else(|| OmfangError::Agent("Missing 'query' argument".to_string()))?
                .to_string();
            let k = args["k"].as_u64().unwrap_or(8) as u32;
            Ok(ToolCall::RagSearch { query, k })
        }
        "index_video" => {
            let video_id = args["video_id"]
                .as_str()
                .ok_or_else(|| OmfangError::Agent("Missing 'video_id' argument".to_string()))?
                .to_string();
            Ok(ToolCall::IndexVideo { video_id })
        }
        "expand" => Ok(ToolCall::Expand),
        _ => Err(OmfangError::Agent(format!("Unknown tool: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveryEngine;
    use crate::pipeline::testing::{meta, FakeEmbedder, FakeProvider, FakeTranscripts};
    use crate::scope::Scope;
    use crate::vector_store::{Fragment, MemoryVectorStore, VectorStore};

    fn seed_meta() -> VideoMeta {
        meta("seed1234567", Some("UCseed"), &["rust"])
    }

    fn tool_context(provider: FakeProvider, store: Arc<MemoryVectorStore>) -> ToolContext {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(provider);
        let embedder = Arc::new(FakeEmbedder);
        let indexer = Arc::new(Indexer::new(
            provider.clone(),
            Arc::new(FakeTranscripts::default()),
            embedder.clone(),
            store.clone(),
        ));
        let engine = DiscoveryEngine::new(provider, dir.path().join("tags.json"));
        let expander = Arc::new(Expander::new(engine, indexer.clone()));

        let ctx = RetrievalContext {
            scope: Scope::OneVideo,
            allow_expand: false,
            seed_video_id: "seed1234567".to_string(),
            tag_rerank: false,
            ..Default::default()
        };

        ToolContext::new(
            Retriever::new(store, embedder),
            indexer,
            expander,
            ctx,
            seed_meta(),
        )
    }

    #[test]
    fn test_parse_rag_search_tool() {
        let tool = parse_tool_call("rag_search", r#"{"query": "ownership", "k": 3}"#).unwrap();
        match tool {
            ToolCall::RagSearch { query, k } => {
                assert_eq!(query, "ownership");
                assert_eq!(k, 3);
            }
            _ => panic!("Expected RagSearch tool"),
        }
    }

    #[test]
    fn test_parse_rag_search_defaults_k() {
        let tool = parse_tool_call("rag_search", r#"{"query": "ownership"}"#).unwrap();
        match tool {
            ToolCall::RagSearch { k, .. } => assert_eq!(k, 8),
            _ => panic!("Expected RagSearch tool"),
        }
    }

    #[test]
    fn test_parse_index_video_tool() {
        let tool = parse_tool_call("index_video", r#"{"video_id": "abc12345678"}"#).unwrap();
        match tool {
            ToolCall::IndexVideo { video_id } => assert_eq!(video_id, "abc12345678"),
            _ => panic!("Expected IndexVideo tool"),
        }
    }

    #[test]
    fn test_parse_expand_tool() {
        let tool = parse_tool_call("expand", "{}").unwrap();
        assert!(matches!(tool, ToolCall::Expand));
    }

    #[test]
    fn test_parse_unknown_tool() {
        assert!(parse_tool_call("drop_tables", "{}").is_err());
    }

    #[tokio::test]
    async fn test_rag_search_stays_inside_scope() {
        let store = Arc::new(MemoryVectorStore::new());
        let seed = seed_meta();
        let other = meta("other1234xyz", Some("UCother"), &[]);
        store
            .upsert_batch(
                &[
                    Fragment::new(&seed, 0, "seed fragment".to_string()),
                    Fragment::new(&other, 0, "other fragment".to_string()),
                ],
                &[vec![1.0, 0.0, 1.0], vec![1.0, 0.0, 1.0]],
            )
            .await
            .unwrap();

        let tools = tool_context(FakeProvider::default(), store);
        let result = tools
            .execute(&ToolCall::RagSearch {
                query: "fragment".to_string(),
                k: 8,
            })
            .await
            .unwrap();

        assert!(result.contains("Found 1 fragments"));
        assert!(result.contains("Video seed1234567"));
        assert!(!result.contains("Video other1234xyz"));
    }

    #[tokio::test]
    async fn test_rag_search_empty_store() {
        let tools = tool_context(FakeProvider::default(), Arc::new(MemoryVectorStore::new()));
        let result = tools
            .execute(&ToolCall::RagSearch {
                query: "anything".to_string(),
                k: 8,
            })
            .await
            .unwrap();

        assert!(result.contains("No relevant fragments"));
    }

    #[tokio::test]
    async fn test_index_video_reports_outcome() {
        let provider = FakeProvider::default().with_video(seed_meta());
        let tools = tool_context(provider, Arc::new(MemoryVectorStore::new()));

        let result = tools
            .execute(&ToolCall::IndexVideo {
                video_id: "seed1234567".to_string(),
            })
            .await
            .unwrap();

        // empty transcript still counts as indexed, just with zero fragments
        assert!(result.contains("Indexed 'Video seed1234567'"));
    }

    #[tokio::test]
    async fn test_expand_disabled_short_circuits() {
        let provider = FakeProvider::default();
        let store = Arc::new(MemoryVectorStore::new());
        let tools = tool_context(provider, store);

        let result = tools.execute(&ToolCall::Expand).await.unwrap();
        assert_eq!(result, "Expansion is disabled for this question.");
    }

    #[tokio::test]
    async fn test_expand_one_video_scope_finds_nothing() {
        let store = Arc::new(MemoryVectorStore::new());
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::default());
        let embedder = Arc::new(FakeEmbedder);
        let indexer = Arc::new(Indexer::new(
            provider.clone(),
            Arc::new(FakeTranscripts::default()),
            embedder.clone(),
            store.clone(),
        ));
        let engine = DiscoveryEngine::new(provider, dir.path().join("tags.json"));
        let expander = Arc::new(Expander::new(engine, indexer.clone()));

        let ctx = RetrievalContext {
            scope: Scope::OneVideo,
            allow_expand: true,
            seed_video_id: "seed1234567".to_string(),
            ..Default::default()
        };

        let tools = ToolContext::new(
            Retriever::new(store, embedder),
            indexer,
            expander,
            ctx,
            seed_meta(),
        );

        let result = tools.execute(&ToolCall::Expand).await.unwrap();
        assert!(result.contains("No videos to expand into"));
    }
}
