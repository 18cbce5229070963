//! Answer generation over retrieved context.

use super::context::{format_context_for_prompt, Retriever};
use super::ContextChunk;
use crate::error::{OmfangError, Result};
use crate::openai::create_client;
use crate::scope::RetrievalContext;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use tracing::{debug, info, instrument};

const SYSTEM_PROMPT: &str = "You answer questions about one or more YouTube videos. \
Retrieval scope rules are enforced by the system through filters; answer only from the \
provided context. Cite video titles with their links. If the context holds insufficient \
evidence, say so instead of guessing.";

const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant indexed content to answer this question.";

/// Generates answers with cited sources from scope-filtered retrieval.
pub struct RagEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    retriever: Retriever,
}

impl RagEngine {
    pub fn new(retriever: Retriever, model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            retriever,
        }
    }

    /// Answer a question within a scope boundary.
    #[instrument(skip(self, ctx), fields(question = %question))]
    pub async fn ask(&self, question: &str, ctx: &RetrievalContext) -> Result<RagResponse> {
        info!("Answering question");

        let sources = self.retriever.retrieve(question, ctx).await?;
        if sources.is_empty() {
            return Ok(RagResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources,
            });
        }

        let user_prompt = format!(
            "Question: {}\n\nContext from indexed videos:\n{}",
            question,
            format_context_for_prompt(&sources)
        );

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| OmfangError::Rag(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| OmfangError::Rag(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .build()
            .map_err(|e| OmfangError::Rag(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| OmfangError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| OmfangError::Rag("Empty response from LLM".to_string()))?
            .clone();

        debug!(sources = sources.len(), "generated answer");

        Ok(RagResponse { answer, sources })
    }
}

/// An answer with the context chunks it drew from.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer.
    pub sources: Vec<ContextChunk>,
}

impl RagResponse {
    /// Format the response for display, sources appended.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (score: {:.2})\n  {}",
                    source.title, source.score, source.url
                ));
            }
        }

        output
    }
}
