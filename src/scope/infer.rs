//! LLM-backed scope inference.

use super::Scope;
use crate::error::{OmfangError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use tracing::{debug, instrument, warn};

const SYSTEM_PROMPT: &str = r#"Classify the user's desired retrieval SCOPE for answering about a YouTube video.
Valid scopes:
 - one_video: Only use the seed video.
 - seed_plus_tag: Use the seed + tag-similar videos (exclude unrelated channels unless they match tags).
 - seed_plus_channel: Use the seed + other videos from the same channel only.
 - any: Use seed plus any helpful related sources.
Output strict JSON: {"scope": <one of the four>, "reason": <short>}. No extra text."#;

const FEW_SHOT: [(&str, &str); 4] = [
    (
        "What is the best way to answer this question about this video?",
        r#"{"scope":"one_video","reason":"User asked a question about this video specifically."}"#,
    ),
    (
        "Find more videos like this, but not from this channel.",
        r#"{"scope":"seed_plus_tag","reason":"Wants similar-by-topic and excludes the channel."}"#,
    ),
    (
        "Show me other uploads from this creator about the same topic.",
        r#"{"scope":"seed_plus_channel","reason":"Wants the same channel specifically."}"#,
    ),
    (
        "Give me anything relevant that matches this vibe.",
        r#"{"scope":"any","reason":"Open to any relevant sources."}"#,
    ),
];

const FALLBACK_REASON: &str = "Fallback due to parsing or API error.";

/// Parse the classifier's JSON reply. Unknown or malformed values fall
/// back to `Scope::Any` so inference stays total.
fn parse_response(raw: &str) -> (Scope, String) {
    let data: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => return (Scope::Any, FALLBACK_REASON.to_string()),
    };

    let scope = data["scope"]
        .as_str()
        .and_then(|s| s.parse::<Scope>().ok())
        .unwrap_or(Scope::Any);
    let reason = data["reason"].as_str().unwrap_or("").trim().to_string();
    (scope, reason)
}

/// Infers the retrieval scope for a question with a chat completion.
pub struct ScopeClassifier {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl ScopeClassifier {
    pub fn new(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }

    /// Infer the scope for a question about the seed video.
    ///
    /// Never fails: any API or parse error falls back to `Scope::Any`
    /// with a fallback rationale.
    #[instrument(skip(self, seed_title, seed_tags), fields(question = %question))]
    pub async fn infer(
        &self,
        question: &str,
        seed_title: &str,
        seed_tags: &[String],
    ) -> (Scope, String) {
        match self.infer_inner(question, seed_title, seed_tags).await {
            Ok((scope, reason)) => {
                debug!(%scope, reason, "inferred scope");
                (scope, reason)
            }
            Err(e) => {
                warn!(error = %e, "scope inference failed, defaulting to any");
                (Scope::Any, FALLBACK_REASON.to_string())
            }
        }
    }

    async fn infer_inner(
        &self,
        question: &str,
        seed_title: &str,
        seed_tags: &[String],
    ) -> Result<(Scope, String)> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| OmfangError::Scope(e.to_string()))?
                .into(),
        ];

        for (user, assistant) in FEW_SHOT {
            messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| OmfangError::Scope(e.to_string()))?
                    .into(),
            );
            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(assistant)
                    .build()
                    .map_err(|e| OmfangError::Scope(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Question: {}\nSeed title: {}\nSeed tags: {}",
                    question,
                    seed_title,
                    seed_tags.join(", ")
                ))
                .build()
                .map_err(|e| OmfangError::Scope(e.to_string()))?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .response_format(ResponseFormat::JsonObject)
            .messages(messages)
            .build()
            .map_err(|e| OmfangError::Scope(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| OmfangError::OpenAI(format!("Scope inference failed: {}", e)))?;

        let raw = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| OmfangError::Scope("Empty response from classifier".to_string()))?;

        Ok(parse_response(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let (scope, reason) =
            parse_response(r#"{"scope":"seed_plus_channel","reason":"same creator"}"#);
        assert_eq!(scope, Scope::SeedPlusChannel);
        assert_eq!(reason, "same creator");
    }

    #[test]
    fn test_parse_unknown_scope_falls_back_to_any() {
        let (scope, _) = parse_response(r#"{"scope":"galaxy","reason":"?"}"#);
        assert_eq!(scope, Scope::Any);
    }

    #[test]
    fn test_parse_malformed_json_falls_back_to_any() {
        let (scope, reason) = parse_response("scope: one_video");
        assert_eq!(scope, Scope::Any);
        assert_eq!(reason, FALLBACK_REASON);
    }

    #[test]
    fn test_parse_missing_fields() {
        let (scope, reason) = parse_response("{}");
        assert_eq!(scope, Scope::Any);
        assert_eq!(reason, "");
    }
}
