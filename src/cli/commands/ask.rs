//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::OmfangError;
use crate::orchestrator::Orchestrator;
use crate::video::extract_video_id;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    video: &str,
    question: &str,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'omfang doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let video_id = extract_video_id(video).ok_or_else(|| {
        OmfangError::InvalidInput(format!("Could not parse a video ID from: {}", video))
    })?;

    if let Some(model) = model {
        settings.rag.model = model;
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Resolving scope and retrieving context...");

    match orchestrator.answer(&video_id, question).await {
        Ok(outcome) => {
            spinner.finish_and_clear();

            Output::kv("Scope", &outcome.scope.to_string());
            if !outcome.scope_reason.is_empty() {
                Output::kv("Reason", &outcome.scope_reason);
            }
            if outcome.discovered > 0 {
                Output::kv(
                    "Expansion",
                    &format!("{} discovered, {} indexed", outcome.discovered, outcome.indexed),
                );
            }

            println!("\n{}\n", outcome.response.answer);

            if !outcome.response.sources.is_empty() {
                Output::header("Sources");
                for source in &outcome.response.sources {
                    Output::search_result(&source.title, source.score, &source.text, &source.url);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
