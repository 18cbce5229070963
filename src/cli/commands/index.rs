//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::OmfangError;
use crate::orchestrator::Orchestrator;
use crate::video::extract_video_id;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(input: &str, force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'omfang doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let video_id = extract_video_id(input).ok_or_else(|| {
        OmfangError::InvalidInput(format!("Could not parse a video ID from: {}", input))
    })?;

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Indexing {}...", video_id));

    match orchestrator.index_video(&video_id, force).await {
        Ok(outcome) => {
            spinner.finish_and_clear();
            if outcome.skipped {
                Output::info(&format!(
                    "'{}' is already indexed. Use --force to re-index.",
                    outcome.title
                ));
            } else {
                Output::success(&format!(
                    "Indexed '{}' ({} fragments)",
                    outcome.title, outcome.fragments_indexed
                ));
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Indexing failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
