//! Agent command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::OmfangError;
use crate::orchestrator::Orchestrator;
use crate::video::extract_video_id;
use anyhow::Result;

/// Run the agent command.
pub async fn run_agent(
    video: &str,
    task: &str,
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
        settings.agent.model = model;
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Agent working...");

    match orchestrator.run_agent(&video_id, task).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    Output::info(&format!("  {} {}", call.name, truncate(&call.arguments, 60)));
                }
                println!();
            }

            Output::info(&format!(
                "Completed in {} iteration(s)",
                response.iterations
            ));
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Agent failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_passthrough() {
        assert_eq!(truncate("short", 60), "short");
    }

    #[test]
    fn test_truncate_long_adds_ellipsis() {
        let long = "x".repeat(100);
        let out = truncate(&long, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with("..."));
    }
}
