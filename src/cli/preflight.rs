//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{OmfangError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing needs both API keys and yt-dlp.
    Index,
    /// Asking indexes the seed and may expand, so it needs everything.
    Ask,
    /// Search embeds the query, so it needs the OpenAI key.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Index | Operation::Ask => {
            check_openai_key()?;
            check_youtube_key(settings)?;
            check_tool("yt-dlp")?;
        }
        Operation::Search => {
            check_openai_key()?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_openai_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(OmfangError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(OmfangError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if a YouTube Data API key is configured.
fn check_youtube_key(settings: &Settings) -> Result<()> {
    match settings.youtube_api_key() {
        Some(_) => Ok(()),
        None => Err(OmfangError::Config(
            "YouTube API key not set. Set youtube.api_key in config or the YOUTUBE_API_KEY environment variable."
                .to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(OmfangError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(OmfangError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(OmfangError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
