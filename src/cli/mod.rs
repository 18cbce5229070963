//! CLI module for Omfang.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Omfang - Scope-Constrained Video Q&A
///
/// A CLI tool that answers questions about YouTube videos while keeping
/// retrieval inside an inferred scope boundary.
/// The name "Omfang" comes from the Norwegian/Scandinavian word for "scope."
#[derive(Parser, Debug)]
#[command(name = "omfang")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Omfang and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Fetch, chunk and index a video transcript
    Index {
        /// YouTube URL or 11-character video ID
        input: String,

        /// Force re-indexing even if already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question about a video, scoped automatically
    Ask {
        /// YouTube URL or video ID of the seed video
        video: String,

        /// The question to ask
        question: String,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run the tool-calling agent on a task about a video
    Agent {
        /// YouTube URL or video ID of the seed video
        video: String,

        /// The task for the agent (e.g., "Summarize the main points")
        task: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search indexed transcripts, unscoped
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List indexed videos
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "rag.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
