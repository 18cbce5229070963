//! Omfang - Scope-Constrained Video Q&A
//!
//! A CLI tool that answers questions about YouTube videos while keeping
//! retrieval inside an inferred scope boundary.
//!
//! The name "Omfang" comes from the Norwegian/Scandinavian word for "scope."
//!
//! # Overview
//!
//! Omfang allows you to:
//! - Index YouTube video transcripts into a searchable vector database
//! - Ask questions whose retrieval is confined to an inferred scope
//!   (one video, tag-similar videos, same channel, or anything relevant)
//! - Expand the corpus with related videos, gated by that scope
//! - Search through indexed transcripts semantically
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `video` - YouTube metadata, transcripts and rate limiting
//! - `chunking` - Transcript chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `scope` - Scope model, inference and query filters
//! - `discovery` - Tag/channel discovery and gated expansion
//! - `pipeline` - The indexing pipeline
//! - `rag` - Scope-filtered retrieval and answering
//! - `agent` - Tool-calling agent with scope-bounded tools
//! - `orchestrator` - Wiring and the answer flow
//!
//! # Example
//!
//! ```rust,no_run
//! use omfang::config::Settings;
//! use omfang::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let outcome = orchestrator
//!         .answer("dQw4w9WgXcQ", "What is this video about?")
//!         .await?;
//!     println!("{}", outcome.response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod rag;
pub mod scope;
pub mod vector_store;
pub mod video;

pub use error::{OmfangError, Result};
