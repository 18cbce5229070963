//! Configuration module for Omfang.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    AgentSettings, ChunkingSettings, DiscoverySettings, EmbeddingSettings, GeneralSettings,
    RagSettings, RerankSettings, Settings, VectorStoreSettings, YoutubeSettings,
};
