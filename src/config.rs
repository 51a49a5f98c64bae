//! Configuration for the ingestion pipeline and conversation engine.
//!
//! All sections have workable defaults; `AppConfig::load` reads a JSON file
//! and `validate` rejects unusable parameter combinations before any work
//! starts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::DEFAULT_SEPARATORS;
use crate::errors::ChatbotError;
use crate::index::DistanceMetric;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dimension: usize,
    pub metric: DistanceMetric,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimension: 768,
            metric: DistanceMetric::SquaredL2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest chunks handed to the generation step.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Connection settings for a chat model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            api_key: None,
            model: "default".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Connection settings for an embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            api_key: None,
            model: "text-embedding".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chunking: ChunkConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub model: ModelConfig,
    pub embedding: EmbeddingConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ChatbotError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ChatbotError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|err| {
            ChatbotError::Configuration(format!("cannot parse {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChatbotError> {
        if self.chunking.chunk_size == 0 {
            return Err(ChatbotError::Configuration(
                "chunking.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(ChatbotError::Configuration(
                "chunking.overlap must be smaller than chunking.chunk_size".to_string(),
            ));
        }
        if self.index.dimension == 0 {
            return Err(ChatbotError::Configuration(
                "index.dimension must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ChatbotError::Configuration(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
