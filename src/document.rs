//! Document and chunk data model.
//!
//! A `Document` is the unit of extraction; a `Chunk` is the unit of
//! embedding and retrieval, derived from a parent document by splitting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key identifying the origin file of a document or chunk.
pub const SOURCE_KEY: &str = "source";

/// A piece of extracted text plus free-form metadata.
///
/// Immutable after creation; metadata always carries a `source` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

/// A bounded sub-span of a parent document.
///
/// `start_index` is the chunk's character offset into the parent content,
/// kept for traceability back to the source position. Metadata is inherited
/// from the parent (notably `source`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub start_index: usize,
    pub metadata: Map<String, Value>,
}

impl Chunk {
    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}
