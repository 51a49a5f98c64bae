//! Retrieval tool consumed by the conversation engine.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::document::Chunk;
use crate::errors::ChatbotError;
use crate::index::SharedIndex;
use crate::llm::{Embedder, ToolSpec};

pub const RETRIEVE_TOOL_NAME: &str = "retrieve";
pub const DEFAULT_TOP_K: usize = 5;

/// Tool declaration offered to the chat model during the decide step.
pub fn retrieve_tool_spec() -> ToolSpec {
    ToolSpec {
        name: RETRIEVE_TOOL_NAME.to_string(),
        description: "Retrieve information related to a query.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural-language query over the indexed documents."
                }
            },
            "required": ["query"]
        }),
    }
}

/// Result of one retrieval: the serialized payload the generation step sees
/// plus the raw matched chunks.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub serialized: String,
    pub chunks: Vec<Chunk>,
}

/// Wraps the vector index behind a callable contract. Read-only with respect
/// to index state.
#[derive(Clone)]
pub struct RetrieveTool {
    index: SharedIndex,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl RetrieveTool {
    pub fn new(index: SharedIndex, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Retrieval, ChatbotError> {
        let query_vector = self.embedder.embed_query(query).await?;
        let results = self
            .index
            .read()
            .await
            .search(&query_vector, self.top_k)
            .map_err(|err| ChatbotError::Retrieval(err.to_string()))?;

        tracing::debug!(query, hits = results.len(), "retrieved chunks");

        let serialized = results
            .iter()
            .map(|(chunk, _)| {
                format!(
                    "Source: {}\nContent: {}",
                    Value::Object(chunk.metadata.clone()),
                    chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = results.into_iter().map(|(chunk, _)| chunk).collect();

        Ok(Retrieval { serialized, chunks })
    }
}
