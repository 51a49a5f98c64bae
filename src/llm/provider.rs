use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::ModelConfig;
use crate::errors::ChatbotError;

use super::types::{Message, ToolSpec};

/// Chat completion capability.
///
/// `stream` yields incremental content fragments of the assistant message
/// over a channel; the stream ends when the channel closes.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ChatbotError>;

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<mpsc::Receiver<Result<String, ChatbotError>>, ChatbotError>;
}

/// Text embedding capability.
///
/// `embed` is batched over document chunks; `embed_query` may take a
/// distinct code path for queries but honors the same contract.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatbotError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ChatbotError>;
}

/// Builds chat model handles from configuration.
///
/// Implementations probe the provider during `build` so that
/// model-initialization failures surface as `InvalidCredentials`,
/// distinguishable from transient provider errors.
#[async_trait]
pub trait ChatModelFactory: Send + Sync {
    async fn build(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ChatbotError>;
}
