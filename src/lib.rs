//! Conversational retrieval over a private document collection.
//!
//! Documents are ingested into an in-memory vector index (extraction,
//! chunking, embedding, indexing) and a per-session conversation engine
//! decides each turn whether to answer directly or consult the index through
//! a retrieval tool, streaming the final answer incrementally when asked to.

pub mod chunker;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod retrieval;
pub mod session;

pub use chunker::TextChunker;
pub use config::{AppConfig, ChunkConfig, EmbeddingConfig, IndexConfig, ModelConfig, RetrievalConfig};
pub use document::{Chunk, Document};
pub use engine::ConversationEngine;
pub use errors::ChatbotError;
pub use extract::{PlainTextExtractor, TextExtractor};
pub use index::{DistanceMetric, SharedIndex, VectorIndex};
pub use ingest::{IngestReport, IngestionPipeline, PageFilter, SourceFailure};
pub use llm::{ChatModel, ChatModelFactory, Embedder, Message, ToolCall, ToolSpec};
pub use retrieval::{retrieve_tool_spec, Retrieval, RetrieveTool, DEFAULT_TOP_K, RETRIEVE_TOOL_NAME};
pub use session::SessionManager;
