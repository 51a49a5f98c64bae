//! Chat model and embedder capabilities.
//!
//! `types` defines the message model exchanged with chat models, `provider`
//! the abstract capability traits, and `openai_compat` an implementation for
//! OpenAI-compatible HTTP endpoints.

pub mod openai_compat;
pub mod provider;
pub mod types;

pub use openai_compat::{OpenAiCompatEmbedder, OpenAiCompatFactory, OpenAiCompatProvider};
pub use provider::{ChatModel, ChatModelFactory, Embedder};
pub use types::{Message, ToolCall, ToolSpec};
