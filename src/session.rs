//! Session management: builds and replaces conversation engines over a
//! shared vector index.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chunker::TextChunker;
use crate::config::{AppConfig, ModelConfig};
use crate::engine::ConversationEngine;
use crate::errors::ChatbotError;
use crate::extract::TextExtractor;
use crate::index::{SharedIndex, VectorIndex};
use crate::ingest::{IngestReport, IngestionPipeline, PageFilter};
use crate::llm::{ChatModelFactory, Embedder};
use crate::retrieval::RetrieveTool;

/// Owns the active conversation engine and the index it answers from.
///
/// `create` runs the full ingestion pipeline and then constructs an engine;
/// `replace_model` swaps the engine wholesale (fresh thread id, empty
/// history) over the same already-built index without re-running ingestion.
pub struct SessionManager {
    factory: Arc<dyn ChatModelFactory>,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    config: AppConfig,
    page_filter: Option<PageFilter>,
    index: Option<SharedIndex>,
    engine: Option<ConversationEngine>,
}

impl SessionManager {
    pub fn new(
        factory: Arc<dyn ChatModelFactory>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        config: AppConfig,
    ) -> Self {
        Self {
            factory,
            extractor,
            embedder,
            config,
            page_filter: None,
            index: None,
            engine: None,
        }
    }

    /// Enable the explicit page pre-filter for subsequent ingestion runs.
    pub fn with_page_filter(mut self, filter: PageFilter) -> Self {
        self.page_filter = Some(filter);
        self
    }

    /// Ingest `sources` into a fresh index and construct the conversation
    /// engine over it.
    pub async fn create(
        &mut self,
        model_config: &ModelConfig,
        sources: &[PathBuf],
    ) -> Result<IngestReport, ChatbotError> {
        self.config.validate()?;

        let chunker = TextChunker::with_separators(
            self.config.chunking.chunk_size,
            self.config.chunking.overlap,
            self.config.chunking.separators.clone(),
        )?;
        let index =
            VectorIndex::new(self.config.index.dimension, self.config.index.metric)?
                .into_shared();

        let mut pipeline = IngestionPipeline::new(
            Arc::clone(&self.extractor),
            Arc::clone(&self.embedder),
            Arc::clone(&index),
            chunker,
        );
        if let Some(filter) = &self.page_filter {
            pipeline = pipeline.with_page_filter(filter.clone());
        }
        let report = pipeline.ingest(sources).await?;
        // Keep the populated index even if the model build below fails, so
        // a later replace_model can reuse it without re-ingesting.
        self.index = Some(Arc::clone(&index));

        let model = self.factory.build(model_config).await?;
        let retriever = RetrieveTool::new(
            index,
            Arc::clone(&self.embedder),
            self.config.retrieval.top_k,
        );
        self.engine = Some(ConversationEngine::new(model, retriever));
        Ok(report)
    }

    /// Discard the active engine and its thread, build a new chat model
    /// handle, and construct a fresh engine over the same index.
    pub async fn replace_model(
        &mut self,
        model_config: &ModelConfig,
    ) -> Result<(), ChatbotError> {
        let index = self.index.clone().ok_or_else(|| {
            ChatbotError::Configuration(
                "no index available; run create before replace_model".to_string(),
            )
        })?;

        let model = self.factory.build(model_config).await?;
        let retriever = RetrieveTool::new(
            index,
            Arc::clone(&self.embedder),
            self.config.retrieval.top_k,
        );
        let engine = ConversationEngine::new(model, retriever);
        if let Some(old) = &self.engine {
            tracing::info!(
                old_thread = %old.thread_id(),
                new_thread = %engine.thread_id(),
                "replaced chat model, discarding previous thread"
            );
        }
        self.engine = Some(engine);
        Ok(())
    }

    pub fn engine(&self) -> Option<&ConversationEngine> {
        self.engine.as_ref()
    }

    pub fn index(&self) -> Option<SharedIndex> {
        self.index.clone()
    }
}
