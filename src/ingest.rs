//! Document ingestion: extraction, chunking, embedding, indexing.
//!
//! Extraction fans out concurrently across sources; one source's failure is
//! recorded and never aborts the batch. Chunking, embedding, and index
//! insertion run sequentially so assigned ids follow chunk order.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use crate::chunker::TextChunker;
use crate::document::Document;
use crate::errors::ChatbotError;
use crate::extract::TextExtractor;
use crate::index::SharedIndex;
use crate::llm::Embedder;

const EMBED_ATTEMPTS: u32 = 3;
const EMBED_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Explicit page pre-filter applied between extraction and chunking.
///
/// Off by default; pages outside `keep` are dropped before the pages are
/// joined into a document.
#[derive(Debug, Clone)]
pub struct PageFilter {
    pub keep: Range<usize>,
}

impl PageFilter {
    pub fn apply(&self, pages: Vec<String>) -> Vec<String> {
        pages
            .into_iter()
            .enumerate()
            .filter(|(i, _)| self.keep.contains(i))
            .map(|(_, page)| page)
            .collect()
    }
}

/// A source that failed extraction; the rest of the batch proceeded.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Index record ids, in chunk order.
    pub inserted_ids: Vec<String>,
    pub failures: Vec<SourceFailure>,
}

pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    index: SharedIndex,
    chunker: TextChunker,
    page_filter: Option<PageFilter>,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        index: SharedIndex,
        chunker: TextChunker,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            chunker,
            page_filter: None,
        }
    }

    pub fn with_page_filter(mut self, filter: PageFilter) -> Self {
        self.page_filter = Some(filter);
        self
    }

    /// Ingest a batch of sources into the index.
    ///
    /// Returns the assigned record ids plus the per-source extraction
    /// failures. Fails as a whole only on embedding or index errors.
    pub async fn ingest(&self, sources: &[PathBuf]) -> Result<IngestReport, ChatbotError> {
        let mut documents = Vec::new();
        let mut failures = Vec::new();

        let tasks: Vec<_> = sources
            .iter()
            .map(|path| {
                let extractor = Arc::clone(&self.extractor);
                let path = path.clone();
                tokio::spawn(async move { extractor.extract(&path).await })
            })
            .collect();

        for (path, joined) in sources.iter().zip(join_all(tasks).await) {
            match joined {
                Ok(Ok(pages)) => {
                    let pages = match &self.page_filter {
                        Some(filter) => filter.apply(pages),
                        None => pages,
                    };
                    documents.push(Document::new(pages.join("\n"), source_name(path)));
                }
                Ok(Err(err)) => {
                    tracing::warn!(path = %path.display(), error = %err, "extraction failed, skipping source");
                    failures.push(SourceFailure {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "extraction task failed, skipping source");
                    failures.push(SourceFailure {
                        path: path.display().to_string(),
                        reason: format!("extraction task failed: {err}"),
                    });
                }
            }
        }

        let chunks = self.chunker.split(&documents);
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "split sources into chunks"
        );

        if chunks.is_empty() {
            return Ok(IngestReport {
                inserted_ids: Vec::new(),
                failures,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embed_with_retry(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(ChatbotError::Provider(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<_> = chunks.into_iter().zip(vectors).collect();
        let ids = self.index.write().await.insert(records)?;
        for id in &ids {
            tracing::info!(%id, "created index record");
        }
        tracing::info!(inserted = ids.len(), failed_sources = failures.len(), "ingestion complete");

        Ok(IngestReport {
            inserted_ids: ids,
            failures,
        })
    }

    async fn embed_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatbotError> {
        let mut attempt = 1;
        loop {
            match self.embedder.embed(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) if err.is_transient() && attempt < EMBED_ATTEMPTS => {
                    tracing::warn!(attempt, error = %err, "embedding failed, retrying");
                    tokio::time::sleep(EMBED_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_filter_keeps_configured_range() {
        let filter = PageFilter { keep: 1..3 };
        let pages = vec!["cover".into(), "body1".into(), "body2".into(), "index".into()];
        assert_eq!(filter.apply(pages), vec!["body1".to_string(), "body2".to_string()]);
    }

    #[test]
    fn source_name_uses_file_name() {
        assert_eq!(source_name(Path::new("/data/docs/report.txt")), "report.txt");
    }
}
