//! Text extraction capability.

use std::path::Path;

use async_trait::async_trait;

use crate::errors::ChatbotError;

/// Extracts the raw text of a source document as a sequence of pages.
///
/// Page granularity is kept so the ingestion pipeline can apply an explicit
/// page pre-filter before chunking. Sources without a page concept return a
/// single page.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, source: &Path) -> Result<Vec<String>, ChatbotError>;
}

/// Reads UTF-8 text files; the whole file is one page.
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, source: &Path) -> Result<Vec<String>, ChatbotError> {
        let text = tokio::fs::read_to_string(source)
            .await
            .map_err(|err| ChatbotError::Extraction {
                path: source.display().to_string(),
                reason: err.to_string(),
            })?;
        Ok(vec![text])
    }
}
