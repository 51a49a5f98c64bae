//! Text splitting into overlapping chunks.
//!
//! Documents are split into consecutive windows of at most `chunk_size`
//! characters with `overlap` characters shared between adjacent windows.
//! Window ends prefer a configured separator boundary near the end of the
//! window before falling back to a hard character cut. Splitting is fully
//! deterministic.

use crate::document::{Chunk, Document};
use crate::errors::ChatbotError;

/// Default separator boundaries, most-preferred first.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " "];

/// Fraction of the window (from its end) searched for a separator boundary.
const BOUNDARY_SEARCH_FRACTION: usize = 5;

#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextChunker {
    /// Build a chunker with the default separators.
    ///
    /// Fails with a configuration error when `chunk_size` is zero or
    /// `overlap >= chunk_size`, before any splitting takes place.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChatbotError> {
        Self::with_separators(
            chunk_size,
            overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_separators(
        chunk_size: usize,
        overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self, ChatbotError> {
        if chunk_size == 0 {
            return Err(ChatbotError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ChatbotError::Configuration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
            separators,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split each document into chunks carrying the parent metadata and the
    /// character offset of the chunk within the parent content.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for (start_index, content) in self.split_text(&document.content) {
                chunks.push(Chunk {
                    content,
                    start_index,
                    metadata: document.metadata.clone(),
                });
            }
        }
        chunks
    }

    /// Split a single text into `(start_index, content)` windows.
    ///
    /// Offsets are in characters, strictly increasing, and the union of the
    /// produced ranges covers the whole text.
    fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut windows = Vec::new();
        if total == 0 {
            return windows;
        }

        let mut start = 0;
        loop {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end < total {
                self.snap_to_separator(&chars, start, hard_end)
            } else {
                hard_end
            };

            windows.push((start, chars[start..end].iter().collect()));

            if end >= total {
                break;
            }
            let mut next = end.saturating_sub(self.overlap);
            if next <= start {
                next = start + 1;
            }
            start = next;
        }
        windows
    }

    /// Prefer the latest separator occurrence near the window end; fall back
    /// to the hard cut when none of the separators appears late enough.
    fn snap_to_separator(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let window = &chars[start..hard_end];
        let floor = window.len() - window.len() / BOUNDARY_SEARCH_FRACTION;
        let mut best: Option<usize> = None;

        for separator in &self.separators {
            let sep: Vec<char> = separator.chars().collect();
            if sep.is_empty() || sep.len() > window.len() {
                continue;
            }
            let mut pos = window.len() - sep.len();
            loop {
                if window[pos..pos + sep.len()] == sep[..] {
                    let cut = pos + sep.len();
                    if cut >= floor && cut > 0 {
                        best = Some(best.map_or(cut, |b| b.max(cut)));
                    }
                    break;
                }
                if pos == 0 {
                    break;
                }
                pos -= 1;
            }
        }

        match best {
            Some(cut) => start + cut,
            None => hard_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document::new(content, "test.txt")
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        assert!(TextChunker::new(100, 100).is_err());
        assert!(TextChunker::new(100, 150).is_err());
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn offsets_increase_and_ranges_cover_the_document() {
        let text = "abcdefghij".repeat(250); // 2500 chars
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.split(&[doc(&text)]);

        assert!(chunks.len() >= 3);
        let mut covered_to = 0;
        let mut previous_start = None;
        for chunk in &chunks {
            if let Some(prev) = previous_start {
                assert!(chunk.start_index > prev, "start offsets must increase");
            }
            assert!(chunk.start_index <= covered_to, "ranges must not leave gaps");
            assert!(chunk.content.chars().count() <= 1000);
            covered_to = covered_to.max(chunk.start_index + chunk.content.chars().count());
            previous_start = Some(chunk.start_index);
        }
        assert_eq!(covered_to, 2500);
    }

    #[test]
    fn adjacent_chunks_share_overlap() {
        let text = "x".repeat(1800);
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.split(&[doc(&text)]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start_index, 0);
        assert_eq!(chunks[1].start_index, 800);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let mut text = "a".repeat(950);
        text.push_str("\n\n");
        text.push_str(&"b".repeat(600));
        let chunker = TextChunker::new(1000, 100).unwrap();
        let chunks = chunker.split(&[doc(&text)]);

        // First window ends right after the paragraph break instead of at a
        // hard cut inside the second paragraph.
        assert_eq!(chunks[0].content.chars().count(), 952);
        assert!(chunks[0].content.ends_with("\n\n"));
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(60);
        let chunker = TextChunker::new(300, 60).unwrap();
        let first = chunker.split(&[doc(&text)]);
        let second = chunker.split(&[doc(&text)]);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.start_index, b.start_index);
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunker = TextChunker::new(100, 10).unwrap();
        assert!(chunker.split(&[doc("")]).is_empty());
    }

    #[test]
    fn short_document_yields_single_full_chunk() {
        let chunker = TextChunker::new(100, 10).unwrap();
        let chunks = chunker.split(&[doc("short text")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_index, 0);
        assert_eq!(chunks[0].content, "short text");
        assert_eq!(chunks[0].source(), "test.txt");
    }
}
