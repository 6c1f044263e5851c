//! Splitting normalized text into ordered chunks.

use crate::error::{FolioError, Result};
use crate::normalize::NormalizedText;
use std::fmt;
use std::sync::Arc;
use text_splitter::{Characters, ChunkConfig, MarkdownSplitter};

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_CAPACITY: usize = 8_000;

/// Markdown-aware splitter with a fixed character capacity and no overlap.
///
/// Splits prefer heading, paragraph and line boundaries before falling back
/// to sentences and words. Chunks are trimmed, so concatenating them yields
/// the normalized text minus the whitespace at the cut points.
pub struct Chunker {
    capacity: usize,
    splitter: MarkdownSplitter<Characters>,
}

impl fmt::Debug for Chunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunker")
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Chunker {
    /// Create a chunker.
    ///
    /// # Errors
    /// Returns `FolioError::Config` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FolioError::Config(
                "chunk capacity must be positive".to_string(),
            ));
        }
        let config = ChunkConfig::new(capacity).with_trim(true);
        Ok(Self {
            capacity,
            splitter: MarkdownSplitter::new(config),
        })
    }

    /// Maximum characters per chunk.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Split text into chunks; empty text yields no chunks.
    pub fn split(&self, text: &NormalizedText) -> ChunkSet {
        let chunks: Vec<String> = self
            .splitter
            .chunks(text.as_str())
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect();
        ChunkSet::from(chunks)
    }
}

/// Immutable, cheaply clonable ordered chunks of one filing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSet {
    chunks: Arc<[String]>,
}

impl ChunkSet {
    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether there are no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk at `cursor`.
    pub fn get(&self, cursor: usize) -> Option<&str> {
        self.chunks.get(cursor).map(String::as_str)
    }

    /// Last valid cursor, `None` when empty.
    pub fn max_cursor(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }

    /// Iterate the chunks in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ChunkSet {
    fn from(chunks: Vec<String>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::DocumentNormalizer;
    use folio_data::edgar::{ContentHint, RawDocument};

    fn text(source: &str) -> NormalizedText {
        let doc = RawDocument {
            bytes: source.as_bytes().to_vec(),
            hint: ContentHint::Text,
        };
        DocumentNormalizer::new().normalize(&doc).unwrap()
    }

    fn squash(s: &str) -> String {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(Chunker::new(0), Err(FolioError::Config(_))));
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = Chunker::new(100).unwrap().split(&text("Item 1. Business"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks.max_cursor(), Some(0));
        assert_eq!(chunks.get(0), Some("Item 1. Business"));
        assert_eq!(chunks.get(1), None);
    }

    #[test]
    fn test_chunks_respect_capacity_and_cover_text() {
        let source = (0..40)
            .map(|i| format!("Paragraph {} describes the business in some detail.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let normalized = text(&source);
        let chunks = Chunker::new(120).unwrap().split(&normalized);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 120));
        assert!(chunks.iter().all(|c| !c.is_empty()));
        let joined: String = chunks.iter().collect();
        assert_eq!(squash(&joined), squash(normalized.as_str()));
    }

    #[test]
    fn test_split_is_deterministic() {
        let normalized = text(&"Revenue grew. Costs fell. ".repeat(200));
        let chunker = Chunker::new(256).unwrap();
        assert_eq!(chunker.split(&normalized), chunker.split(&normalized));
    }

    #[test]
    fn test_empty_set() {
        let chunks = ChunkSet::from(Vec::new());
        assert!(chunks.is_empty());
        assert_eq!(chunks.max_cursor(), None);
    }
}
