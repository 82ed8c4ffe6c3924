//! Line-count chunking for TTS processing.

use super::cleaner::{normalize_chunk, normalize_line};
use super::{ChunkError, TextChunk};
use std::num::NonZeroUsize;

/// Default number of source lines per chunk.
pub const DEFAULT_LINES_PER_CHUNK: usize = 10;

/// Validated chunk size, in source lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinesPerChunk(NonZeroUsize);

impl LinesPerChunk {
    /// Validate a chunk size. Zero is rejected.
    pub fn new(lines: usize) -> Result<Self, ChunkError> {
        NonZeroUsize::new(lines)
            .map(Self)
            .ok_or(ChunkError::InvalidLinesPerChunk(lines))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for LinesPerChunk {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_LINES_PER_CHUNK).unwrap_or(NonZeroUsize::MIN))
    }
}

/// Split text into chunks of at most `lines_per_chunk` source lines.
///
/// Blank lines are dropped before grouping, each kept line is normalized, and
/// each group is joined without a separator. Chunk order follows line order.
/// Empty input yields no chunks.
pub fn chunk_text(text: &str, lines_per_chunk: LinesPerChunk) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(normalize_line)
        .collect();

    lines
        .chunks(lines_per_chunk.get())
        .map(|group| normalize_chunk(&group.concat()))
        .collect()
}

/// Process a document's text into indexed chunks (1-based).
pub fn process_document(
    document_id: &str,
    text: &str,
    lines_per_chunk: LinesPerChunk,
) -> Vec<TextChunk> {
    chunk_text(text, lines_per_chunk)
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextChunk::new(document_id, i + 1, text))
        .collect()
}
