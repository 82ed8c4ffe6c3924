//! Text processing for TTS: line normalization and line-count chunking.

pub mod chunker;
mod cleaner;

pub use chunker::{LinesPerChunk, process_document};

use thiserror::Error;

/// Errors raised before any chunking happens.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("lines per chunk must be a positive integer, got {0}")]
    InvalidLinesPerChunk(usize),
}

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The document this chunk belongs to
    pub document_id: String,
    /// 1-based position of the chunk within its document
    pub index: usize,
    /// Normalized text content
    pub text: String,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(document_id: impl Into<String>, index: usize, text: String) -> Self {
        Self {
            document_id: document_id.into(),
            index,
            text,
        }
    }

    /// File name of this chunk's synthesized audio, e.g. `book_part007.wav`.
    pub fn part_file_name(&self) -> String {
        format!("{}_part{:03}.wav", self.document_id, self.index)
    }
}
