//! Per-chunk and per-document outcomes.

use crate::tts::SynthesisError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Processing phases of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPhase {
    Chunking,
    Synthesizing { index: usize, total: usize },
    Merging,
    Done,
}

impl fmt::Display for DocumentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentPhase::Chunking => write!(f, "chunking"),
            DocumentPhase::Synthesizing { index, total } => {
                write!(f, "synthesizing {}/{}", index, total)
            }
            DocumentPhase::Merging => write!(f, "merging"),
            DocumentPhase::Done => write!(f, "done"),
        }
    }
}

/// Result of one chunk's single synthesis attempt.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// Audio saved to `path`
    Synthesized { index: usize, path: PathBuf },
    /// Normalized text was empty; no request sent
    Skipped { index: usize },
    Failed(ChunkFailure),
}

impl ChunkOutcome {
    pub fn index(&self) -> usize {
        match self {
            ChunkOutcome::Synthesized { index, .. } | ChunkOutcome::Skipped { index } => *index,
            ChunkOutcome::Failed(failure) => failure.index,
        }
    }
}

/// A chunk whose synthesis failed.
#[derive(Debug)]
pub struct ChunkFailure {
    pub index: usize,
    pub error: SynthesisError,
}

/// What happened to the final merged file.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Merging was turned off; parts are kept
    NotRequested,
    /// No chunk succeeded, so there was nothing to merge
    Skipped,
    Merged { path: PathBuf, duration: Duration },
    /// Merge failed; parts are kept for recovery
    Failed { reason: String },
}

/// Summary of one document's run.
#[derive(Debug)]
pub struct ProcessingReport {
    pub document_id: String,
    pub total_chunks: usize,
    pub outcomes: Vec<ChunkOutcome>,
    pub merge: MergeOutcome,
    pub elapsed: Duration,
}

impl ProcessingReport {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            total_chunks: 0,
            outcomes: Vec::new(),
            merge: MergeOutcome::Skipped,
            elapsed: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChunkOutcome::Synthesized { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChunkOutcome::Skipped { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChunkFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            ChunkOutcome::Failed(failure) => Some(failure),
            _ => None,
        })
    }

    /// Audio files of successful chunks, in ascending chunk order.
    pub fn part_files(&self) -> Vec<PathBuf> {
        let mut parts: Vec<(usize, &PathBuf)> = self
            .outcomes
            .iter()
            .filter_map(|o| match o {
                ChunkOutcome::Synthesized { index, path } => Some((*index, path)),
                _ => None,
            })
            .collect();
        parts.sort_by_key(|(index, _)| *index);
        parts.into_iter().map(|(_, path)| path.clone()).collect()
    }

    /// The document had no speakable content.
    pub fn is_empty(&self) -> bool {
        self.total_chunks == 0
    }

    pub fn merged(&self) -> bool {
        matches!(self.merge, MergeOutcome::Merged { .. })
    }

    /// Every chunk was synthesized (or skipped) and the merge, if any, worked.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none() && !matches!(self.merge, MergeOutcome::Failed { .. })
    }
}
