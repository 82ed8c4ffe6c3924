//! Per-document orchestration: chunk, synthesize each chunk once, merge.

mod document;
mod report;

pub use document::{Document, document_id};
pub use report::{ChunkFailure, ChunkOutcome, DocumentPhase, MergeOutcome, ProcessingReport};

use crate::audio::{merge_wav_files, wav_duration};
use crate::text::{LinesPerChunk, TextChunk, process_document};
use crate::tts::{EmotionOptions, SynthesisBackend, SynthesisRequest};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Directory under the output directory holding per-chunk audio.
pub const TEMP_DIR_NAME: &str = "temp_parts";

/// Characters of chunk text shown in logs.
const PREVIEW_CHARS: usize = 80;

/// Settings for processing documents, fixed for a whole run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where merged files (and the temp parts directory) go
    pub output_dir: PathBuf,
    /// Speaker reference audio, passed through to the service
    pub speaker_audio: PathBuf,
    pub lines_per_chunk: LinesPerChunk,
    /// Merge parts into `{document}.wav`
    pub merge_final: bool,
    pub emotion: EmotionOptions,
    /// Draw a progress bar while synthesizing
    pub show_progress: bool,
}

impl PipelineConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.output_dir.join(TEMP_DIR_NAME)
    }

    pub fn final_output_path(&self, document_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.wav", document_id))
    }
}

/// Runs one document at a time through chunking, synthesis and merging.
pub struct DocumentProcessor {
    backend: Arc<dyn SynthesisBackend>,
    config: PipelineConfig,
}

impl DocumentProcessor {
    pub fn new(backend: Arc<dyn SynthesisBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one document. Failures are recorded in the report, never returned.
    pub async fn process(&self, document: &Document) -> ProcessingReport {
        let started = Instant::now();
        let mut report = ProcessingReport::new(&document.id);

        debug!("{}: {}", document.id, DocumentPhase::Chunking);
        info!(
            "{}: {} characters read from {}",
            document.id,
            document.text.chars().count(),
            document.path.display()
        );
        let chunks = process_document(&document.id, &document.text, self.config.lines_per_chunk);
        report.total_chunks = chunks.len();

        if chunks.is_empty() {
            warn!("{}: no speakable text, nothing to synthesize", document.id);
            report.elapsed = started.elapsed();
            return report;
        }
        info!(
            "{}: split into {} chunks of up to {} lines",
            document.id,
            chunks.len(),
            self.config.lines_per_chunk.get()
        );

        report.outcomes = self.synthesize_chunks(&chunks).await;

        report.merge = if !self.config.merge_final {
            MergeOutcome::NotRequested
        } else {
            let parts = report.part_files();
            if parts.is_empty() {
                warn!("{}: no chunk succeeded, skipping merge", document.id);
                MergeOutcome::Skipped
            } else {
                debug!("{}: {}", document.id, DocumentPhase::Merging);
                self.merge_parts(&document.id, &parts)
            }
        };

        report.elapsed = started.elapsed();
        debug!("{}: {}", document.id, DocumentPhase::Done);
        info!(
            "{}: {}/{} chunks synthesized ({} skipped) in {:.2}s",
            document.id,
            report.succeeded(),
            report.total_chunks,
            report.skipped(),
            report.elapsed.as_secs_f64()
        );

        report
    }

    /// Synthesize every chunk once, in order, continuing past failures.
    async fn synthesize_chunks(&self, chunks: &[TextChunk]) -> Vec<ChunkOutcome> {
        let total = chunks.len();
        let temp_dir = self.config.temp_dir();
        let progress = self.progress_bar(total);
        let mut outcomes = Vec::with_capacity(total);

        for chunk in chunks {
            let phase = DocumentPhase::Synthesizing {
                index: chunk.index,
                total,
            };
            debug!("{}: {}", chunk.document_id, phase);

            let outcome = if chunk.text.is_empty() {
                ChunkOutcome::Skipped { index: chunk.index }
            } else {
                debug!("{}: \"{}\"", chunk.document_id, preview(&chunk.text));
                let request = SynthesisRequest::new(
                    &chunk.text,
                    &self.config.speaker_audio,
                    &self.config.emotion,
                );
                let path = temp_dir.join(chunk.part_file_name());

                match self.backend.synthesize_to_file(&request, &path).await {
                    Ok(_) => ChunkOutcome::Synthesized {
                        index: chunk.index,
                        path,
                    },
                    Err(error) => ChunkOutcome::Failed(ChunkFailure {
                        index: chunk.index,
                        error,
                    }),
                }
            };

            match &outcome {
                ChunkOutcome::Synthesized { path, .. } => {
                    let seconds = wav_duration(path).map(|d| d.as_secs_f64()).unwrap_or(0.0);
                    info!(
                        "{}: chunk {}/{} saved to {} ({:.2}s)",
                        chunk.document_id,
                        outcome.index(),
                        total,
                        path.display(),
                        seconds
                    );
                }
                ChunkOutcome::Skipped { .. } => {
                    warn!(
                        "{}: chunk {}/{} is empty after normalization, skipped",
                        chunk.document_id,
                        outcome.index(),
                        total
                    );
                }
                ChunkOutcome::Failed(failure) => {
                    warn!(
                        "{}: chunk {}/{} failed via {}: {}",
                        chunk.document_id,
                        failure.index,
                        total,
                        self.backend.endpoint(),
                        failure.error
                    );
                }
            }

            outcomes.push(outcome);
            progress.inc(1);
        }

        progress.finish_and_clear();
        outcomes
    }

    /// Merge `parts` (already in chunk order) into the document's output file.
    fn merge_parts(&self, document_id: &str, parts: &[PathBuf]) -> MergeOutcome {
        let output = self.config.final_output_path(document_id);
        let inputs: Vec<&Path> = parts.iter().map(|p| p.as_path()).collect();
        info!("{}: merging {} audio parts", document_id, inputs.len());

        match merge_wav_files(&inputs, &output) {
            Ok(summary) => {
                info!(
                    "{}: merged {} parts into {} ({:.2}s)",
                    document_id,
                    summary.segments,
                    output.display(),
                    summary.duration().as_secs_f64()
                );
                remove_parts(parts, &self.config.temp_dir());
                MergeOutcome::Merged {
                    path: output,
                    duration: summary.duration(),
                }
            }
            Err(e) => {
                error!(
                    "{}: merge failed ({}); keeping {} parts in {}",
                    document_id,
                    e,
                    parts.len(),
                    self.config.temp_dir().display()
                );
                MergeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Delete this document's part files, then the temp directory if it is empty.
///
/// Parts left behind by other documents' failed merges stay put.
fn remove_parts(parts: &[PathBuf], temp_dir: &Path) {
    for part in parts {
        if let Err(e) = fs::remove_file(part) {
            warn!("Failed to remove {}: {}", part.display(), e);
        }
    }

    let is_empty = fs::read_dir(temp_dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        if let Err(e) = fs::remove_dir(temp_dir) {
            warn!("Failed to remove {}: {}", temp_dir.display(), e);
        }
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
