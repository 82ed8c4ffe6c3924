//! Directory sweep: run every eligible document through the pipeline.

use crate::pipeline::{Document, DocumentProcessor, MergeOutcome, ProcessingReport, document_id};
use anyhow::{Context, Result};
use log::{error, info};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Check what must hold before any document is touched.
pub fn check_preconditions(input_dir: &Path, speaker_audio: &Path) -> Result<()> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", input_dir.display());
    }
    if !speaker_audio.is_file() {
        anyhow::bail!("Speaker audio file not found: {}", speaker_audio.display());
    }
    Ok(())
}

/// Find input documents with the given extension, sorted by path.
///
/// Fails when two files share a document id, since they would write the
/// same output and part files.
pub fn find_documents(dir: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            if entry.file_type().is_file() && has_extension(entry.path(), extension) {
                files.push(entry.path().to_path_buf());
            }
        }
    } else {
        for entry in std::fs::read_dir(dir).context("Failed to read directory")? {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if path.is_file() && has_extension(&path, extension) {
                files.push(path);
            }
        }
    }

    files.sort();
    check_unique_ids(&files)?;
    Ok(files)
}

fn check_unique_ids(files: &[PathBuf]) -> Result<()> {
    let mut by_id: BTreeMap<String, Vec<&PathBuf>> = BTreeMap::new();
    for path in files {
        by_id.entry(document_id(path)).or_default().push(path);
    }

    let clashes: Vec<String> = by_id
        .iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(id, paths)| {
            let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            format!("{} ({})", id, paths.join(", "))
        })
        .collect();

    if !clashes.is_empty() {
        anyhow::bail!(
            "Input files share an output name; rename them or sweep them separately: {}",
            clashes.join("; ")
        );
    }
    Ok(())
}

/// Case-insensitive extension check.
fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// What happened to one input file.
#[derive(Debug)]
pub enum DocumentResult {
    Processed(ProcessingReport),
    /// The file could not be read
    Unreadable(String),
}

#[derive(Debug)]
pub struct DocumentRun {
    pub path: PathBuf,
    pub result: DocumentResult,
    pub elapsed: Duration,
}

impl DocumentRun {
    pub fn is_success(&self) -> bool {
        match &self.result {
            DocumentResult::Processed(report) => report.is_success(),
            DocumentResult::Unreadable(_) => false,
        }
    }
}

/// Outcome of a whole sweep.
#[derive(Debug, Default)]
pub struct SweepSummary {
    pub runs: Vec<DocumentRun>,
    pub elapsed: Duration,
}

impl SweepSummary {
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.len() - self.succeeded()
    }

    /// Documents that had no speakable text.
    pub fn empty(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| matches!(&r.result, DocumentResult::Processed(report) if report.is_empty()))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Process each file in turn. One document's failure never stops the sweep.
pub async fn run_sweep(processor: &DocumentProcessor, files: &[PathBuf]) -> SweepSummary {
    let started = Instant::now();
    let mut summary = SweepSummary::default();

    for (i, path) in files.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!("[{}/{}] {}", i + 1, files.len(), name);

        let document_started = Instant::now();
        let result = match Document::load(path) {
            Ok(document) => DocumentResult::Processed(processor.process(&document).await),
            Err(e) => {
                error!("{}: {:#}", name, e);
                DocumentResult::Unreadable(format!("{:#}", e))
            }
        };
        let run = DocumentRun {
            path: path.clone(),
            result,
            elapsed: document_started.elapsed(),
        };

        log_document_run(&name, &run);
        summary.runs.push(run);
    }

    summary.elapsed = started.elapsed();
    log_summary(&summary, &processor.config().output_dir);
    summary
}

fn log_document_run(name: &str, run: &DocumentRun) {
    let status = match &run.result {
        DocumentResult::Unreadable(_) => "unreadable".to_string(),
        DocumentResult::Processed(report) if report.is_empty() => "no content".to_string(),
        DocumentResult::Processed(report) => {
            let merge = match &report.merge {
                MergeOutcome::NotRequested => "parts kept".to_string(),
                MergeOutcome::Skipped => "merge skipped".to_string(),
                MergeOutcome::Merged { path, duration } => format!(
                    "merged to {} ({:.2}s of audio)",
                    path.display(),
                    duration.as_secs_f64()
                ),
                MergeOutcome::Failed { reason } => format!("merge failed: {}", reason),
            };
            format!(
                "{}/{} chunks, {}",
                report.succeeded(),
                report.total_chunks,
                merge
            )
        }
    };
    info!("{}: {} ({:.2}s)", name, status, run.elapsed.as_secs_f64());
}

fn log_summary(summary: &SweepSummary, output_dir: &Path) {
    info!(
        "Sweep finished: {} documents, {} succeeded, {} failed, {} empty in {:.2}s",
        summary.runs.len(),
        summary.succeeded(),
        summary.failed(),
        summary.empty(),
        summary.elapsed.as_secs_f64()
    );
    info!("Output directory: {}", output_dir.display());
    for run in summary.runs.iter().filter(|r| !r.is_success()) {
        let reason = match &run.result {
            DocumentResult::Unreadable(reason) => reason.clone(),
            DocumentResult::Processed(report) => match &report.merge {
                MergeOutcome::Failed { reason } => format!("merge failed: {}", reason),
                _ => format!(
                    "{} of {} chunks failed",
                    report.failures().count(),
                    report.total_chunks
                ),
            },
        };
        error!("Failed: {} ({})", run.path.display(), reason);
    }
}
