// EPUB to plain-text conversion, producing sweep-ready .txt files

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default lines per output file when splitting.
pub const DEFAULT_LINES_PER_FILE: usize = 64;

/// Width passed to html2text; wide enough that paragraphs stay on one line.
const TEXT_WIDTH: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Lines per output file; 0 writes a single file
    pub lines_per_file: usize,
    /// Drop a line identical to the one before it
    pub remove_adjacent_duplicates: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            lines_per_file: DEFAULT_LINES_PER_FILE,
            remove_adjacent_duplicates: true,
        }
    }
}

/// Files written by a conversion.
#[derive(Debug, PartialEq, Eq)]
pub enum ConvertOutput {
    Single { path: PathBuf, lines: usize },
    Split { dir: PathBuf, files: Vec<PathBuf>, lines: usize },
}

/// Convert an EPUB into one text file, or numbered files in a directory.
pub fn convert_epub(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConvertOutput> {
    let mut lines = extract_lines(input)?;
    if lines.is_empty() {
        anyhow::bail!("No text found in {}", input.display());
    }

    if options.remove_adjacent_duplicates {
        lines = remove_adjacent_duplicates(lines);
    }

    write_lines(&lines, output, options.lines_per_file)
}

/// Extract trimmed, non-blank text lines from every document in reading order.
pub fn extract_lines(path: &Path) -> Result<Vec<String>> {
    let mut doc =
        epub::doc::EpubDoc::new(path).map_err(|e| anyhow::anyhow!("Failed to open EPUB: {}", e))?;

    let mut lines = Vec::new();
    let spine = doc.spine.clone();

    for spine_item in spine.iter() {
        if let Some((content_bytes, _mime)) = doc.get_resource(&spine_item.idref) {
            lines.extend(html_to_lines(&content_bytes));
        }
    }

    Ok(lines)
}

/// Convert one HTML document to trimmed, non-blank lines.
fn html_to_lines(html: &[u8]) -> Vec<String> {
    html2text::from_read(html, TEXT_WIDTH)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn remove_adjacent_duplicates(mut lines: Vec<String>) -> Vec<String> {
    lines.dedup();
    lines
}

/// Write lines to `output`.
///
/// With `lines_per_file > 0` and more lines than that, `output` is a directory
/// of `000000.txt`, `000001.txt`, ...; otherwise it is a single file.
fn write_lines(lines: &[String], output: &Path, lines_per_file: usize) -> Result<ConvertOutput> {
    if lines_per_file > 0 && lines.len() > lines_per_file {
        fs::create_dir_all(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;

        let mut files = Vec::new();
        for (i, group) in lines.chunks(lines_per_file).enumerate() {
            let path = output.join(format!("{:06}.txt", i));
            write_file(&path, group)?;
            files.push(path);
        }

        return Ok(ConvertOutput::Split {
            dir: output.to_path_buf(),
            files,
            lines: lines.len(),
        });
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    write_file(output, lines)?;

    Ok(ConvertOutput::Single {
        path: output.to_path_buf(),
        lines: lines.len(),
    })
}

fn write_file(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
