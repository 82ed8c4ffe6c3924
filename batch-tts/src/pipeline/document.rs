//! Input documents.

use anyhow::{Context, Result};
use encoding_rs::GBK;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// A text document to synthesize, identified by its file stem.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    /// Read a document from disk.
    ///
    /// Text that is not UTF-8 is decoded as GBK. Bytes that are neither are
    /// replaced rather than rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let text = decode_text(path, bytes);

        Ok(Self {
            id: document_id(path),
            path: path.to_path_buf(),
            text,
        })
    }
}

fn decode_text(path: &Path, bytes: Vec<u8>) -> String {
    let bytes = match String::from_utf8(bytes) {
        Ok(text) => return text,
        Err(e) => e.into_bytes(),
    };

    let (text, had_errors) = GBK.decode_without_bom_handling(&bytes);
    if had_errors {
        warn!(
            "{} is neither UTF-8 nor GBK; undecodable bytes replaced",
            path.display()
        );
    } else {
        warn!("{} is not valid UTF-8, decoded as GBK", path.display());
    }
    text.into_owned()
}

/// File stem used as the document's id and output name.
pub fn document_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
