//! Audio merging for per-document output files.

#[cfg(test)]
pub mod fixtures;
pub mod merger;

pub use merger::{merge_wav_files, wav_duration};
