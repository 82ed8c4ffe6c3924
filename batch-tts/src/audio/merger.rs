//! WAV concatenation.
//!
//! Inputs are concatenated sample for sample in the order given. The merger
//! never reorders: callers decide the order.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("no audio files to merge")]
    NoInputs,

    #[error("{}: format {found} does not match {expected}", .path.display())]
    FormatMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a merge produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    /// Number of input files merged
    pub segments: usize,
    /// Sample frames written (samples per channel)
    pub frames: u64,
    /// Format shared by every input and the output
    pub spec: WavSpec,
}

impl MergeSummary {
    /// Playback length of the merged output.
    pub fn duration(&self) -> Duration {
        frames_to_duration(self.frames, self.spec.sample_rate)
    }
}

/// Concatenate WAV files into `output_path`, in the order given.
///
/// All inputs must share the first input's format. A partially written
/// output is removed on failure.
pub fn merge_wav_files(inputs: &[&Path], output_path: &Path) -> Result<MergeSummary, MergeError> {
    let first = inputs.first().ok_or(MergeError::NoInputs)?;
    let spec = WavReader::open(first)?.spec();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = write_concatenated(inputs, output_path, spec);
    if result.is_err() && output_path.exists() {
        let _ = fs::remove_file(output_path);
    }
    result
}

fn write_concatenated(
    inputs: &[&Path],
    output_path: &Path,
    spec: WavSpec,
) -> Result<MergeSummary, MergeError> {
    let mut writer = WavWriter::create(output_path, spec)?;
    let mut samples: u64 = 0;

    for path in inputs {
        let mut reader = WavReader::open(path)?;
        if reader.spec() != spec {
            return Err(MergeError::FormatMismatch {
                path: path.to_path_buf(),
                expected: describe(spec),
                found: describe(reader.spec()),
            });
        }

        match spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    writer.write_sample(sample?)?;
                    samples += 1;
                }
            }
            SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    writer.write_sample(sample?)?;
                    samples += 1;
                }
            }
        }
    }

    writer.finalize()?;

    Ok(MergeSummary {
        segments: inputs.len(),
        frames: samples / u64::from(spec.channels.max(1)),
        spec,
    })
}

/// Playback length of a single WAV file.
pub fn wav_duration(path: &Path) -> Result<Duration, MergeError> {
    let reader = WavReader::open(path)?;
    Ok(frames_to_duration(
        u64::from(reader.duration()),
        reader.spec().sample_rate,
    ))
}

fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
}

fn describe(spec: WavSpec) -> String {
    let format = match spec.sample_format {
        SampleFormat::Float => "float",
        SampleFormat::Int => "int",
    };
    format!(
        "{} Hz, {} ch, {}-bit {}",
        spec.sample_rate, spec.channels, spec.bits_per_sample, format
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fixtures::{encode, mono_spec, read_samples, write_wav};
    use tempfile::TempDir;

    #[test]
    fn test_empty_input_is_error() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.wav");
        let err = merge_wav_files(&[], &output).unwrap_err();
        assert!(matches!(err, MergeError::NoInputs));
        assert!(!output.exists());
    }

    #[test]
    fn test_merge_preserves_caller_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("doc_part002.wav");
        let b = dir.path().join("doc_part001.wav");
        write_wav(&a, &[20, 21], 16_000);
        write_wav(&b, &[10, 11, 12], 16_000);

        let output = dir.path().join("doc.wav");
        let summary = merge_wav_files(&[&a, &b], &output).unwrap();

        assert_eq!(summary.segments, 2);
        assert_eq!(summary.frames, 5);
        assert_eq!(read_samples(&output), vec![20, 21, 10, 11, 12]);
    }

    #[test]
    fn test_duration_is_sum_of_inputs() {
        let dir = TempDir::new().unwrap();
        let lengths = [16_000usize, 8_000, 4_000];
        let mut paths = Vec::new();
        for (i, len) in lengths.iter().enumerate() {
            let path = dir.path().join(format!("part{}.wav", i));
            write_wav(&path, &vec![i as i16; *len], 16_000);
            paths.push(path);
        }
        let refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();

        let output = dir.path().join("merged.wav");
        let summary = merge_wav_files(&refs, &output).unwrap();

        let input_total: Duration = paths.iter().map(|p| wav_duration(p).unwrap()).sum();
        assert_eq!(summary.duration(), Duration::from_millis(1750));
        assert_eq!(wav_duration(&output).unwrap(), input_total);
    }

    #[test]
    fn test_single_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("only.wav");
        write_wav(&input, &[1, 2, 3], 24_000);

        let output = dir.path().join("nested").join("out.wav");
        let summary = merge_wav_files(&[&input], &output).unwrap();
        assert_eq!(summary.segments, 1);
        assert_eq!(read_samples(&output), vec![1, 2, 3]);
    }

    #[test]
    fn test_stereo_frames_counted_per_channel() {
        let dir = TempDir::new().unwrap();
        let spec = WavSpec {
            channels: 2,
            ..mono_spec(8_000)
        };
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        fs::write(&a, encode(&[1, -1, 2, -2], spec)).unwrap();
        fs::write(&b, encode(&[3, -3], spec)).unwrap();

        let output = dir.path().join("out.wav");
        let summary = merge_wav_files(&[&a, &b], &output).unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(read_samples(&output), vec![1, -1, 2, -2, 3, -3]);
    }

    #[test]
    fn test_format_mismatch_removes_output() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, &[1, 2], 16_000);
        write_wav(&b, &[3, 4], 22_050);

        let output = dir.path().join("out.wav");
        let err = merge_wav_files(&[&a, &b], &output).unwrap_err();
        assert!(matches!(err, MergeError::FormatMismatch { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_corrupt_input_is_error() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, &[1, 2], 16_000);
        fs::write(&b, b"definitely not a wav file").unwrap();

        let output = dir.path().join("out.wav");
        assert!(merge_wav_files(&[&a, &b], &output).is_err());
        assert!(!output.exists());
    }
}
