//! In-memory WAV fixtures for tests.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

/// Mono 16-bit PCM spec at `sample_rate`.
pub fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Encode mono 16-bit samples as a complete WAV file.
pub fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    encode(samples, mono_spec(sample_rate))
}

/// Encode interleaved 16-bit samples with an explicit spec.
pub fn encode(samples: &[i16], spec: WavSpec) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Write a mono 16-bit WAV file.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) {
    std::fs::write(path, wav_bytes(samples, sample_rate)).unwrap();
}

/// Read all samples of a 16-bit WAV file.
pub fn read_samples(path: &Path) -> Vec<i16> {
    hound::WavReader::open(path)
        .unwrap()
        .samples::<i16>()
        .map(|s| s.unwrap())
        .collect()
}
