//! Synthesis backend trait and request types.

mod error;
pub mod http;
#[cfg(test)]
pub mod mock;

pub use error::SynthesisError;
pub use http::HttpSynthesisClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Length of the emotion control vector accepted by the service.
pub const EMOTION_DIMENSIONS: usize = 8;

/// Emotion and pacing controls sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionOptions {
    /// Emotion control method (0 = same as the speaker reference)
    pub control_method: u32,
    /// Optional emotion reference audio, resolved by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,
    /// Emotion weight (0.0-1.0)
    pub weight: f32,
    /// Per-emotion intensities
    pub vector: [f32; EMOTION_DIMENSIONS],
    /// Optional text describing the desired emotion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Sample the emotion randomly
    pub random: bool,
    /// Sentence splitting limit used by the service
    pub max_text_tokens_per_sentence: u32,
}

impl Default for EmotionOptions {
    fn default() -> Self {
        Self {
            control_method: 0,
            ref_path: None,
            weight: 1.0,
            vector: [0.0; EMOTION_DIMENSIONS],
            text: None,
            random: false,
            max_text_tokens_per_sentence: 120,
        }
    }
}

impl EmotionOptions {
    /// Set the emotion weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }
}

/// JSON body of one synthesis request. Field names are the service's.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub spk_audio_path: String,
    pub emo_control_method: u32,
    pub emo_ref_path: Option<String>,
    pub emo_weight: f32,
    pub emo_vec: [f32; EMOTION_DIMENSIONS],
    pub emo_text: Option<String>,
    pub emo_random: bool,
    pub max_text_tokens_per_sentence: u32,
}

impl SynthesisRequest {
    pub fn new(text: &str, speaker_audio: &Path, emotion: &EmotionOptions) -> Self {
        Self {
            text: text.to_string(),
            spk_audio_path: speaker_audio.to_string_lossy().into_owned(),
            emo_control_method: emotion.control_method,
            emo_ref_path: emotion.ref_path.clone(),
            emo_weight: emotion.weight,
            emo_vec: emotion.vector,
            emo_text: emotion.text.clone(),
            emo_random: emotion.random,
            max_text_tokens_per_sentence: emotion.max_text_tokens_per_sentence,
        }
    }
}

/// A TTS service that turns one request into audio bytes.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize one request. No retries.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError>;

    /// Where requests go, for logging.
    fn endpoint(&self) -> &str;

    /// Synthesize and write the audio to `output_path`.
    ///
    /// Nothing is written when synthesis fails. Returns the byte count.
    async fn synthesize_to_file(
        &self,
        request: &SynthesisRequest,
        output_path: &Path,
    ) -> Result<usize, SynthesisError> {
        let audio = self.synthesize(request).await?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output_path, &audio).await?;

        Ok(audio.len())
    }
}

/// Reject bodies that cannot be a WAV file.
pub fn validate_audio(body: &[u8]) -> Result<(), SynthesisError> {
    if body.is_empty() {
        return Err(SynthesisError::EmptyBody);
    }
    if body.len() < 12 || &body[0..4] != b"RIFF" || &body[8..12] != b"WAVE" {
        return Err(SynthesisError::InvalidAudio(format!(
            "missing RIFF/WAVE header ({} bytes)",
            body.len()
        )));
    }
    Ok(())
}
