use std::time::Duration;
use thiserror::Error;

/// Why a single synthesis request produced no audio.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("request failed: {message}")]
    Transport { message: String },

    #[error("request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("server returned HTTP {code}{}", body_suffix(.body))]
    Status { code: u16, body: String },

    #[error("server returned an empty body")]
    EmptyBody,

    #[error("server returned invalid audio: {0}")]
    InvalidAudio(String),

    #[error("failed to write audio: {0}")]
    Io(#[from] std::io::Error),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}
