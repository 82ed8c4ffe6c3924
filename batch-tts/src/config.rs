//! batch-tts configuration management.

use crate::text::chunker::DEFAULT_LINES_PER_CHUNK;
use crate::tts::EmotionOptions;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_SERVER_HOST: &str = "localhost";
const DEFAULT_SERVER_PORT: u16 = 6006;
const DEFAULT_ENDPOINT_PATH: &str = "/tts_url";
const DEFAULT_REQUEST_PAUSE_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Host running the TTS server
    #[serde(default = "default_server_host")]
    pub server_host: String,

    /// TTS server port
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Synthesis route on the server
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Default speaker reference audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_audio: Option<PathBuf>,

    /// Source lines per synthesized chunk
    #[serde(default = "default_lines_per_chunk")]
    pub lines_per_chunk: usize,

    /// Pause between consecutive requests, in milliseconds
    #[serde(default = "default_request_pause_ms")]
    pub request_pause_ms: u64,

    /// Per-request timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extension of input documents
    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    /// Emotion controls sent with every request
    #[serde(default)]
    pub emotion: EmotionOptions,
}

fn default_server_host() -> String {
    DEFAULT_SERVER_HOST.to_string()
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_endpoint_path() -> String {
    DEFAULT_ENDPOINT_PATH.to_string()
}

fn default_lines_per_chunk() -> usize {
    DEFAULT_LINES_PER_CHUNK
}

fn default_request_pause_ms() -> u64 {
    DEFAULT_REQUEST_PAUSE_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_input_extension() -> String {
    "txt".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            endpoint_path: default_endpoint_path(),
            speaker_audio: None,
            lines_per_chunk: default_lines_per_chunk(),
            request_pause_ms: default_request_pause_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            input_extension: default_input_extension(),
            emotion: EmotionOptions::default(),
        }
    }
}

impl BatchConfig {
    /// Get the config file path: ~/.config/cli-programs/batch-tts.toml
    pub fn config_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home
            .join(".config")
            .join("cli-programs")
            .join("batch-tts.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: BatchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}
