//! batch-tts - Synthesize a directory of text documents into one WAV per document

mod audio;
mod config;
mod epub;
mod pipeline;
mod sweep;
mod text;
mod tts;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::BatchConfig;
use log::{debug, info, warn};
use pipeline::{DocumentProcessor, PipelineConfig};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use text::LinesPerChunk;
use tts::HttpSynthesisClient;

#[derive(Parser, Debug)]
#[command(name = "batch-tts")]
#[command(about = "Synthesize a directory of text documents into one WAV per document")]
#[command(long_about = None)]
#[command(version)]
struct Args {
    /// Directory containing the input text files
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory for the output WAV files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// TTS server host (default from config: localhost)
    #[arg(long)]
    server_host: Option<String>,

    /// TTS server port (default from config: 6006)
    #[arg(long)]
    server_port: Option<u16>,

    /// Speaker reference audio passed to the TTS server
    #[arg(long)]
    spk_audio: Option<PathBuf>,

    /// Source lines per synthesized chunk (default from config: 10)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    lines_per_chunk: Option<u64>,

    /// Keep the per-chunk audio and skip the final merge
    #[arg(long)]
    no_merge: bool,

    /// Pause between requests in milliseconds (default from config: 1000)
    #[arg(long)]
    pause_ms: Option<u64>,

    /// Per-request timeout in seconds (default from config: 600)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emotion weight, 0.0-1.0 (default from config: 1.0)
    #[arg(long)]
    emo_weight: Option<f32>,

    /// Input file extension (default from config: txt)
    #[arg(long)]
    extension: Option<String>,

    /// Search subdirectories of the input directory
    #[arg(short, long)]
    recursive: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Convert an EPUB into text files ready for synthesis
    Convert {
        /// Path to the EPUB file
        input_epub: PathBuf,
        /// Output text file, or directory when splitting
        output_path: PathBuf,
        /// Lines per output file; 0 writes a single file
        #[arg(long, default_value_t = epub::DEFAULT_LINES_PER_FILE)]
        lines: usize,
        /// Keep adjacent duplicate lines
        #[arg(long)]
        keep_duplicates: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default speaker reference audio
    SetSpeaker {
        /// Path to speaker audio
        path: PathBuf,
    },
    /// Set default TTS server port
    SetPort {
        port: u16,
    },
    /// Set default lines per chunk
    SetLinesPerChunk {
        /// Value (at least 1)
        value: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(false)
        .init();
}

async fn run(args: Args) -> Result<ExitCode> {
    match &args.command {
        Some(Commands::Config { action }) => {
            handle_config_command(action)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Convert {
            input_epub,
            output_path,
            lines,
            keep_duplicates,
        }) => {
            let options = epub::ConvertOptions {
                lines_per_file: *lines,
                remove_adjacent_duplicates: !keep_duplicates,
            };
            handle_convert(input_epub, output_path, &options)?;
            return Ok(ExitCode::SUCCESS);
        }
        None => {}
    }

    let Some(input_dir) = args.input_dir.clone() else {
        anyhow::bail!("--input-dir is required. Run 'batch-tts --help' for usage.");
    };
    let Some(output_dir) = args.output_dir.clone() else {
        anyhow::bail!("--output-dir is required. Run 'batch-tts --help' for usage.");
    };

    let config = BatchConfig::load().context("Failed to load configuration")?;

    let speaker_audio = args.spk_audio.clone().or_else(|| config.speaker_audio.clone());
    let Some(speaker_audio) = speaker_audio else {
        anyhow::bail!(
            "No speaker audio given. Pass --spk-audio or run 'batch-tts config set-speaker'."
        );
    };

    sweep::check_preconditions(&input_dir, &speaker_audio)?;

    // The server resolves the path itself, so send it absolute.
    let speaker_audio = speaker_audio
        .canonicalize()
        .with_context(|| format!("Invalid speaker audio path: {}", speaker_audio.display()))?;

    let lines_per_chunk = match args.lines_per_chunk {
        Some(value) => usize::try_from(value).context("lines per chunk is too large")?,
        None => config.lines_per_chunk,
    };
    let lines_per_chunk = LinesPerChunk::new(lines_per_chunk)?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let endpoint = HttpSynthesisClient::endpoint_url(
        args.server_host.as_deref().unwrap_or(&config.server_host),
        args.server_port.unwrap_or(config.server_port),
        &config.endpoint_path,
    );
    let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(config.request_timeout_secs));
    let pause = Duration::from_millis(args.pause_ms.unwrap_or(config.request_pause_ms));
    let client = HttpSynthesisClient::new(endpoint.clone(), timeout, pause)?;

    let emotion = config
        .emotion
        .clone()
        .with_weight(args.emo_weight.unwrap_or(config.emotion.weight));

    let pipeline_config = PipelineConfig {
        output_dir: output_dir.clone(),
        speaker_audio,
        lines_per_chunk,
        merge_final: !args.no_merge,
        emotion,
        show_progress: std::io::stderr().is_terminal(),
    };

    debug!("Input: {}", input_dir.display());
    debug!("Output: {}", output_dir.display());
    debug!("Endpoint: {}", endpoint);
    debug!("Speaker audio: {}", pipeline_config.speaker_audio.display());
    debug!("Lines per chunk: {}", lines_per_chunk.get());
    debug!("Pause: {:?}, timeout: {:?}", pause, timeout);

    let extension = args
        .extension
        .clone()
        .unwrap_or_else(|| config.input_extension.clone());
    let files = sweep::find_documents(&input_dir, &extension, args.recursive)?;
    info!(
        "Found {} .{} file(s) in {}",
        files.len(),
        extension.trim_start_matches('.'),
        input_dir.display()
    );

    if files.is_empty() {
        warn!("Nothing to do");
        return Ok(ExitCode::SUCCESS);
    }

    let processor = DocumentProcessor::new(Arc::new(client), pipeline_config);
    let summary = sweep::run_sweep(&processor, &files).await;

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn handle_convert(input: &Path, output: &Path, options: &epub::ConvertOptions) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("EPUB file not found: {}", input.display());
    }

    info!("Converting {}", input.display());
    match epub::convert_epub(input, output, options)? {
        epub::ConvertOutput::Single { path, lines } => {
            info!("Wrote {} lines to {}", lines, path.display());
        }
        epub::ConvertOutput::Split { dir, files, lines } => {
            info!(
                "Wrote {} lines across {} files in {}",
                lines,
                files.len(),
                dir.display()
            );
        }
    }
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = BatchConfig::load()?;
            println!("Configuration file: {:?}", BatchConfig::config_path()?);
            println!();
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::SetSpeaker { path } => {
            let mut config = BatchConfig::load()?;
            config.speaker_audio = Some(path.clone());
            config.save()?;
            println!("Default speaker audio set to: {}", path.display());
        }
        ConfigAction::SetPort { port } => {
            let mut config = BatchConfig::load()?;
            config.server_port = *port;
            config.save()?;
            println!("Default server port set to: {}", port);
        }
        ConfigAction::SetLinesPerChunk { value } => {
            let lines = LinesPerChunk::new(*value)?;
            let mut config = BatchConfig::load()?;
            config.lines_per_chunk = lines.get();
            config.save()?;
            println!("Default lines per chunk set to: {}", config.lines_per_chunk);
        }
    }
    Ok(())
}
