//! Monk command-line interface
//!
//! `serve` runs the web shell, `remove` processes a single file, `download`
//! fetches the model and `providers` prints backend diagnostics.

use super::config::CliConfigBuilder;
use crate::{
    config::{AppConfig, BackendType, ExecutionProvider},
    download::ModelDownloader,
    processor::BackgroundRemovalProcessor,
    services::DownloadNamer,
    web::{self, AppState},
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Monk background remover
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "monk")]
pub struct Cli {
    /// JSON configuration file; command-line flags override its values
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG for monk, -vv: TRACE everywhere)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Console)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the upload page (downloads the model first if needed)
    Serve {
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Remove the background from a single image file
    Remove {
        /// Input image
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Output PNG [default: download name next to the input]
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Download the model into the cache and exit
    Download {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Show backend and execution provider diagnostics
    Providers,
}

/// Server overrides
#[derive(Args, Debug, Default)]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Maximum upload size in megabytes
    #[arg(long, value_name = "MB")]
    pub max_upload_mb: Option<u64>,
}

/// Model overrides
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// Inference backend (onnx, tract, mock)
    #[arg(short, long)]
    pub backend: Option<BackendType>,
    /// ONNX Runtime execution provider (auto, cpu, cuda, coreml)
    #[arg(short, long)]
    pub execution_provider: Option<ExecutionProvider>,
    /// Use this model file instead of the cached download
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,
    /// URL the model is downloaded from
    #[arg(long)]
    pub model_url: Option<String>,
    /// Directory downloaded models are cached in
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
    /// Number of inference threads (0 = auto)
    #[arg(short, long)]
    pub threads: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Entry point used by the `monk` binary
///
/// # Errors
/// - Invalid configuration
/// - Model download failures
/// - Server or processing failures
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;

    match &cli.command {
        Command::Serve { server, model } => {
            let config = CliConfigBuilder::from_args(cli.config.as_deref(), server, model)?;
            serve(config).await
        },
        Command::Remove {
            input,
            output,
            model,
        } => {
            let config =
                CliConfigBuilder::from_args(cli.config.as_deref(), &ServerArgs::default(), model)?;
            remove_file(config, input, output.as_deref()).await
        },
        Command::Download { model } => {
            let config =
                CliConfigBuilder::from_args(cli.config.as_deref(), &ServerArgs::default(), model)?;
            download_model_only(&config).await
        },
        Command::Providers => {
            show_provider_diagnostics();
            Ok(())
        },
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    ensure_model_available(&config).await?;

    let processor = BackgroundRemovalProcessor::new(&config.model)
        .context("Failed to create background removal processor")?;
    web::serve(AppState::new(config, processor))
        .await
        .context("Server failed")
}

async fn remove_file(config: AppConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    ensure_model_available(&config).await?;

    let output = output.map_or_else(
        || {
            let upload_name = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            input.with_file_name(DownloadNamer::file_name(&upload_name, &config.download))
        },
        Path::to_path_buf,
    );

    let processor = BackgroundRemovalProcessor::new(&config.model)
        .context("Failed to create background removal processor")?;

    let start = Instant::now();
    let input_path = input.to_path_buf();
    let processed = tokio::task::spawn_blocking(move || processor.process_file(&input_path))
        .await
        .context("Processing task panicked")?
        .with_context(|| format!("Failed to process {}", input.display()))?;

    tokio::fs::write(&output, &processed.png)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Background removed"
    );
    println!("{}", output.display());
    Ok(())
}

async fn download_model_only(config: &AppConfig) -> Result<()> {
    let downloader = ModelDownloader::new().context("Failed to create model downloader")?;
    let path = downloader
        .ensure_model(&config.model, true)
        .await
        .context("Failed to download model")?;
    println!("Model available at {}", path.display());
    Ok(())
}

/// Make sure the model file exists, downloading the default model if needed
async fn ensure_model_available(config: &AppConfig) -> Result<()> {
    if !config.model.backend.requires_model() {
        debug!(backend = %config.model.backend, "Backend needs no model file");
        return Ok(());
    }

    let downloader = ModelDownloader::new().context("Failed to create model downloader")?;
    let path = downloader
        .ensure_model(&config.model, true)
        .await
        .context("Failed to ensure model is available")?;
    debug!(path = %path.display(), "Model available");
    Ok(())
}

fn init_tracing(verbose_count: u8, format: LogFormat) -> Result<()> {
    use crate::tracing_config::{TracingConfig, TracingFormat};

    let format = match format {
        LogFormat::Console => TracingFormat::Console,
        LogFormat::Compact => TracingFormat::Compact,
        #[cfg(feature = "tracing-json")]
        LogFormat::Json => TracingFormat::Json,
    };

    let mut config = TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(format)
        .with_session_id(uuid::Uuid::new_v4().to_string());
    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_env_filter(filter);
    }
    config.init()
}

fn show_provider_diagnostics() {
    println!("Backend and Execution Provider Diagnostics");
    println!();

    #[cfg(feature = "onnx")]
    print_providers("ONNX Runtime", &crate::backends::OnnxBackend::list_providers());
    #[cfg(feature = "tract")]
    print_providers("Tract", &crate::backends::TractBackend::list_providers());
    print_providers(
        "Mock",
        &[(
            "CPU".to_string(),
            true,
            "Border-color keying, no model file".to_string(),
        )],
    );
}

fn print_providers(backend: &str, providers: &[(String, bool, String)]) {
    println!("{backend}:");
    for (name, available, description) in providers {
        let status = if *available { "available" } else { "unavailable" };
        println!("  {name:<8} {status:<12} {description}");
    }
    println!();
}
