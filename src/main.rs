use anyhow::Context;
use clap::Parser;
use daemon_common::{LogLevel, init_tracing, maybe_daemonize};
use llama_pile::inference::mock::MockInference;
use llama_pile::{Config, InferenceClient, LlamaStackClient, Pipeline, SystemClipboard};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// `llama-pile`: watch the clipboard and build an analysis dataset.
#[derive(Parser, Debug)]
#[command(
    name = "llama-pile",
    version,
    about = "Clipboard monitor that analyses captured content with a local model"
)]
struct Cli {
    /// Optional TOML file overriding the built-in configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    /// Answer with an in-process mock instead of the inference server
    #[arg(long)]
    mock: bool,

    /// Run as a background daemon
    #[arg(short = 'd', long)]
    daemon: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level)?;
    // fork before any runtime threads exist; the child keeps only this one
    maybe_daemonize(cli.daemon)?;
    runtime()?.block_on(run(cli))
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.ensure_dirs().await?;

    let client: Arc<dyn InferenceClient> = if cli.mock {
        info!("using mock inference");
        Arc::new(MockInference)
    } else {
        info!(base_url = %config.inference.base_url, model = %config.inference.model_id, "using inference server");
        Arc::new(LlamaStackClient::new(
            &config.inference.base_url,
            &config.inference.model_id,
        ))
    };

    let pipeline = Arc::new(Pipeline::from_config(
        &config,
        Box::new(SystemClipboard),
        client,
    ));
    pipeline.run(llama_pile::shutdown_signal()).await?;
    Ok(())
}
