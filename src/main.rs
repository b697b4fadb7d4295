//! Ollama Tools CLI
//!
//! Lists installed Ollama models with their estimated memory requirements.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ollama_tools::estimate::estimate_memory;
use ollama_tools::pipeline::ModelInfoPipeline;
use ollama_tools::report;
use ollama_tools::storage::settings::{default_settings_path, load_settings, save_settings};
use ollama_tools::types::Settings;

/// Ollama model lister and memory estimator
///
/// Examples:
///   ollama-tools list-models                 # Every installed model
///   ollama-tools list-models phi4:latest     # A single model
///   ollama-tools list-models -t              # Table view
///   ollama-tools estimate -p 8030261312 -c 8192 -q Q4_K_M
#[derive(Parser)]
#[command(
    name = "ollama-tools",
    version = env!("CARGO_PKG_VERSION"),
    arg_required_else_help = true,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, global = true, value_name = "PATH", env = "OT_CONFIG")]
    config: Option<PathBuf>,

    /// Ollama server URL
    #[arg(long, global = true, value_name = "URL")]
    ollama_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Concurrent model fetches
    #[arg(long, global = true, value_name = "N")]
    concurrency: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed models with memory estimates
    #[command(name = "list-models", alias = "ls")]
    ListModels {
        /// Model to show (defaults to every installed model)
        model: Option<String>,

        /// Model to show; takes precedence over the positional name
        #[arg(short, long = "model-name", value_name = "MODEL")]
        model_name: Option<String>,

        /// Render a table instead of per-model blocks
        #[arg(short, long)]
        table: bool,
    },

    /// Estimate memory for an arbitrary model size
    Estimate {
        /// Parameter count, e.g. 8030261312
        #[arg(short = 'p', long)]
        parameters: u64,

        /// Context length in tokens
        #[arg(short = 'c', long, default_value = "2048")]
        context: u64,

        /// Quantization level, e.g. Q4_K_M or F16
        #[arg(short = 'q', long, default_value = "Q4_0")]
        quantization: String,
    },

    /// Inspect or persist settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective settings as JSON
    Show,
    /// Write the effective settings to PATH (or the config file location)
    Save { path: Option<PathBuf> },
}

impl Cli {
    /// Command-line flags take precedence over file and environment
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(url) = &self.ollama_url {
            settings.ollama_url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.request_timeout_secs = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        settings.validate();
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn list_models(
    settings: &Settings,
    target: Option<&str>,
    table: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = ModelInfoPipeline::from_settings(settings);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling pending requests");
            on_interrupt.cancel();
        }
    });

    let items = pipeline.list_with_cancel(target, cancel).await?;

    let mut out = std::io::stdout().lock();
    if table {
        report::write_table(&mut out, &items)?;
    } else {
        report::write_plain(&mut out, &items)?;
    }
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = load_settings(cli.config.as_deref());
    cli.apply_overrides(&mut settings);
    tracing::debug!("Effective settings: {:?}", settings);

    match &cli.command {
        Commands::ListModels {
            model,
            model_name,
            table,
        } => {
            let target = model_name.as_deref().or(model.as_deref());
            list_models(&settings, target, *table).await?;
        }
        Commands::Estimate {
            parameters,
            context,
            quantization,
        } => {
            let estimate = estimate_memory(*parameters, *context, quantization)?;
            let mut out = std::io::stdout().lock();
            report::write_estimate(&mut out, *parameters, *context, quantization, &estimate)?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            ConfigCommands::Save { path } => {
                let path = match path.as_ref().or(cli.config.as_ref()) {
                    Some(p) => p.clone(),
                    None => default_settings_path()?,
                };
                save_settings(&path, &settings)?;
                println!("Settings saved to {}", path.display());
            }
        },
    }

    Ok(())
}
