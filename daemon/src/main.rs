//! EMBER daemon: runs the ingestion, aggregation and publishing loops.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use ember_node::{EmberNode, Mode, NodeConfig};
use ember_types::BlockNumber;
use ember_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "ember", about = "Track ETH burned since London and publish reports")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "EMBER_CONFIG")]
    config: Option<PathBuf>,

    /// Root of the record cache and report queue.
    #[arg(long, env = "EMBER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Ledger JSON-RPC endpoint.
    #[arg(long, env = "EMBER_RPC_URL")]
    rpc_url: Option<String>,

    /// Re-fetch records even when they are already cached.
    #[arg(long, env = "EMBER_NO_CACHE")]
    no_cache: bool,

    /// First block to pull and process.
    #[arg(long, env = "EMBER_START_BLOCK")]
    start_block: Option<BlockNumber>,

    /// ETH burned before `--start-block`, e.g. "949398.24".
    #[arg(long, env = "EMBER_BURNED_BEFORE_ETH")]
    burned_before_eth: Option<String>,

    /// Log reports instead of marking them published.
    #[arg(long, env = "EMBER_DRY_RUN")]
    dry_run: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "EMBER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "EMBER_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Clone, Copy)]
enum Command {
    /// Copy ledger blocks and uncles into the record cache.
    Pull,
    /// Aggregate cached records into pending reports.
    Process,
    /// Deliver pending reports.
    Publish,
    /// Pull, process and publish in one process.
    Run,
}

impl From<Command> for Mode {
    fn from(command: Command) -> Self {
        match command {
            Command::Pull => Mode::Pull,
            Command::Process => Mode::Process,
            Command::Publish => Mode::Publish,
            Command::Run => Mode::Run,
        }
    }
}

/// File settings (or defaults) with CLI flags and env vars on top.
fn build_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(rpc_url) = &cli.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if cli.no_cache {
        config.use_cache = false;
    }
    if let Some(start_block) = cli.start_block {
        config.start_block = Some(start_block);
    }
    if let Some(burned) = &cli.burned_before_eth {
        config.burned_before_eth = Some(burned.clone());
    }
    config.dry_run |= cli.dry_run;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.parse::<LogFormat>()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;

    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    let mode = Mode::from(cli.command);
    let node = EmberNode::new(config, mode).context("starting EMBER node")?;
    let result = node.run().await;

    match node.metrics().encode_text() {
        Ok(text) => tracing::info!("final metrics:\n{text}"),
        Err(e) => tracing::warn!(error = %e, "failed to encode metrics"),
    }

    result.context("EMBER node failed")
}
