//! instance-init - first-boot initialization agent for cloud VM instances
//!
//! Invoked by the init system on every boot. Focused on:
//! - Fast boot times
//! - Memory safety (no unsafe code)
//! - Idempotent re-runs

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use instance_init::config::loader;
use instance_init::metadata::MetadataClient;
use instance_init::state::{InitPaths, InstanceState};
use instance_init::{BOOT_PHASES, BootContext, Phase, run_phases};

#[derive(Parser)]
#[command(name = "instance-init")]
#[command(author, version, about = "First-boot initialization agent for cloud VM instances", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Override the metadata server base URL
    #[arg(long, env = "INSTANCE_INIT_METADATA_URL")]
    metadata_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full boot sequence (all phases)
    Boot,
    /// Fetch and run the startup script only
    StartupScript,
    /// Run operator hooks only
    Hooks,
    /// Emit boot diagnostics only
    Diagnostics,
    /// Query instance metadata
    Query {
        /// Metadata path to query (e.g. instance/id, instance/hostname)
        key: String,
    },
    /// Show the boot status
    Status,
    /// Clean agent state
    Clean {
        /// Remove logs as well
        #[arg(long)]
        logs: bool,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

async fn build_context(metadata_url: Option<String>) -> anyhow::Result<BootContext> {
    let paths = InitPaths::new();
    let config = loader::load_merged_config(&paths)
        .await
        .context("failed to load agent config")?;

    // CLI/env override wins over the config file
    let base_url = metadata_url
        .or_else(|| config.metadata().url)
        .unwrap_or_else(|| instance_init::metadata::METADATA_URL.to_string());
    let metadata = MetadataClient::with_base_url(&base_url);

    Ok(BootContext::new(config, paths, metadata))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Boot) | None => {
            info!("Running full boot sequence");
            let ctx = build_context(cli.metadata_url).await?;
            run_phases(&ctx, &BOOT_PHASES)
                .await
                .context("boot sequence failed")?;
        }
        Some(Commands::StartupScript) => {
            info!("Running startup-script phase");
            let ctx = build_context(cli.metadata_url).await?;
            run_phases(&ctx, &[Phase::Setup, Phase::StartupScript])
                .await
                .context("startup-script phase failed")?;
        }
        Some(Commands::Hooks) => {
            info!("Running hooks phase");
            let ctx = build_context(cli.metadata_url).await?;
            run_phases(&ctx, &[Phase::Setup, Phase::Hooks])
                .await
                .context("hooks phase failed")?;
        }
        Some(Commands::Diagnostics) => {
            info!("Running diagnostics phase");
            let ctx = build_context(cli.metadata_url).await?;
            run_phases(&ctx, &[Phase::Diagnostics])
                .await
                .context("diagnostics phase failed")?;
        }
        Some(Commands::Query { key }) => {
            let ctx = build_context(cli.metadata_url).await?;
            let value = ctx
                .metadata
                .get(&key)
                .await
                .with_context(|| format!("failed to query metadata key '{}'", key))?;
            println!("{}", value);
        }
        Some(Commands::Status) => {
            let state = InstanceState::new();
            let status = state.read_status().await.context("failed to read status")?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Some(Commands::Clean { logs }) => {
            info!("Cleaning agent state (logs: {})", logs);
            let state = InstanceState::new();
            state.clean(logs).await.context("failed to clean state")?;
        }
    }

    Ok(())
}
