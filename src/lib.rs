//! instance-init library
//!
//! First-boot initialization agent for cloud VM instances.
//!
//! # Design Principles
//!
//! - **Safety First**: No unsafe code (`#![forbid(unsafe_code)]`)
//! - **Fast Boot**: Minimal dependencies, async I/O, bounded retries
//! - **Idempotent**: Safe to run on every boot; one-time work is guarded
//!   by marker files keyed to the instance ID

pub mod backoff;
pub mod config;
pub mod diagnostics;
pub mod download;
pub mod hooks;
pub mod metadata;
pub mod phases;
pub mod script;
pub mod state;

mod error;

pub use error::InitError;

use backoff::Backoff;
use config::AgentConfig;
use metadata::MetadataClient;
use state::{InitPaths, InstanceState};
use tracing::info;

/// Boot phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// State bootstrap, metadata wait, instance identity
    Setup,
    /// IRQ affinity spread and host key fingerprints
    Diagnostics,
    /// Operator hook scripts
    Hooks,
    /// User startup script
    StartupScript,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Diagnostics => write!(f, "diagnostics"),
            Phase::Hooks => write!(f, "hooks"),
            Phase::StartupScript => write!(f, "startup-script"),
        }
    }
}

/// The full boot sequence
pub const BOOT_PHASES: [Phase; 4] = [
    Phase::Setup,
    Phase::Diagnostics,
    Phase::Hooks,
    Phase::StartupScript,
];

/// Shared context for all phases
#[derive(Debug, Clone)]
pub struct BootContext {
    pub config: AgentConfig,
    pub paths: InitPaths,
    pub metadata: MetadataClient,
    pub retry: Backoff,
    /// Public object-storage endpoint, overridable for testing
    pub storage_base: String,
}

impl BootContext {
    pub fn new(config: AgentConfig, paths: InitPaths, metadata: MetadataClient) -> Self {
        let retry = config.backoff();
        Self {
            config,
            paths,
            metadata,
            retry,
            storage_base: download::STORAGE_BASE.to_string(),
        }
    }

    /// Override the object-storage endpoint (for testing)
    pub fn with_storage_base(mut self, storage_base: impl Into<String>) -> Self {
        self.storage_base = storage_base.into();
        self
    }
}

/// Run the specified boot phases in order.
///
/// Phase progress is mirrored into the status file; a failing phase records
/// its error there before it is returned.
pub async fn run_phases(ctx: &BootContext, phases: &[Phase]) -> Result<(), InitError> {
    let mut state = InstanceState::with_paths(ctx.paths.clone());
    let mut status = state.read_status().await.unwrap_or_default();
    status.status = "running".to_string();
    status.error = None;

    for phase in phases {
        info!("Starting phase: {}", phase);
        status.phase = Some(phase.to_string());
        // Status writes are best-effort: the data dir may not exist yet
        state.update_status(&status).await.ok();

        if let Err(e) = run_phase(ctx, &mut state, &mut status, *phase).await {
            status.status = "error".to_string();
            status.error = Some(e.to_string());
            state.update_status(&status).await.ok();
            return Err(e);
        }

        info!("Completed phase: {}", phase);
    }

    if state.instance_id().is_some() {
        state.mark_boot_finished().await?;
        status.boot_finished = true;
    }

    status.status = "done".to_string();
    status.phase = None;
    state.update_status(&status).await.ok();

    Ok(())
}

async fn run_phase(
    ctx: &BootContext,
    state: &mut InstanceState,
    status: &mut state::BootStatus,
    phase: Phase,
) -> Result<(), InitError> {
    match phase {
        Phase::Setup => phases::setup::run(ctx, state).await,
        Phase::Diagnostics => phases::diagnostics::run(ctx).await,
        Phase::Hooks => phases::hooks::run(ctx, state).await,
        Phase::StartupScript => phases::startup_script::run(ctx, state, status).await,
    }
}
