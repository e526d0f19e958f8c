//! Hooks phase - operator hook script execution

use crate::state::{Frequency, InstanceState};
use crate::{BootContext, InitError, hooks};
use tracing::info;

/// Run the hooks phase
pub async fn run(ctx: &BootContext, state: &InstanceState) -> Result<(), InitError> {
    if !ctx.config.hooks().enabled {
        info!("Hooks disabled by config");
        return Ok(());
    }

    let markers = state
        .markers()
        .ok_or_else(|| InitError::phase("hooks", "instance identity not established"))?;

    hooks::run_hooks(&ctx.paths.hooks_per_boot(), markers, Frequency::PerBoot).await?;
    hooks::run_hooks(
        &ctx.paths.hooks_per_instance(),
        markers,
        Frequency::PerInstance,
    )
    .await?;
    hooks::run_hooks(&ctx.paths.hooks_per_once(), markers, Frequency::PerOnce).await?;

    Ok(())
}
