//! Setup phase - state bootstrap and instance identity
//!
//! Responsibilities:
//! - Create the state directory tree
//! - Wait for the metadata server to come up
//! - Fetch the instance ID (with retry) and detect first boot

use crate::{BootContext, InitError, state::InstanceState};
use std::time::Duration;
use tracing::info;

/// Run the setup phase
pub async fn run(ctx: &BootContext, state: &mut InstanceState) -> Result<(), InitError> {
    info!("Setup phase: establishing instance identity");

    state.initialize().await?;

    let metadata_cfg = ctx.config.metadata();
    ctx.metadata
        .wait_for_ready(Duration::from_secs(metadata_cfg.wait_timeout_secs))
        .await?;

    let instance_id = ctx.metadata.instance_id_with_retry(&ctx.retry).await?;
    let instance_id = instance_id.trim();

    let is_new = state.set_instance_id(instance_id).await?;
    if is_new {
        info!("First boot for instance {}", instance_id);
    } else {
        info!("Repeat boot for instance {}", instance_id);
    }

    if let Ok(hostname) = ctx.metadata.hostname().await {
        info!("Instance hostname: {}", hostname.trim());
    }

    info!("Setup phase: completed");
    Ok(())
}
