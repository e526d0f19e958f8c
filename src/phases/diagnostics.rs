//! Diagnostics phase - console-visible boot information
//!
//! Nothing here is allowed to fail the boot; diagnostics degrade to
//! warnings when the environment does not cooperate (containers, non-root
//! test runs, images without SSH).

use crate::diagnostics::{hostkeys, irq};
use crate::{BootContext, InitError};
use std::path::Path;
use tracing::{debug, info, warn};

/// Run the diagnostics phase
pub async fn run(ctx: &BootContext) -> Result<(), InitError> {
    let cfg = ctx.config.diagnostics();

    if cfg.irq_affinity {
        match irq::apply_irq_affinity().await {
            Ok(applied) => {
                info!("Spread {} network interrupt(s) across CPUs", applied.len());
            }
            Err(e) => warn!("IRQ affinity setup failed: {}", e),
        }
    } else {
        debug!("IRQ affinity disabled by config");
    }

    if cfg.host_key_fingerprints {
        match hostkeys::log_fingerprints(Path::new(hostkeys::SSH_DIR)).await {
            Ok(count) => debug!("Logged {} host key fingerprint(s)", count),
            Err(e) => warn!("Host key fingerprinting failed: {}", e),
        }
    } else {
        debug!("Host key fingerprints disabled by config");
    }

    Ok(())
}
