//! Startup-script phase - retrieve and execute the user's script
//!
//! The `startup-script-url` attribute takes precedence; when its download
//! fails after all retries and fallbacks the agent falls back to the
//! inline `startup-script` attribute. The script's exit status is recorded
//! but never fails the boot.

use crate::state::{BootStatus, InstanceState};
use crate::{BootContext, InitError, download, script};
use tokio::fs;
use tracing::{info, warn};

/// Run the startup-script phase
pub async fn run(
    ctx: &BootContext,
    state: &InstanceState,
    status: &mut BootStatus,
) -> Result<(), InitError> {
    let cfg = ctx.config.startup_script();

    if !cfg.enabled {
        info!("Startup script disabled by config");
        return Ok(());
    }

    let instance_id = state
        .instance_id()
        .ok_or_else(|| InitError::phase("startup-script", "instance identity not established"))?
        .to_string();
    let dest = ctx.paths.startup_script(&instance_id);

    let mut source: Option<&'static str> = None;

    // URL attribute takes precedence over the inline script
    let url = ctx
        .retry
        .retry("startup-script-url attribute fetch", || {
            ctx.metadata.attribute(&cfg.url_attribute)
        })
        .await?
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    if let Some(url) = url {
        info!("Fetching startup script from {}", url);
        match download::fetch_to_file(
            &url,
            &dest,
            &ctx.metadata,
            &ctx.storage_base,
            &ctx.retry,
        )
        .await
        {
            Ok(_) => {
                let raw = fs::read(&dest).await?;
                let decoded = script::normalize(&raw)?;
                state.save_startup_script(&decoded).await?;
                source = Some("url");
            }
            Err(e) => {
                warn!(
                    "Startup script download failed: {}; falling back to inline attribute",
                    e
                );
            }
        }
    }

    if source.is_none() {
        let inline = ctx
            .retry
            .retry("startup-script attribute fetch", || {
                ctx.metadata.attribute(&cfg.inline_attribute)
            })
            .await?
            .filter(|s| !s.trim().is_empty());

        match inline {
            Some(content) => {
                let decoded = script::normalize(content.as_bytes())?;
                state.save_startup_script(&decoded).await?;
                source = Some("inline");
            }
            None => {
                info!("No startup script configured");
                return Ok(());
            }
        }
    }

    status.script_source = source.map(String::from);

    let exit = script::execute(&dest).await?;
    status.script_exit = Some(exit);

    Ok(())
}
