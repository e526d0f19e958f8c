//! Boot hook execution
//!
//! Operators drop executable scripts into the hook directories
//! (hooks/per-boot, hooks/per-instance, hooks/per-once). Scripts run in
//! lexical order; per-instance and per-once runs are guarded by marker
//! files so re-running the agent stays idempotent.

use crate::InitError;
use crate::state::{Frequency, MarkerManager};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// List executable hook scripts in a directory, lexically sorted
pub async fn list_hooks(dir: &Path) -> Result<Vec<PathBuf>, InitError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut hooks = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = entry.metadata().await?.permissions().mode();
            if mode & 0o111 == 0 {
                debug!("Skipping non-executable hook: {}", path.display());
                continue;
            }
        }

        hooks.push(path);
    }

    hooks.sort();
    Ok(hooks)
}

/// Run all hooks in `dir` under the marker guard for `freq`.
///
/// Returns the number of hooks that ran. A hook that exits non-zero is
/// logged and marked done; it does not stop the remaining hooks.
pub async fn run_hooks(
    dir: &Path,
    markers: &MarkerManager,
    freq: Frequency,
) -> Result<u32, InitError> {
    let hooks = list_hooks(dir).await?;

    if hooks.is_empty() {
        debug!("No hooks in {}", dir.display());
        return Ok(0);
    }

    let mut ran = 0;
    for hook in hooks {
        let name = hook
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("hook")
            .to_string();
        let marker_name = format!("hook_{}", name);

        if !markers.should_run(&marker_name, freq).await? {
            debug!("Skipping hook {} ({} marker present)", name, freq);
            continue;
        }

        run_hook(&hook).await;

        // Marked regardless of exit status: a hook gets one shot per period
        markers.mark_done(&marker_name, freq).await?;
        ran += 1;
    }

    info!("Ran {} {} hook(s) from {}", ran, freq, dir.display());
    Ok(ran)
}

async fn run_hook(path: &Path) {
    debug!("Running hook: {}", path.display());

    let output = match tokio::process::Command::new(path).output().await {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to run hook {}: {}", path.display(), e);
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            "Hook {} exited with status {}: {}",
            path.display(),
            output.status.code().unwrap_or(-1),
            stderr
        );
    }

    if !output.stdout.is_empty() {
        debug!(
            "Hook {} stdout: {}",
            path.display(),
            String::from_utf8_lossy(&output.stdout)
        );
    }
}
