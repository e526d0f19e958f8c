//! SSH host key fingerprint logging
//!
//! Fingerprints go to the console log so an operator can verify the host
//! out-of-band before the first SSH connection.

use crate::InitError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Default location of SSH host keys
pub const SSH_DIR: &str = "/etc/ssh";

/// Public host key files under `dir` (ssh_host_*_key.pub), sorted
pub async fn host_key_paths(dir: &Path) -> Result<Vec<PathBuf>, InitError> {
    let mut keys = Vec::new();

    if !dir.exists() {
        return Ok(keys);
    }

    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if name.starts_with("ssh_host_") && name.ends_with("_key.pub") {
            keys.push(path);
        }
    }

    keys.sort();
    Ok(keys)
}

/// Log the fingerprint of every host key in `dir`.
///
/// Returns the number of fingerprints logged. A missing `ssh-keygen`
/// binary downgrades to a warning.
pub async fn log_fingerprints(dir: &Path) -> Result<u32, InitError> {
    let keys = host_key_paths(dir).await?;

    if keys.is_empty() {
        info!("No SSH host keys found in {}", dir.display());
        return Ok(0);
    }

    let mut logged = 0;
    for key in keys {
        let output = match tokio::process::Command::new("ssh-keygen")
            .args(["-lf", &key.to_string_lossy()])
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("ssh-keygen unavailable, skipping fingerprints: {}", e);
                return Ok(logged);
            }
        };

        if output.status.success() {
            let fingerprint = String::from_utf8_lossy(&output.stdout);
            info!("Host key fingerprint: {}", fingerprint.trim());
            logged += 1;
        } else {
            warn!(
                "ssh-keygen failed for {}: {}",
                key.display(),
                String::from_utf8_lossy(&output.stderr)
            );
        }
    }

    Ok(logged)
}
