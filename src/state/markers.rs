//! Marker file handling
//!
//! Markers control when hooks and other guarded work run:
//! - per-boot: run every boot
//! - per-instance: run once per instance ID
//! - per-once: run once ever (across all instances)

use crate::InitError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// How often a guarded unit of work should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Run every boot
    PerBoot,
    /// Run once per instance ID
    PerInstance,
    /// Run once ever (even across instance changes)
    PerOnce,
    /// Always run (no marker)
    Always,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerBoot => write!(f, "per-boot"),
            Self::PerInstance => write!(f, "per-instance"),
            Self::PerOnce => write!(f, "per-once"),
            Self::Always => write!(f, "always"),
        }
    }
}

/// Marker manager for a specific instance
#[derive(Debug, Clone)]
pub struct MarkerManager {
    /// Instance marker directory (`/var/lib/instance-init/instances/<id>/markers`)
    markers_dir: PathBuf,
    /// Data directory for per-once markers (`/var/lib/instance-init/data`)
    data_dir: PathBuf,
}

impl MarkerManager {
    /// Create a new marker manager
    pub fn new(markers_dir: impl AsRef<Path>, data_dir: impl AsRef<Path>) -> Self {
        Self {
            markers_dir: markers_dir.as_ref().to_path_buf(),
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the marker file path for a named unit of work
    fn marker_path(&self, name: &str, freq: Frequency) -> Option<PathBuf> {
        match freq {
            Frequency::PerBoot | Frequency::Always => None,
            Frequency::PerInstance => Some(self.markers_dir.join(name)),
            Frequency::PerOnce => Some(self.data_dir.join("markers").join(name)),
        }
    }

    /// Check if a unit of work should run based on its marker
    pub async fn should_run(&self, name: &str, freq: Frequency) -> Result<bool, InitError> {
        match self.marker_path(name, freq) {
            None => Ok(true),
            Some(path) => {
                let exists = path.exists();
                debug!(
                    "Marker check for {} ({}): {} -> {}",
                    name,
                    freq,
                    path.display(),
                    if exists { "skip" } else { "run" }
                );
                Ok(!exists)
            }
        }
    }

    /// Record that a unit of work has run (create marker)
    pub async fn mark_done(&self, name: &str, freq: Frequency) -> Result<(), InitError> {
        if let Some(path) = self.marker_path(name, freq) {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            // Marker content is the creation timestamp
            let timestamp = unix_timestamp();
            fs::write(&path, timestamp.as_bytes()).await?;

            debug!("Created marker: {}", path.display());
        }
        Ok(())
    }

    /// Clear a marker (allow the work to run again)
    #[allow(clippy::collapsible_if)]
    pub async fn clear(&self, name: &str, freq: Frequency) -> Result<(), InitError> {
        if let Some(path) = self.marker_path(name, freq) {
            if path.exists() {
                fs::remove_file(&path).await?;
                debug!("Removed marker: {}", path.display());
            }
        }
        Ok(())
    }

    /// Clear all per-instance markers
    pub async fn clear_all(&self) -> Result<(), InitError> {
        if self.markers_dir.exists() {
            fs::remove_dir_all(&self.markers_dir).await?;
            debug!("Cleared all markers in: {}", self.markers_dir.display());
        }
        Ok(())
    }
}

/// Seconds since the Unix epoch as a string
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}
