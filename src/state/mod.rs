//! Instance state management
//!
//! Manages the /var/lib/instance-init directory structure including:
//! - Instance tracking (current vs previous)
//! - Marker files for idempotent execution
//! - Persisted startup script and boot status

pub mod markers;
pub mod paths;

pub use markers::{Frequency, MarkerManager};
pub use paths::InitPaths;

use crate::InitError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Instance state manager
#[derive(Debug)]
pub struct InstanceState {
    /// Agent paths configuration
    paths: InitPaths,
    /// Current instance ID (if known)
    instance_id: Option<String>,
    /// Marker manager (initialized when instance ID is set)
    markers: Option<MarkerManager>,
}

/// Status of the boot sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootStatus {
    /// Current status (running, done, error)
    pub status: String,
    /// Whether boot is finished
    pub boot_finished: bool,
    /// Current phase being executed
    pub phase: Option<String>,
    /// Error message if any
    pub error: Option<String>,
    /// Where the startup script came from (url or inline)
    pub script_source: Option<String>,
    /// Exit code of the startup script, once it has run
    pub script_exit: Option<i32>,
}

impl Default for BootStatus {
    fn default() -> Self {
        Self {
            status: "not-started".to_string(),
            boot_finished: false,
            phase: None,
            error: None,
            script_source: None,
            script_exit: None,
        }
    }
}

impl Default for InstanceState {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceState {
    /// Create a new instance state manager with default paths
    pub fn new() -> Self {
        Self {
            paths: InitPaths::new(),
            instance_id: None,
            markers: None,
        }
    }

    /// Create with custom paths (useful for testing)
    pub fn with_paths(paths: InitPaths) -> Self {
        Self {
            paths,
            instance_id: None,
            markers: None,
        }
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &InitPaths {
        &self.paths
    }

    /// Get the current instance ID
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Get the marker manager (requires instance ID to be set)
    pub fn markers(&self) -> Option<&MarkerManager> {
        self.markers.as_ref()
    }

    /// Initialize the agent directory structure
    pub async fn initialize(&mut self) -> Result<(), InitError> {
        info!("Initializing instance-init state directories");

        fs::create_dir_all(self.paths.data_dir()).await?;
        fs::create_dir_all(self.paths.instances_dir()).await?;
        fs::create_dir_all(self.paths.hooks_per_boot()).await?;
        fs::create_dir_all(self.paths.hooks_per_instance()).await?;
        fs::create_dir_all(self.paths.hooks_per_once()).await?;

        debug!(
            "Created state directories under {}",
            self.paths.base.display()
        );
        Ok(())
    }

    /// Set the current instance ID and initialize instance-specific state.
    ///
    /// Returns true when the instance is new: either no ID was cached or the
    /// cached ID differs (the image was re-deployed onto another instance).
    pub async fn set_instance_id(&mut self, instance_id: &str) -> Result<bool, InitError> {
        info!("Setting instance ID: {}", instance_id);

        let is_new_instance = self.check_instance_change(instance_id).await?;

        let instance_dir = self.paths.instance_dir(instance_id);
        fs::create_dir_all(&instance_dir).await?;

        let markers_dir = self.paths.markers_dir(instance_id);
        fs::create_dir_all(&markers_dir).await?;

        self.update_instance_link(instance_id).await?;

        fs::write(self.paths.cached_instance_id(), instance_id).await?;

        self.markers = Some(MarkerManager::new(markers_dir, self.paths.data_dir()));
        self.instance_id = Some(instance_id.to_string());

        if is_new_instance {
            info!("New instance detected: {}", instance_id);
        }

        Ok(is_new_instance)
    }

    /// Check if the instance has changed
    async fn check_instance_change(&self, new_id: &str) -> Result<bool, InitError> {
        let cached_path = self.paths.cached_instance_id();

        if cached_path.exists() {
            let cached_id = fs::read_to_string(&cached_path).await?;
            let cached_id = cached_id.trim();

            if cached_id != new_id {
                // Save previous instance ID
                fs::write(self.paths.previous_instance_id(), cached_id).await?;
                return Ok(true);
            }
            return Ok(false);
        }

        Ok(true) // No cached ID means new instance
    }

    /// Update the current-instance symlink
    async fn update_instance_link(&self, instance_id: &str) -> Result<(), InitError> {
        let link_path = self.paths.instance_link();
        let target = self.paths.instance_dir(instance_id);

        if link_path.exists() || link_path.is_symlink() {
            fs::remove_file(&link_path).await.ok();
        }

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&target, &link_path)?;
            debug!(
                "Created instance symlink: {} -> {}",
                link_path.display(),
                target.display()
            );
        }

        #[cfg(not(unix))]
        {
            fs::write(&link_path, target.to_string_lossy().as_bytes()).await?;
        }

        Ok(())
    }

    /// Persist the resolved startup script, mode 0700
    pub async fn save_startup_script(&self, data: &[u8]) -> Result<(), InitError> {
        if let Some(id) = &self.instance_id {
            let path = self.paths.startup_script(id);
            fs::write(&path, data).await?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700)).await?;
            }

            debug!("Saved startup script to {}", path.display());
        }
        Ok(())
    }

    /// Mark boot as finished
    pub async fn mark_boot_finished(&self) -> Result<(), InitError> {
        if let Some(id) = &self.instance_id {
            let path = self.paths.boot_finished(id);
            let timestamp = format!(
                "{}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs()
            );
            fs::write(&path, timestamp).await?;
            info!("Boot finished marker created");
        }
        Ok(())
    }

    /// Check if boot has finished
    pub fn is_boot_finished(&self) -> bool {
        if let Some(id) = &self.instance_id {
            self.paths.boot_finished(id).exists()
        } else {
            false
        }
    }

    /// Update status
    pub async fn update_status(&self, status: &BootStatus) -> Result<(), InitError> {
        let path = self.paths.status_file();
        let json = serde_json::to_string_pretty(status)?;
        fs::write(&path, json).await?;
        Ok(())
    }

    /// Read current status
    pub async fn read_status(&self) -> Result<BootStatus, InitError> {
        let path = self.paths.status_file();
        if path.exists() {
            let content = fs::read_to_string(&path).await?;
            let status: BootStatus = serde_json::from_str(&content)?;
            Ok(status)
        } else {
            Ok(BootStatus::default())
        }
    }

    /// Clean all agent state (for testing or reset)
    pub async fn clean(&self, include_logs: bool) -> Result<(), InitError> {
        info!("Cleaning instance-init state");

        if self.paths.instances_dir().exists() {
            fs::remove_dir_all(self.paths.instances_dir()).await?;
        }

        let link = self.paths.instance_link();
        if link.exists() || link.is_symlink() {
            fs::remove_file(&link).await.ok();
        }

        if self.paths.data_dir().exists() {
            fs::remove_dir_all(self.paths.data_dir()).await?;
        }

        if include_logs {
            let log_paths = ["/var/log/instance-init.log"];
            for log in log_paths {
                let path = Path::new(log);
                if path.exists() {
                    fs::remove_file(path).await.ok();
                }
            }
        }

        info!("Instance-init state cleaned");
        Ok(())
    }

    /// Load cached instance ID from disk
    pub async fn load_cached_instance_id(&mut self) -> Result<Option<String>, InitError> {
        let path = self.paths.cached_instance_id();
        if path.exists() {
            let id = fs::read_to_string(&path).await?;
            let id = id.trim().to_string();
            if !id.is_empty() {
                self.instance_id = Some(id.clone());

                let markers_dir = self.paths.markers_dir(&id);
                self.markers = Some(MarkerManager::new(markers_dir, self.paths.data_dir()));

                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_state() -> (InstanceState, TempDir) {
        let temp = TempDir::new().unwrap();
        let paths = InitPaths::with_base(temp.path());
        let state = InstanceState::with_paths(paths);
        (state, temp)
    }

    #[tokio::test]
    async fn test_initialize() {
        let (mut state, temp) = create_test_state().await;
        state.initialize().await.unwrap();

        assert!(temp.path().join("data").exists());
        assert!(temp.path().join("instances").exists());
        assert!(temp.path().join("hooks/per-boot").exists());
    }

    #[tokio::test]
    async fn test_set_instance_id() {
        let (mut state, temp) = create_test_state().await;
        state.initialize().await.unwrap();

        let is_new = state.set_instance_id("8442316915543083445").await.unwrap();
        assert!(is_new);
        assert_eq!(state.instance_id(), Some("8442316915543083445"));

        assert!(temp.path().join("instances/8442316915543083445").exists());
        assert!(
            temp.path()
                .join("instances/8442316915543083445/markers")
                .exists()
        );

        // Setting same ID again should not be "new"
        let is_new = state.set_instance_id("8442316915543083445").await.unwrap();
        assert!(!is_new);
    }

    #[tokio::test]
    async fn test_instance_change() {
        let (mut state, temp) = create_test_state().await;
        state.initialize().await.unwrap();

        state.set_instance_id("1111").await.unwrap();
        let is_new = state.set_instance_id("2222").await.unwrap();

        assert!(is_new);
        assert!(temp.path().join("data/previous-instance-id").exists());

        let prev = fs::read_to_string(temp.path().join("data/previous-instance-id"))
            .await
            .unwrap();
        assert_eq!(prev.trim(), "1111");
    }

    #[tokio::test]
    async fn test_save_startup_script() {
        let (mut state, temp) = create_test_state().await;
        state.initialize().await.unwrap();
        state.set_instance_id("1234").await.unwrap();

        state
            .save_startup_script(b"#!/bin/sh\necho hello\n")
            .await
            .unwrap();

        let path = temp.path().join("instances/1234/startup-script");
        let content = fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("echo hello"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[tokio::test]
    async fn test_boot_finished() {
        let (mut state, _temp) = create_test_state().await;
        state.initialize().await.unwrap();
        state.set_instance_id("1234").await.unwrap();

        assert!(!state.is_boot_finished());

        state.mark_boot_finished().await.unwrap();

        assert!(state.is_boot_finished());
    }

    #[tokio::test]
    async fn test_status() {
        let (mut state, _temp) = create_test_state().await;
        state.initialize().await.unwrap();

        let mut status = BootStatus::default();
        status.status = "running".to_string();
        status.phase = Some("startup-script".to_string());
        status.script_exit = Some(0);

        state.update_status(&status).await.unwrap();

        let loaded = state.read_status().await.unwrap();
        assert_eq!(loaded.status, "running");
        assert_eq!(loaded.phase, Some("startup-script".to_string()));
        assert_eq!(loaded.script_exit, Some(0));
    }

    #[tokio::test]
    async fn test_clean() {
        let (mut state, temp) = create_test_state().await;
        state.initialize().await.unwrap();
        state.set_instance_id("1234").await.unwrap();

        state.clean(false).await.unwrap();

        assert!(!temp.path().join("instances").exists());
        assert!(!temp.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_load_cached_instance_id() {
        let (mut state, _temp) = create_test_state().await;
        state.initialize().await.unwrap();
        state.set_instance_id("9876").await.unwrap();

        let paths = state.paths().clone();
        let mut reloaded = InstanceState::with_paths(paths);
        let id = reloaded.load_cached_instance_id().await.unwrap();

        assert_eq!(id.as_deref(), Some("9876"));
        assert!(reloaded.markers().is_some());
    }
}
