//! Standard instance-init paths
//!
//! Defines the directory structure used by the agent for state management.

use std::path::{Path, PathBuf};

/// Base directory for agent state
pub const STATE_DIR: &str = "/var/lib/instance-init";

/// Agent configuration directory
pub const CONFIG_DIR: &str = "/etc/instance-init";

/// Standard agent paths
#[derive(Debug, Clone)]
pub struct InitPaths {
    /// Base state directory (default: /var/lib/instance-init)
    pub base: PathBuf,
    /// Config directory (default: /etc/instance-init)
    pub config: PathBuf,
}

impl Default for InitPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl InitPaths {
    /// Create with default paths
    pub fn new() -> Self {
        Self {
            base: PathBuf::from(STATE_DIR),
            config: PathBuf::from(CONFIG_DIR),
        }
    }

    /// Create with custom base directory (useful for testing)
    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            config: PathBuf::from(CONFIG_DIR),
        }
    }

    /// Create with custom base and config directories
    pub fn with_dirs(base: impl AsRef<Path>, config: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            config: config.as_ref().to_path_buf(),
        }
    }

    // ==================== Base Directories ====================

    /// /var/lib/instance-init/data - Cached data directory
    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    /// /var/lib/instance-init/instances - All instances directory
    pub fn instances_dir(&self) -> PathBuf {
        self.base.join("instances")
    }

    /// /var/lib/instance-init/instance - Symlink to current instance
    pub fn instance_link(&self) -> PathBuf {
        self.base.join("instance")
    }

    /// /var/lib/instance-init/hooks - Hook scripts directory
    pub fn hooks_dir(&self) -> PathBuf {
        self.base.join("hooks")
    }

    // ==================== Instance-specific Paths ====================

    /// /var/lib/instance-init/instances/<id> - Instance directory
    pub fn instance_dir(&self, instance_id: &str) -> PathBuf {
        self.instances_dir().join(instance_id)
    }

    /// /var/lib/instance-init/instances/<id>/markers - Marker directory
    pub fn markers_dir(&self, instance_id: &str) -> PathBuf {
        self.instance_dir(instance_id).join("markers")
    }

    /// /var/lib/instance-init/instances/<id>/boot-finished - Boot completion marker
    pub fn boot_finished(&self, instance_id: &str) -> PathBuf {
        self.instance_dir(instance_id).join("boot-finished")
    }

    /// /var/lib/instance-init/instances/<id>/startup-script - Resolved startup script
    pub fn startup_script(&self, instance_id: &str) -> PathBuf {
        self.instance_dir(instance_id).join("startup-script")
    }

    // ==================== Hook Directories ====================

    /// /var/lib/instance-init/hooks/per-boot - Hooks run every boot
    pub fn hooks_per_boot(&self) -> PathBuf {
        self.hooks_dir().join("per-boot")
    }

    /// /var/lib/instance-init/hooks/per-instance - Hooks run once per instance
    pub fn hooks_per_instance(&self) -> PathBuf {
        self.hooks_dir().join("per-instance")
    }

    /// /var/lib/instance-init/hooks/per-once - Hooks run once ever
    pub fn hooks_per_once(&self) -> PathBuf {
        self.hooks_dir().join("per-once")
    }

    // ==================== Config Paths ====================

    /// /etc/instance-init/agent.cfg - Main config file
    pub fn main_config(&self) -> PathBuf {
        self.config.join("agent.cfg")
    }

    /// /etc/instance-init/agent.cfg.d - Config drop-in directory
    pub fn config_d(&self) -> PathBuf {
        self.config.join("agent.cfg.d")
    }

    // ==================== Data Paths ====================

    /// /var/lib/instance-init/data/instance-id - Cached instance ID
    pub fn cached_instance_id(&self) -> PathBuf {
        self.data_dir().join("instance-id")
    }

    /// /var/lib/instance-init/data/previous-instance-id - Previous instance ID
    pub fn previous_instance_id(&self) -> PathBuf {
        self.data_dir().join("previous-instance-id")
    }

    /// /var/lib/instance-init/data/status.json - Current status
    pub fn status_file(&self) -> PathBuf {
        self.data_dir().join("status.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = InitPaths::new();
        assert_eq!(paths.base, PathBuf::from("/var/lib/instance-init"));
        assert_eq!(paths.config, PathBuf::from("/etc/instance-init"));
    }

    #[test]
    fn test_custom_base() {
        let paths = InitPaths::with_base("/tmp/agent");
        assert_eq!(paths.data_dir(), PathBuf::from("/tmp/agent/data"));
        assert_eq!(paths.instances_dir(), PathBuf::from("/tmp/agent/instances"));
    }

    #[test]
    fn test_instance_paths() {
        let paths = InitPaths::new();
        let id = "8442316915543083445";

        assert_eq!(
            paths.instance_dir(id),
            PathBuf::from("/var/lib/instance-init/instances/8442316915543083445")
        );
        assert_eq!(
            paths.markers_dir(id),
            PathBuf::from("/var/lib/instance-init/instances/8442316915543083445/markers")
        );
        assert_eq!(
            paths.startup_script(id),
            PathBuf::from("/var/lib/instance-init/instances/8442316915543083445/startup-script")
        );
    }

    #[test]
    fn test_hook_paths() {
        let paths = InitPaths::new();
        assert_eq!(
            paths.hooks_per_boot(),
            PathBuf::from("/var/lib/instance-init/hooks/per-boot")
        );
        assert_eq!(
            paths.hooks_per_instance(),
            PathBuf::from("/var/lib/instance-init/hooks/per-instance")
        );
        assert_eq!(
            paths.hooks_per_once(),
            PathBuf::from("/var/lib/instance-init/hooks/per-once")
        );
    }

    #[test]
    fn test_config_paths() {
        let paths = InitPaths::new();
        assert_eq!(
            paths.main_config(),
            PathBuf::from("/etc/instance-init/agent.cfg")
        );
        assert_eq!(
            paths.config_d(),
            PathBuf::from("/etc/instance-init/agent.cfg.d")
        );
    }
}
