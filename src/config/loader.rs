//! Agent config loader
//!
//! Loads and merges agent configs from standard locations.

use super::{AgentConfig, merge};
use crate::{InitError, state::InitPaths};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// Load and merge all agent configs from standard locations
pub async fn load_merged_config(paths: &InitPaths) -> Result<AgentConfig, InitError> {
    let mut configs = Vec::new();

    // 1. Load base config (/etc/instance-init/agent.cfg)
    if let Some(config) = load_config_file(paths.main_config()).await? {
        debug!("Loaded base config from {}", paths.main_config().display());
        configs.push(config);
    }

    // 2. Load drop-in configs (/etc/instance-init/agent.cfg.d/*.cfg)
    let dropins = load_dropin_configs(paths.config_d()).await?;
    configs.extend(dropins);

    Ok(merge::merge_all_configs(&configs))
}

/// Load agent config from a single file
async fn load_config_file(path: impl AsRef<Path>) -> Result<Option<AgentConfig>, InitError> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;

    match AgentConfig::from_yaml(&content) {
        Ok(config) => Ok(Some(config)),
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Load all drop-in configs from a directory (sorted alphabetically)
async fn load_dropin_configs(dir: impl AsRef<Path>) -> Result<Vec<AgentConfig>, InitError> {
    let dir = dir.as_ref();

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut configs = Vec::new();
    let mut entries = Vec::new();

    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();

        // Only process .cfg files
        if path.extension().is_some_and(|e| e == "cfg") {
            entries.push(path);
        }
    }

    entries.sort();

    for path in entries {
        if let Some(config) = load_config_file(&path).await? {
            debug!("Loaded drop-in config from {}", path.display());
            configs.push(config);
        }
    }

    info!("Loaded {} drop-in configs", configs.len());
    Ok(configs)
}
