//! Agent config merging
//!
//! Merges multiple config sources with precedence:
//! 1. /etc/instance-init/agent.cfg (base)
//! 2. /etc/instance-init/agent.cfg.d/*.cfg (sorted alphabetically, later wins)

use super::AgentConfig;
use serde_yaml::Value;
use tracing::debug;

/// Merge two AgentConfig instances
///
/// The `overlay` config takes precedence over `base`. Mappings merge
/// recursively, so a drop-in can override a single key within a section
/// without clobbering the rest of it.
pub fn merge_configs(base: &AgentConfig, overlay: &AgentConfig) -> AgentConfig {
    let base_yaml = serde_yaml::to_value(base).unwrap_or(Value::Null);
    let overlay_yaml = serde_yaml::to_value(overlay).unwrap_or(Value::Null);

    let merged = merge_yaml_values(&base_yaml, &overlay_yaml);

    serde_yaml::from_value(merged).unwrap_or_default()
}

/// Merge two YAML values recursively
fn merge_yaml_values(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        // Both are mappings - merge recursively
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                if let Some(base_value) = result.get(key) {
                    let merged = merge_yaml_values(base_value, overlay_value);
                    result.insert(key.clone(), merged);
                } else {
                    result.insert(key.clone(), overlay_value.clone());
                }
            }

            Value::Mapping(result)
        }

        // Overlay is null - keep base value
        (base_value, Value::Null) => base_value.clone(),

        // All other cases - overlay wins
        (_, overlay_value) => overlay_value.clone(),
    }
}

/// Merge multiple AgentConfig instances in order (later configs win)
pub fn merge_all_configs(configs: &[AgentConfig]) -> AgentConfig {
    if configs.is_empty() {
        return AgentConfig::default();
    }

    let mut result = configs[0].clone();
    for config in configs.iter().skip(1) {
        debug!("Merging agent config");
        result = merge_configs(&result, config);
    }
    result
}
