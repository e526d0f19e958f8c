//! Agent configuration parsing and types
//!
//! The agent reads a YAML config from /etc/instance-init/agent.cfg plus
//! drop-ins from agent.cfg.d. Every section is optional; absent sections
//! fall back to built-in defaults.

pub mod loader;
pub mod merge;

use crate::backoff::Backoff;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Metadata server settings
    pub metadata: Option<MetadataConfig>,

    /// Retry policy for network operations
    pub retry: Option<RetryConfig>,

    /// Startup script retrieval and execution
    pub startup_script: Option<StartupScriptConfig>,

    /// Hook script execution
    pub hooks: Option<HooksConfig>,

    /// Boot diagnostics
    pub diagnostics: Option<DiagnosticsConfig>,
}

impl AgentConfig {
    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::InitError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Effective metadata settings
    pub fn metadata(&self) -> MetadataConfig {
        self.metadata.clone().unwrap_or_default()
    }

    /// Effective retry settings
    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Effective startup-script settings
    pub fn startup_script(&self) -> StartupScriptConfig {
        self.startup_script.clone().unwrap_or_default()
    }

    /// Effective hooks settings
    pub fn hooks(&self) -> HooksConfig {
        self.hooks.clone().unwrap_or_default()
    }

    /// Effective diagnostics settings
    pub fn diagnostics(&self) -> DiagnosticsConfig {
        self.diagnostics.clone().unwrap_or_default()
    }

    /// Retry policy built from the effective retry settings
    pub fn backoff(&self) -> Backoff {
        let retry = self.retry();
        Backoff::new(
            retry.max_attempts,
            Duration::from_millis(retry.initial_delay_ms),
            Duration::from_millis(retry.max_delay_ms),
        )
    }
}

/// Metadata server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Override for the metadata base URL
    pub url: Option<String>,
    /// How long to wait for the metadata server at boot
    pub wait_timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            url: None,
            wait_timeout_secs: 120,
        }
    }
}

/// Retry policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
        }
    }
}

/// Startup script settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupScriptConfig {
    /// Whether to retrieve and run the startup script at all
    pub enabled: bool,
    /// Attribute naming a URL to download the script from
    pub url_attribute: String,
    /// Attribute carrying the script inline
    pub inline_attribute: String,
}

impl Default for StartupScriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_attribute: "startup-script-url".to_string(),
            inline_attribute: "startup-script".to_string(),
        }
    }
}

/// Hook execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    pub enabled: bool,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Diagnostics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Spread network IRQ affinity across CPUs and log the assignments
    pub irq_affinity: bool,
    /// Log SSH host key fingerprints to the console log
    pub host_key_fingerprints: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            irq_affinity: true,
            host_key_fingerprints: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AgentConfig::from_yaml("{}").unwrap();

        assert!(config.startup_script().enabled);
        assert_eq!(config.retry().max_attempts, 5);
        assert_eq!(config.metadata().wait_timeout_secs, 120);
        assert!(config.diagnostics().irq_affinity);
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
retry:
  max_attempts: 3
startup_script:
  enabled: false
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.retry().max_attempts, 3);
        // Unspecified keys within a section keep their defaults
        assert_eq!(config.retry().initial_delay_ms, 1000);
        assert!(!config.startup_script().enabled);
        // Unspecified sections keep their defaults
        assert!(config.hooks().enabled);
    }

    #[test]
    fn test_backoff_from_retry_config() {
        let yaml = r#"
retry:
  max_attempts: 2
  initial_delay_ms: 250
  max_delay_ms: 1000
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();
        let backoff = config.backoff();

        assert_eq!(backoff.max_attempts, 2);
        assert_eq!(backoff.initial_delay, Duration::from_millis(250));
        assert_eq!(backoff.max_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_custom_attributes() {
        let yaml = r#"
startup_script:
  url_attribute: provision-url
  inline_attribute: provision-script
"#;
        let config = AgentConfig::from_yaml(yaml).unwrap();
        let script = config.startup_script();

        assert_eq!(script.url_attribute, "provision-url");
        assert_eq!(script.inline_attribute, "provision-script");
        assert!(script.enabled);
    }
}
