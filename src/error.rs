//! Error types for instance-init

use thiserror::Error;

/// Main error type for instance-init operations
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Metadata server unavailable")]
    MetadataUnavailable,

    #[error("Download error for {url}: {message}")]
    Download { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Phase '{phase}' failed: {message}")]
    Phase { phase: String, message: String },

    #[error("Command execution failed: {0}")]
    Command(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl InitError {
    /// Create a download error
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a phase error
    pub fn phase(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Phase {
            phase: phase.into(),
            message: message.into(),
        }
    }
}
