//! Startup-script URL classification
//!
//! Users hand the agent a URL in several shapes. Object-storage references
//! get the authenticated treatment; everything else is a plain HTTP fetch.

use crate::InitError;
use reqwest::Url;

/// Default public endpoint for object storage
pub const STORAGE_BASE: &str = "https://storage.googleapis.com";

/// Hosts that address object storage in path style (`/bucket/object`)
const STORAGE_HOSTS: [&str; 2] = ["storage.googleapis.com", "commondatastorage.googleapis.com"];

/// Host suffix for bucket-as-subdomain storage URLs
const STORAGE_HOST_SUFFIX: &str = ".storage.googleapis.com";

/// A classified startup-script URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptUrl {
    /// An object-storage reference
    Storage { bucket: String, object: String },
    /// Any other URL, fetched as-is
    Plain(String),
}

impl ScriptUrl {
    /// Classify a raw URL string.
    ///
    /// Recognized object-storage shapes:
    /// - `gs://<bucket>/<object>`
    /// - `http(s)://storage.googleapis.com/<bucket>/<object>`
    /// - `http(s)://commondatastorage.googleapis.com/<bucket>/<object>`
    /// - `http(s)://<bucket>.storage.googleapis.com/<object>`
    pub fn classify(raw: &str) -> Result<Self, InitError> {
        let url = Url::parse(raw)
            .map_err(|e| InitError::InvalidData(format!("Invalid URL '{}': {}", raw, e)))?;

        match url.scheme() {
            "gs" => {
                let bucket = url
                    .host_str()
                    .ok_or_else(|| {
                        InitError::InvalidData(format!("Storage URL '{}' has no bucket", raw))
                    })?
                    .to_string();
                let object = url.path().trim_start_matches('/').to_string();
                if object.is_empty() {
                    return Err(InitError::InvalidData(format!(
                        "Storage URL '{}' has no object path",
                        raw
                    )));
                }
                Ok(Self::Storage { bucket, object })
            }
            "http" | "https" => {
                let Some(host) = url.host_str() else {
                    return Ok(Self::Plain(raw.to_string()));
                };

                if STORAGE_HOSTS.contains(&host) {
                    let path = url.path().trim_start_matches('/');
                    let Some((bucket, object)) = path.split_once('/') else {
                        return Err(InitError::InvalidData(format!(
                            "Storage URL '{}' is missing bucket or object",
                            raw
                        )));
                    };
                    if bucket.is_empty() || object.is_empty() {
                        return Err(InitError::InvalidData(format!(
                            "Storage URL '{}' is missing bucket or object",
                            raw
                        )));
                    }
                    return Ok(Self::Storage {
                        bucket: bucket.to_string(),
                        object: object.to_string(),
                    });
                }

                if let Some(bucket) = host.strip_suffix(STORAGE_HOST_SUFFIX) {
                    if bucket.is_empty() {
                        return Err(InitError::InvalidData(format!(
                            "Storage URL '{}' has an empty bucket",
                            raw
                        )));
                    }
                    let object = url.path().trim_start_matches('/').to_string();
                    if object.is_empty() {
                        return Err(InitError::InvalidData(format!(
                            "Storage URL '{}' has no object path",
                            raw
                        )));
                    }
                    return Ok(Self::Storage {
                        bucket: bucket.to_string(),
                        object,
                    });
                }

                Ok(Self::Plain(raw.to_string()))
            }
            _ => Ok(Self::Plain(raw.to_string())),
        }
    }

    /// Public (unauthenticated) URL for this reference
    pub fn public_url(&self, storage_base: &str) -> String {
        match self {
            Self::Storage { bucket, object } => {
                format!(
                    "{}/{}/{}",
                    storage_base.trim_end_matches('/'),
                    bucket,
                    object
                )
            }
            Self::Plain(url) => url.clone(),
        }
    }
}
