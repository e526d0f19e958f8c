//! Startup-script download routing
//!
//! Maps a user-supplied URL to an ordered list of download mechanisms:
//! object-storage references are tried with service account credentials
//! first, then fall back to an unauthenticated transfer of the public URL.
//! Plain URLs only get the unauthenticated path. Every mechanism runs under
//! the agent's retry policy.

pub mod plain;
pub mod storage;
pub mod url;

pub use plain::PlainDownloader;
pub use storage::StorageDownloader;
pub use url::{STORAGE_BASE, ScriptUrl};

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::{InitError, backoff::Backoff, metadata::MetadataClient};

/// A single download mechanism
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Human-readable mechanism name, used in logs
    fn name(&self) -> &'static str;

    /// Fetch the payload and write it to `dest`
    async fn fetch(&self, dest: &Path) -> Result<(), InitError>;
}

/// HTTP client used for payload transfers
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

/// Build the ordered list of download mechanisms for a classified URL
pub fn downloaders_for(
    script_url: &ScriptUrl,
    metadata: &MetadataClient,
    storage_base: &str,
) -> Vec<Box<dyn Downloader>> {
    match script_url {
        ScriptUrl::Storage { .. } => {
            let public = script_url.public_url(storage_base);
            vec![
                Box::new(StorageDownloader::new(metadata.clone(), public.clone())),
                Box::new(PlainDownloader::new(public)),
            ]
        }
        ScriptUrl::Plain(url) => vec![Box::new(PlainDownloader::new(url.clone()))],
    }
}

/// Download `raw_url` to `dest`, routing by URL shape.
///
/// Returns the name of the mechanism that succeeded. Each mechanism is
/// retried under `policy` before the next one is tried.
pub async fn fetch_to_file(
    raw_url: &str,
    dest: &Path,
    metadata: &MetadataClient,
    storage_base: &str,
    policy: &Backoff,
) -> Result<&'static str, InitError> {
    let classified = ScriptUrl::classify(raw_url)?;
    let candidates = downloaders_for(&classified, metadata, storage_base);

    let mut last_error = None;
    for downloader in candidates {
        match policy.retry(downloader.name(), || downloader.fetch(dest)).await {
            Ok(()) => {
                info!("Downloaded {} via {}", raw_url, downloader.name());
                return Ok(downloader.name());
            }
            Err(e) => {
                warn!("{} of {} failed: {}", downloader.name(), raw_url, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| InitError::download(raw_url, "no download mechanism available")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_url_gets_fallback_chain() {
        let url = ScriptUrl::classify("gs://bucket/boot.sh").unwrap();
        let metadata = MetadataClient::with_base_url("http://127.0.0.1:1");
        let chain = downloaders_for(&url, &metadata, STORAGE_BASE);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name(), "authenticated storage download");
        assert_eq!(chain[1].name(), "unauthenticated download");
    }

    #[test]
    fn test_plain_url_gets_single_mechanism() {
        let url = ScriptUrl::classify("https://example.com/boot.sh").unwrap();
        let metadata = MetadataClient::with_base_url("http://127.0.0.1:1");
        let chain = downloaders_for(&url, &metadata, STORAGE_BASE);

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name(), "unauthenticated download");
    }
}
