//! Instance metadata client
//!
//! Fetches instance metadata from the metadata server.
//! <https://cloud.google.com/compute/docs/metadata/overview>

pub mod token;

pub use token::AccessToken;

use crate::{InitError, backoff::Backoff};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// Metadata service base URL
pub const METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Required header for metadata requests
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

/// Client for the instance metadata server
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new() -> Self {
        Self::with_base_url(METADATA_URL)
    }

    /// Create with a custom base URL (for testing)
    pub fn with_base_url(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a metadata path with the required Metadata-Flavor header
    pub async fn get(&self, path: &str) -> Result<String, InitError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Fetching metadata: {}", url);

        let response = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.text().await?)
        } else {
            Err(InitError::Metadata(format!(
                "Failed to fetch {}: {}",
                path,
                response.status()
            )))
        }
    }

    /// Fetch a metadata path, mapping 404 to `None`
    pub async fn get_optional(&self, path: &str) -> Result<Option<String>, InitError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Fetching optional metadata: {}", url);

        let response = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if response.status().is_success() {
            Ok(Some(response.text().await?))
        } else {
            Err(InitError::Metadata(format!(
                "Failed to fetch {}: {}",
                path,
                response.status()
            )))
        }
    }

    /// Check if the metadata server is reachable
    async fn check_server(&self) -> bool {
        let url = format!("{}/", self.base_url);
        self.client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Wait for the metadata server to become reachable.
    ///
    /// Polls with a doubling delay (capped at 30s) until the deadline.
    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<(), InitError> {
        let deadline = Instant::now() + timeout;
        let mut delay = Duration::from_secs(1);

        loop {
            if self.check_server().await {
                info!("Metadata server is reachable");
                return Ok(());
            }

            if Instant::now() + delay > deadline {
                return Err(InitError::MetadataUnavailable);
            }

            debug!("Metadata server not ready, retrying in {:?}", delay);
            sleep(delay).await;
            delay = (delay * 2).min(Duration::from_secs(30));
        }
    }

    /// Numeric instance ID
    pub async fn instance_id(&self) -> Result<String, InitError> {
        self.get("instance/id").await
    }

    /// Instance hostname
    pub async fn hostname(&self) -> Result<String, InitError> {
        self.get("instance/hostname").await
    }

    /// Instance attribute lookup; absent attributes return `None`
    pub async fn attribute(&self, name: &str) -> Result<Option<String>, InitError> {
        self.get_optional(&format!("instance/attributes/{}", name))
            .await
    }

    /// Fetch the instance ID under a retry policy
    pub async fn instance_id_with_retry(&self, policy: &Backoff) -> Result<String, InitError> {
        policy
            .retry("metadata instance-id fetch", || self.instance_id())
            .await
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new()
    }
}
