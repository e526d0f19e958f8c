//! Authenticated object-storage downloads
//!
//! Exchanges the instance's service account for an OAuth token via the
//! metadata server, then fetches the object with a Bearer-authorized GET.

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::{Downloader, http_client};
use crate::{InitError, metadata::MetadataClient};

/// Downloader for object-storage references using service account credentials
pub struct StorageDownloader {
    client: Client,
    metadata: MetadataClient,
    url: String,
}

impl StorageDownloader {
    /// `url` is the full object URL (`{storage_base}/{bucket}/{object}`)
    pub fn new(metadata: MetadataClient, url: String) -> Self {
        Self {
            client: http_client(),
            metadata,
            url,
        }
    }
}

#[async_trait]
impl Downloader for StorageDownloader {
    fn name(&self) -> &'static str {
        "authenticated storage download"
    }

    async fn fetch(&self, dest: &Path) -> Result<(), InitError> {
        let token = self.metadata.access_token().await?;
        debug!("Fetching {} with service account credentials", self.url);

        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InitError::download(
                &self.url,
                format!("HTTP status {}", response.status()),
            ));
        }

        let bytes = response.bytes().await?;
        fs::write(dest, &bytes).await?;

        debug!("Wrote {} bytes to {}", bytes.len(), dest.display());
        Ok(())
    }
}
