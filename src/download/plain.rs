//! Unauthenticated HTTP downloads

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::{Downloader, http_client};
use crate::InitError;

/// Downloader performing a plain GET with no credentials
pub struct PlainDownloader {
    client: Client,
    url: String,
}

impl PlainDownloader {
    pub fn new(url: String) -> Self {
        Self {
            client: http_client(),
            url,
        }
    }
}

#[async_trait]
impl Downloader for PlainDownloader {
    fn name(&self) -> &'static str {
        "unauthenticated download"
    }

    async fn fetch(&self, dest: &Path) -> Result<(), InitError> {
        debug!("Fetching {} without credentials", self.url);

        let response = self.client.get(&self.url).send().await?;

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
