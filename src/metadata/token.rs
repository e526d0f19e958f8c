//! Service account access tokens
//!
//! The metadata server hands out short-lived OAuth tokens for the instance's
//! default service account. These authorize object-storage downloads without
//! any credentials baked into the image.

use super::MetadataClient;
use crate::InitError;
use serde::Deserialize;

/// Path of the default service account's token endpoint
const TOKEN_PATH: &str = "instance/service-accounts/default/token";

/// OAuth access token as returned by the metadata server
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

impl MetadataClient {
    /// Fetch an access token for the default service account
    pub async fn access_token(&self) -> Result<AccessToken, InitError> {
        let body = self.get(TOKEN_PATH).await?;
        let token: AccessToken = serde_json::from_str(&body)?;

        if token.access_token.is_empty() {
            return Err(InitError::Metadata(
                "Metadata server returned an empty access token".to_string(),
            ));
        }

        Ok(token)
    }
}
