//! Remote avatar source seam
//!
//! The caching source talks to the network through this trait: one
//! implementation per identity kind (users, teams). The contract is a matrix
//! fetch, so the result may cover pairs beyond those requested. An empty
//! string URL means "no image for this pair" and is never an error.

use crate::error::{AvatarError, Result};
use crate::types::{AvatarFormat, AvatarMap};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Resolve every (name, format) combination to a source URL.
    async fn fetch(&self, names: &[String], formats: &[AvatarFormat]) -> Result<AvatarMap>;
}

/// Remote source backed by an HTTP endpoint returning a JSON avatar map.
pub struct HttpRemoteSource {
    client: Client,
    endpoint: String,
}

impl HttpRemoteSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Reuse an existing client (connection pool) instead of creating one.
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn build_url(&self, names: &[String], formats: &[AvatarFormat]) -> String {
        let names = names.join(",");
        let formats = formats
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}?names={}&formats={}",
            self.endpoint,
            urlencoding::encode(&names),
            urlencoding::encode(&formats)
        )
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self, names: &[String], formats: &[AvatarFormat]) -> Result<AvatarMap> {
        let url = self.build_url(names, formats);
        debug!(url = %url, "Fetching avatar URLs");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AvatarError::Remote(format!(
                "avatar endpoint returned status {}",
                response.status()
            )));
        }

        let map: AvatarMap = response
            .json()
            .await
            .map_err(|e| AvatarError::Remote(format!("invalid avatar response: {}", e)))?;
        Ok(map)
    }
}
