//! HTTP client for the artifact store
//!
//! This module handles all HTTP traffic to the remote artifact endpoint:
//! - Building the HTTP client with explicit timeouts
//! - Multipart uploads (file part + tenant-identifier part)
//! - Typed error classification of failed responses
//!
//! Uploads never retry automatically: the remote side is not assumed
//! idempotent, so a retried upload after a timeout could create a duplicate
//! remote object. Callers dedup through stored artifact records instead.

use crate::artifact::{ArtifactError, ArtifactResult};
use crate::config::ArtifactConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Delay between consecutive uploads in a batch, to respect rate limits
const BATCH_UPLOAD_DELAY: Duration = Duration::from_millis(100);

/// One item of a batch upload
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub content: String,
    pub filename: String,
}

/// Builds an HTTP client with explicit timeouts
///
/// # Arguments
///
/// * `timeout_secs` - Per-request timeout in seconds
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("llms-export/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Client for the remote artifact store
pub struct ArtifactClient {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl ArtifactClient {
    /// Creates a client from the artifact endpoint configuration
    pub fn new(config: &ArtifactConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            endpoint: config.endpoint.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Uploads one artifact and returns its stable URL
    ///
    /// A single network call with no retry. Success is exactly HTTP 200
    /// with a JSON body containing a `url` field; anything else maps to a
    /// typed error.
    pub async fn upload(
        &self,
        content: &str,
        filename: &str,
        tenant_id: &str,
    ) -> ArtifactResult<String> {
        let file_part = Part::text(content.to_string())
            .file_name(filename.to_string())
            .mime_str("text/plain")?;
        let form = Form::new()
            .part("file", file_part)
            .text("tenant_id", tenant_id.to_string());

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(filename = %filename, "uploading artifact");
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(ArtifactError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ArtifactError::InvalidResponse(e.to_string()))?;

        match parsed.get("url").and_then(|value| value.as_str()) {
            Some(url) => {
                tracing::debug!(url = %url, "artifact stored");
                Ok(url.to_string())
            }
            None => Err(ArtifactError::MissingUrl),
        }
    }

    /// Uploads a batch of artifacts sequentially
    ///
    /// Partial failures do not abort the batch; each item gets its own
    /// result, in input order.
    pub async fn batch_upload(
        &self,
        items: &[UploadItem],
        tenant_id: &str,
    ) -> Vec<ArtifactResult<String>> {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(BATCH_UPLOAD_DELAY).await;
            }
            results.push(self.upload(&item.content, &item.filename, tenant_id).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(30).is_ok());
    }

    #[test]
    fn test_client_from_config() {
        let config = ArtifactConfig {
            endpoint: "https://cdn.example.com/upload".to_string(),
            bearer_token: Some("secret".to_string()),
            timeout_secs: 30,
        };
        let client = ArtifactClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "https://cdn.example.com/upload");
        assert!(client.bearer_token.is_some());
    }

    // HTTP behavior is covered by the wiremock tests in tests/artifact_client.rs
}
