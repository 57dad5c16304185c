//! Per-item processing: extract, hash, upload-or-reuse, record
//!
//! The dedup invariant lives here: an item whose extracted content hashes
//! to the same value as its stored record reuses the stored artifact URL
//! with zero network calls.

use crate::artifact::{ArtifactClient, ArtifactError};
use crate::config::ExportSettings;
use crate::content::{extract_content, Item};
use crate::storage::{ArtifactRecord, Storage, StorageError};
use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from processing a single item
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The item has no processable body; a hard skip, not a failure
    #[error("item has no processable content")]
    EmptyContent,

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of successfully processing one item
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub artifact_url: String,
    pub size: usize,
    /// True when the stored artifact was reused without a network call
    pub reused: bool,
}

/// Processes one queue item against the artifact store
pub struct ItemProcessor<'a> {
    client: &'a ArtifactClient,
    tenant_id: &'a str,
}

impl<'a> ItemProcessor<'a> {
    pub fn new(client: &'a ArtifactClient, tenant_id: &'a str) -> Self {
        Self { client, tenant_id }
    }

    /// Runs extract -> hash -> upload-or-reuse -> record for one item
    ///
    /// The artifact record is only touched after a successful upload; on
    /// failure the stale record stays valid for the next attempt.
    pub async fn process<S: Storage>(
        &self,
        storage: &mut S,
        item: &Item,
        options: &ExportSettings,
    ) -> Result<ProcessOutcome, ProcessError> {
        let content = extract_content(item, options);
        if content.is_empty() {
            return Err(ProcessError::EmptyContent);
        }

        let hash = content_hash(&content);

        if let Some(record) = storage.get_artifact_record(item.id)? {
            if record.content_hash == hash {
                tracing::debug!(item_id = item.id, "content unchanged, reusing stored artifact");
                return Ok(ProcessOutcome {
                    artifact_url: record.artifact_url,
                    size: content.len(),
                    reused: true,
                });
            }
        }

        let filename = item.artifact_filename();
        let artifact_url = self
            .client
            .upload(&content, &filename, self.tenant_id)
            .await?;

        storage.upsert_artifact_record(&ArtifactRecord {
            item_id: item.id,
            item_kind: item.kind.clone(),
            content_hash: hash,
            artifact_url: artifact_url.clone(),
            uploaded_at: Utc::now().to_rfc3339(),
            content_size: content.len() as u64,
        })?;

        tracing::info!(item_id = item.id, filename = %filename, "uploaded artifact");
        Ok(ProcessOutcome {
            artifact_url,
            size: content.len(),
            reused: false,
        })
    }
}

/// Stable hex digest over the content bytes
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash("same content");
        let b = content_hash("same content");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_differs() {
        assert_ne!(content_hash("one"), content_hash("two"));
    }

    // The upload-or-reuse paths are covered end-to-end by
    // tests/export_pipeline.rs against a mock artifact endpoint.
}
