//! Artifact store client
//!
//! The remote store is an external collaborator behind a small upload
//! interface: one multipart POST per artifact, returning a JSON body with
//! the stored artifact's URL. Retry policy deliberately lives in the
//! caller; see [`crate::export`].

mod client;

pub use client::{build_http_client, ArtifactClient, UploadItem};

use thiserror::Error;

/// Errors returned by the artifact store client
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("upload failed with status {status}: {body}")]
    UploadFailed { status: u16, body: String },

    #[error("artifact response is not valid JSON: {0}")]
    InvalidResponse(String),

    #[error("artifact response missing required url field")]
    MissingUrl,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for artifact store operations
pub type ArtifactResult<T> = Result<T, ArtifactError>;
