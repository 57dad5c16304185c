//! Storage module for the pipeline's durable state
//!
//! This module handles all database operations for the export pipeline:
//! - Single-slot run state with a sliding TTL (the mutual-exclusion
//!   mechanism for runs)
//! - Per-item artifact records, the basis for reuse-by-hash
//! - Generation metadata for status reporting

mod progress;
mod schema;
mod sqlite;
mod traits;

pub use progress::{
    CompletedSection, CurrentItem, ItemStatus, QueueEntry, RunErrorEntry, RunState, RunStatus,
    PROGRESS_TTL_SECS,
};
pub use schema::initialize_schema;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use serde::{Deserialize, Serialize};

/// Per-item durable upload record
///
/// Created or updated on first successful upload, read on every later run
/// to decide reuse, deleted only on explicit reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub item_id: i64,
    pub item_kind: String,
    pub content_hash: String,
    pub artifact_url: String,
    pub uploaded_at: String,
    pub content_size: u64,
}

/// Outcome of the most recent completed generation
#[derive(Debug, Clone)]
pub struct LastGeneration {
    pub generated_at: String,
    pub manifest_path: String,
    pub manifest_size: u64,
}
