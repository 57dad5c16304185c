//! Storage trait and error types
//!
//! This module defines the trait interface for the durable stores the
//! pipeline relies on: the single-slot progress state, per-item artifact
//! records, and generation metadata.

use crate::storage::progress::{CurrentItem, QueueEntry, RunState};
use crate::storage::{ArtifactRecord, LastGeneration};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No export run is active")]
    SessionMissing,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for the pipeline's durable storage backend
///
/// Progress operations act on a single fixed slot: at most one run exists
/// system-wide, and whoever initializes the slot owns the run. Every write
/// refreshes the slot's TTL; an expired slot reads as absent. Mutating
/// operations on a missing slot are safe no-ops, except [`Storage::next_entry`]
/// which is only legal while a run is active and errors with
/// [`StorageError::SessionMissing`] otherwise.
pub trait Storage {
    // ===== Progress slot =====

    /// True while a run owns the slot (absent, expired, completed and
    /// errored states all read as inactive)
    fn progress_is_active(&self) -> StorageResult<bool>;

    /// Creates a fresh run state; silent no-op while another run is active
    fn initialize_progress(
        &mut self,
        kinds: &[String],
        total: usize,
        options: &crate::config::ExportSettings,
    ) -> StorageResult<()>;

    /// Attaches the processing queue, resets the cursor and moves the run
    /// into `processing`
    fn set_queue(&mut self, entries: &[QueueEntry]) -> StorageResult<()>;

    /// Loads the current run state, if one is present and unexpired
    fn load_progress(&self) -> StorageResult<Option<RunState>>;

    /// Returns the entry at the cursor and advances it; `None` once the
    /// queue is exhausted (idempotent on repeated calls)
    fn next_entry(&mut self) -> StorageResult<Option<QueueEntry>>;

    /// Replaces the current-item marker
    fn update_current_item(&mut self, current: &CurrentItem) -> StorageResult<()>;

    /// Marks the current item completed and advances the processed counter
    fn record_success(&mut self, item_id: i64, artifact_url: &str) -> StorageResult<()>;

    /// Appends an item error and marks the current item failed; the
    /// processed counter is advanced separately via
    /// [`Storage::increment_processed`]
    fn record_failure(
        &mut self,
        item_id: i64,
        kind: &str,
        title: &str,
        message: &str,
    ) -> StorageResult<()>;

    /// Advances the processed counter (used for failed and skipped items,
    /// which still count toward completion)
    fn increment_processed(&mut self) -> StorageResult<()>;

    /// Records that all entries of one kind have been processed
    fn complete_section(&mut self, kind: &str, items_processed: usize) -> StorageResult<()>;

    /// Moves the run to `completed` with the written manifest's location
    fn finalize_progress(&mut self, manifest_path: &str, size: u64) -> StorageResult<()>;

    /// Moves the run to `error` with a run-level error entry
    fn abort_progress(&mut self, message: &str) -> StorageResult<()>;

    /// Deletes the slot entirely, freeing it for a new run
    fn clear_progress(&mut self) -> StorageResult<()>;

    // ===== Artifact records =====

    /// Looks up the stored upload record for one item
    fn get_artifact_record(&self, item_id: i64) -> StorageResult<Option<ArtifactRecord>>;

    /// Creates or replaces the upload record for one item
    fn upsert_artifact_record(&mut self, record: &ArtifactRecord) -> StorageResult<()>;

    /// Deletes all upload records (explicit reset)
    fn delete_artifact_records(&mut self) -> StorageResult<u64>;

    /// Counts stored upload records
    fn count_artifact_records(&self) -> StorageResult<u64>;

    // ===== Generation metadata =====

    /// Records the outcome of the most recent completed generation
    fn set_last_generation(&mut self, manifest_path: &str, size: u64) -> StorageResult<()>;

    /// Reads the most recent generation outcome, if any
    fn last_generation(&self) -> StorageResult<Option<LastGeneration>>;
}
