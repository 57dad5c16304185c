//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! The run state lives in a single-row table as one JSON document plus an
//! `expires_at` column; every write pushes the expiry one TTL into the
//! future, and expired rows read as absent.

use crate::config::ExportSettings;
use crate::storage::progress::{
    CurrentItem, ItemStatus, QueueEntry, RunErrorEntry, RunState, RunStatus, PROGRESS_TTL_SECS,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ArtifactRecord, LastGeneration};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const META_LAST_GENERATED_AT: &str = "last_generated_at";
const META_MANIFEST_PATH: &str = "manifest_path";
const META_MANIFEST_SIZE: &str = "manifest_size";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Loads the slot, treating an expired row as absent
    fn load_slot(&self) -> StorageResult<Option<RunState>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT state, expires_at FROM export_progress WHERE slot = 0",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((state_json, expires_at)) = row else {
            return Ok(None);
        };

        if let Ok(expiry) = DateTime::parse_from_rfc3339(&expires_at) {
            if expiry < Utc::now() {
                tracing::debug!("run state expired, clearing the slot");
                self.conn
                    .execute("DELETE FROM export_progress WHERE slot = 0", [])?;
                return Ok(None);
            }
        }

        let state: RunState = serde_json::from_str(&state_json)?;
        Ok(Some(state))
    }

    /// Writes the slot, refreshing the TTL
    fn save_slot(&mut self, state: &mut RunState) -> StorageResult<()> {
        state.updated_at = Utc::now().to_rfc3339();
        let expires_at = (Utc::now() + Duration::seconds(PROGRESS_TTL_SECS)).to_rfc3339();
        let json = serde_json::to_string(state)?;

        self.conn.execute(
            "INSERT INTO export_progress (slot, state, expires_at) VALUES (0, ?1, ?2)
             ON CONFLICT(slot) DO UPDATE SET state = excluded.state, expires_at = excluded.expires_at",
            params![json, expires_at],
        )?;
        Ok(())
    }

    /// Applies a mutation to the slot; missing slot is a safe no-op
    fn with_slot(&mut self, mutate: impl FnOnce(&mut RunState)) -> StorageResult<()> {
        let Some(mut state) = self.load_slot()? else {
            return Ok(());
        };
        mutate(&mut state);
        self.save_slot(&mut state)
    }
}

impl Storage for SqliteStorage {
    // ===== Progress slot =====

    fn progress_is_active(&self) -> StorageResult<bool> {
        Ok(self
            .load_slot()?
            .map(|state| state.status.is_active())
            .unwrap_or(false))
    }

    fn initialize_progress(
        &mut self,
        kinds: &[String],
        total: usize,
        options: &ExportSettings,
    ) -> StorageResult<()> {
        if self.progress_is_active()? {
            tracing::warn!("a run is already active, refusing to initialize another");
            return Ok(());
        }

        let mut state = RunState::new(kinds, total, options);
        self.save_slot(&mut state)?;
        tracing::info!(total, "initialized export run");
        Ok(())
    }

    fn set_queue(&mut self, entries: &[QueueEntry]) -> StorageResult<()> {
        self.with_slot(|state| {
            state.queue = entries.to_vec();
            state.cursor = 0;
            state.status = RunStatus::Processing;
        })
    }

    fn load_progress(&self) -> StorageResult<Option<RunState>> {
        self.load_slot()
    }

    fn next_entry(&mut self) -> StorageResult<Option<QueueEntry>> {
        let Some(mut state) = self.load_slot()? else {
            return Err(StorageError::SessionMissing);
        };

        if state.cursor >= state.queue.len() {
            // exhausted; leave the state untouched
            return Ok(None);
        }

        let entry = state.queue[state.cursor].clone();
        state.cursor += 1;
        self.save_slot(&mut state)?;
        Ok(Some(entry))
    }

    fn update_current_item(&mut self, current: &CurrentItem) -> StorageResult<()> {
        self.with_slot(|state| {
            state.current_item = Some(current.clone());
        })
    }

    fn record_success(&mut self, item_id: i64, artifact_url: &str) -> StorageResult<()> {
        self.with_slot(|state| {
            state.processed_count += 1;
            state.refresh_percentage();
            if let Some(current) = state.current_item.as_mut() {
                if current.id == item_id {
                    current.status = ItemStatus::Completed;
                    current.artifact_url = Some(artifact_url.to_string());
                }
            }
        })
    }

    fn record_failure(
        &mut self,
        item_id: i64,
        kind: &str,
        title: &str,
        message: &str,
    ) -> StorageResult<()> {
        self.with_slot(|state| {
            if let Some(current) = state.current_item.as_mut() {
                if current.id == item_id {
                    current.status = ItemStatus::Failed;
                    current.error = Some(message.to_string());
                }
            }
            state.errors.push(RunErrorEntry {
                item_id: Some(item_id),
                title: Some(title.to_string()),
                kind: Some(kind.to_string()),
                message: message.to_string(),
                at: Utc::now().to_rfc3339(),
            });
        })
    }

    fn increment_processed(&mut self) -> StorageResult<()> {
        self.with_slot(|state| {
            state.processed_count += 1;
            state.refresh_percentage();
        })
    }

    fn complete_section(&mut self, kind: &str, items_processed: usize) -> StorageResult<()> {
        self.with_slot(|state| {
            state
                .completed_sections
                .push(crate::storage::progress::CompletedSection {
                    name: crate::content::kind_label(kind),
                    kind: kind.to_string(),
                    items_processed,
                    completed_at: Utc::now().to_rfc3339(),
                });
        })
    }

    fn finalize_progress(&mut self, manifest_path: &str, size: u64) -> StorageResult<()> {
        self.with_slot(|state| {
            state.status = RunStatus::Completed;
            state.percentage = 100;
            state.current_item = None;
            state.manifest_path = Some(manifest_path.to_string());
            state.manifest_size = Some(size);
        })
    }

    fn abort_progress(&mut self, message: &str) -> StorageResult<()> {
        self.with_slot(|state| {
            state.status = RunStatus::Error;
            state.current_item = None;
            state.errors.push(RunErrorEntry {
                item_id: None,
                title: None,
                kind: None,
                message: message.to_string(),
                at: Utc::now().to_rfc3339(),
            });
        })
    }

    fn clear_progress(&mut self) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM export_progress WHERE slot = 0", [])?;
        Ok(())
    }

    // ===== Artifact records =====

    fn get_artifact_record(&self, item_id: i64) -> StorageResult<Option<ArtifactRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT item_id, item_kind, content_hash, artifact_url, uploaded_at, content_size
                 FROM artifact_records WHERE item_id = ?1",
                params![item_id],
                |row| {
                    Ok(ArtifactRecord {
                        item_id: row.get(0)?,
                        item_kind: row.get(1)?,
                        content_hash: row.get(2)?,
                        artifact_url: row.get(3)?,
                        uploaded_at: row.get(4)?,
                        content_size: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn upsert_artifact_record(&mut self, record: &ArtifactRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO artifact_records
             (item_id, item_kind, content_hash, artifact_url, uploaded_at, content_size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.item_id,
                record.item_kind,
                record.content_hash,
                record.artifact_url,
                record.uploaded_at,
                record.content_size,
            ],
        )?;
        Ok(())
    }

    fn delete_artifact_records(&mut self) -> StorageResult<u64> {
        let deleted = self.conn.execute("DELETE FROM artifact_records", [])?;
        Ok(deleted as u64)
    }

    fn count_artifact_records(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM artifact_records", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    // ===== Generation metadata =====

    fn set_last_generation(&mut self, manifest_path: &str, size: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        for (key, value) in [
            (META_LAST_GENERATED_AT, now.as_str()),
            (META_MANIFEST_PATH, manifest_path),
            (META_MANIFEST_SIZE, &size.to_string()),
        ] {
            self.conn.execute(
                "INSERT OR REPLACE INTO export_meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        Ok(())
    }

    fn last_generation(&self) -> StorageResult<Option<LastGeneration>> {
        let get = |key: &str| -> StorageResult<Option<String>> {
            Ok(self
                .conn
                .query_row(
                    "SELECT value FROM export_meta WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        };

        let Some(generated_at) = get(META_LAST_GENERATED_AT)? else {
            return Ok(None);
        };
        let manifest_path = get(META_MANIFEST_PATH)?.unwrap_or_default();
        let manifest_size = get(META_MANIFEST_SIZE)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Some(LastGeneration {
            generated_at,
            manifest_path,
            manifest_size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ExportSettings {
        ExportSettings::default()
    }

    fn queue_of(ids: &[i64]) -> Vec<QueueEntry> {
        ids.iter()
            .map(|id| QueueEntry {
                item_id: *id,
                kind: "post".to_string(),
            })
            .collect()
    }

    fn start_run(storage: &mut SqliteStorage, ids: &[i64]) {
        storage
            .initialize_progress(&["post".to_string()], ids.len(), &settings())
            .unwrap();
        storage.set_queue(&queue_of(ids)).unwrap();
    }

    fn record(item_id: i64, hash: &str) -> ArtifactRecord {
        ArtifactRecord {
            item_id,
            item_kind: "post".to_string(),
            content_hash: hash.to_string(),
            artifact_url: format!("https://cdn.example.com/{}", item_id),
            uploaded_at: Utc::now().to_rfc3339(),
            content_size: 128,
        }
    }

    #[test]
    fn test_initialize_and_active() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(!storage.progress_is_active().unwrap());

        storage
            .initialize_progress(&["post".to_string()], 3, &settings())
            .unwrap();
        assert!(storage.progress_is_active().unwrap());

        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.status, RunStatus::Initializing);
        assert_eq!(state.total_count, 3);
        assert_eq!(state.cursor, 0);
        assert_eq!(state.processed_count, 0);
    }

    #[test]
    fn test_initialize_is_noop_while_active() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2, 3]);

        // a competing initialize must not clobber the in-flight run
        storage
            .initialize_progress(&["page".to_string()], 99, &settings())
            .unwrap();

        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.total_count, 3);
        assert_eq!(state.queue.len(), 3);
        assert_eq!(state.kinds, vec!["post"]);
    }

    #[test]
    fn test_initialize_overwrites_finished_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1]);
        storage.finalize_progress("./llms.txt", 10).unwrap();
        assert!(!storage.progress_is_active().unwrap());

        storage
            .initialize_progress(&["page".to_string()], 2, &settings())
            .unwrap();
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.total_count, 2);
        assert_eq!(state.kinds, vec!["page"]);
    }

    #[test]
    fn test_set_queue_moves_to_processing() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2]);

        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.status, RunStatus::Processing);
        assert_eq!(state.queue.len(), 2);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_next_entry_is_monotonic_and_exhausts_once() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[10, 20, 30]);

        // len(queue) + 1 calls: None only on the final call
        assert_eq!(storage.next_entry().unwrap().unwrap().item_id, 10);
        assert_eq!(storage.next_entry().unwrap().unwrap().item_id, 20);
        assert_eq!(storage.next_entry().unwrap().unwrap().item_id, 30);
        assert!(storage.next_entry().unwrap().is_none());

        // repeated calls stay None and leave the cursor alone
        assert!(storage.next_entry().unwrap().is_none());
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.cursor, 3);
    }

    #[test]
    fn test_next_entry_without_slot_is_session_error() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.next_entry();
        assert!(matches!(result, Err(StorageError::SessionMissing)));
    }

    #[test]
    fn test_record_success_updates_counts_and_current() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2, 3]);

        storage
            .update_current_item(&CurrentItem {
                id: 1,
                title: "Item 1".to_string(),
                kind: "post".to_string(),
                status: ItemStatus::Processing,
                artifact_url: None,
                error: None,
            })
            .unwrap();
        storage
            .record_success(1, "https://cdn.example.com/1")
            .unwrap();

        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.processed_count, 1);
        assert_eq!(state.percentage, 33);
        let current = state.current_item.unwrap();
        assert_eq!(current.status, ItemStatus::Completed);
        assert_eq!(
            current.artifact_url.as_deref(),
            Some("https://cdn.example.com/1")
        );
    }

    #[test]
    fn test_record_failure_leaves_counter_to_caller() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2]);

        storage
            .record_failure(1, "post", "Item 1", "upload failed")
            .unwrap();
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.processed_count, 0);
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].item_id, Some(1));
        assert_eq!(state.errors[0].message, "upload failed");

        // failed items still advance the counter, via the separate call
        storage.increment_processed().unwrap();
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.processed_count, 1);
        assert_eq!(state.percentage, 50);
    }

    #[test]
    fn test_processed_never_exceeds_total_percentage() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2, 3]);

        for _ in 0..3 {
            storage.increment_processed().unwrap();
        }
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.processed_count, state.total_count);
        assert_eq!(state.percentage, 100);
    }

    #[test]
    fn test_complete_section() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2]);

        storage.complete_section("post", 2).unwrap();
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.completed_sections.len(), 1);
        assert_eq!(state.completed_sections[0].name, "Post");
        assert_eq!(state.completed_sections[0].items_processed, 2);
    }

    #[test]
    fn test_finalize_and_clear() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1]);

        storage.finalize_progress("./llms.txt", 2048).unwrap();
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.percentage, 100);
        assert_eq!(state.manifest_path.as_deref(), Some("./llms.txt"));
        assert_eq!(state.manifest_size, Some(2048));
        assert!(!storage.progress_is_active().unwrap());

        storage.clear_progress().unwrap();
        assert!(storage.load_progress().unwrap().is_none());
    }

    #[test]
    fn test_abort_records_run_level_error() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1]);

        storage.abort_progress("manifest write failed").unwrap();
        let state = storage.load_progress().unwrap().unwrap();
        assert_eq!(state.status, RunStatus::Error);
        assert!(!storage.progress_is_active().unwrap());
        let last_error = state.errors.last().unwrap();
        assert!(last_error.item_id.is_none());
        assert_eq!(last_error.message, "manifest write failed");
    }

    #[test]
    fn test_mutations_on_missing_slot_are_noops() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        storage.record_success(1, "https://cdn.example.com/1").unwrap();
        storage.record_failure(1, "post", "Item 1", "boom").unwrap();
        storage.increment_processed().unwrap();
        storage.finalize_progress("./llms.txt", 1).unwrap();
        storage.abort_progress("boom").unwrap();
        storage.clear_progress().unwrap();

        assert!(storage.load_progress().unwrap().is_none());
    }

    #[test]
    fn test_expired_slot_reads_as_absent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2]);
        assert!(storage.progress_is_active().unwrap());

        let past = (Utc::now() - Duration::seconds(10)).to_rfc3339();
        storage
            .conn
            .execute(
                "UPDATE export_progress SET expires_at = ?1 WHERE slot = 0",
                params![past],
            )
            .unwrap();

        assert!(!storage.progress_is_active().unwrap());
        assert!(storage.load_progress().unwrap().is_none());
    }

    #[test]
    fn test_every_write_refreshes_ttl() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        start_run(&mut storage, &[1, 2]);

        let nearly_expired = (Utc::now() + Duration::seconds(5)).to_rfc3339();
        storage
            .conn
            .execute(
                "UPDATE export_progress SET expires_at = ?1 WHERE slot = 0",
                params![nearly_expired],
            )
            .unwrap();

        storage.increment_processed().unwrap();

        let expires_at: String = storage
            .conn
            .query_row(
                "SELECT expires_at FROM export_progress WHERE slot = 0",
                [],
                |row| row.get(0),
            )
            .unwrap();
        let expiry = DateTime::parse_from_rfc3339(&expires_at).unwrap();
        assert!(expiry > Utc::now() + Duration::seconds(PROGRESS_TTL_SECS - 60));
    }

    #[test]
    fn test_artifact_record_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_artifact_record(1).unwrap().is_none());

        storage.upsert_artifact_record(&record(1, "hash-a")).unwrap();
        let loaded = storage.get_artifact_record(1).unwrap().unwrap();
        assert_eq!(loaded.content_hash, "hash-a");

        // upsert replaces in place
        storage.upsert_artifact_record(&record(1, "hash-b")).unwrap();
        let loaded = storage.get_artifact_record(1).unwrap().unwrap();
        assert_eq!(loaded.content_hash, "hash-b");
        assert_eq!(storage.count_artifact_records().unwrap(), 1);
    }

    #[test]
    fn test_delete_artifact_records() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_artifact_record(&record(1, "a")).unwrap();
        storage.upsert_artifact_record(&record(2, "b")).unwrap();

        let deleted = storage.delete_artifact_records().unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(storage.count_artifact_records().unwrap(), 0);
    }

    #[test]
    fn test_last_generation_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.last_generation().unwrap().is_none());

        storage.set_last_generation("./llms.txt", 4096).unwrap();
        let last = storage.last_generation().unwrap().unwrap();
        assert_eq!(last.manifest_path, "./llms.txt");
        assert_eq!(last.manifest_size, 4096);
        assert!(!last.generated_at.is_empty());
    }
}
