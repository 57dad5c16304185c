//! Run controller: the export state machine, driven one step at a time
//!
//! Each call to [`ExportController::step`] performs exactly one unit of
//! work: one queue item, or the finalize step once the queue is exhausted.
//! This bounds per-call latency and makes every call safely retryable from
//! a stateless polling caller. Mutual exclusion between runs is enforced
//! entirely by the single-slot progress store.

use crate::artifact::{ArtifactClient, ArtifactError};
use crate::config::{Config, ExportSettings};
use crate::content::{
    kind_label, summarize_body, ContentSource, Item, KindStats, SqliteContentSource,
};
use crate::export::processor::{ItemProcessor, ProcessError};
use crate::manifest::{format_manifest, Manifest, ManifestLink, ManifestSection};
use crate::storage::{
    CurrentItem, ItemStatus, LastGeneration, QueueEntry, RunState, RunStatus, SqliteStorage,
    Storage, StorageError,
};
use crate::ExportError;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Recorded item errors beyond this many abort the run
const ERROR_ABORT_THRESHOLD: usize = 25;

/// Item counters of one polling response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepItems {
    pub parsed: usize,
    pub total: usize,
}

/// Identity of the item a step just processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    pub title: String,
}

/// One polling response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub finished: bool,
    pub items: StepItems,
    pub last: Option<LastItem>,
}

impl StepReport {
    /// The terminal "nothing to do" response
    fn idle() -> Self {
        Self {
            finished: true,
            items: StepItems { parsed: 0, total: 0 },
            last: None,
        }
    }
}

/// Point-in-time view of an in-flight run, for status reporting
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub status: RunStatus,
    pub percentage: u8,
    pub processed: usize,
    pub total: usize,
    pub current_title: Option<String>,
    pub error_count: usize,
}

impl From<&RunState> for ProgressSnapshot {
    fn from(state: &RunState) -> Self {
        Self {
            status: state.status,
            percentage: state.percentage,
            processed: state.processed_count,
            total: state.total_count,
            current_title: state.current_item.as_ref().map(|c| c.title.clone()),
            error_count: state.errors.len(),
        }
    }
}

/// Generation status for the host's status display
#[derive(Debug, Clone)]
pub struct GenerationStatus {
    pub last: Option<LastGeneration>,
    pub manifest_path: String,
    pub manifest_exists: bool,
    pub progress: Option<ProgressSnapshot>,
}

/// Drives the export state machine
pub struct ExportController {
    settings: ExportSettings,
    site_title: String,
    site_description: Option<String>,
    tenant_id: String,
    manifest_path: PathBuf,
    storage: SqliteStorage,
    source: SqliteContentSource,
    client: ArtifactClient,
}

impl ExportController {
    /// Builds a controller from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, ExportError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let source = SqliteContentSource::new(Path::new(&config.output.database_path))?;
        let client = ArtifactClient::new(&config.artifact).map_err(ArtifactError::Http)?;

        Ok(Self {
            settings: config.export.clone(),
            site_title: config.site.title.clone(),
            site_description: config.site.description.clone(),
            tenant_id: config.site.tenant_id.clone(),
            manifest_path: PathBuf::from(&config.output.manifest_path),
            storage,
            source,
            client,
        })
    }

    /// Performs one unit of work: process one queue item or finalize
    ///
    /// With `start` set, any active run is cleared first (the last start
    /// request always wins) and a fresh queue is built before the first
    /// item is processed. Without `start` and with no active run, the call
    /// is a no-op returning the terminal idle response.
    pub async fn step(&mut self, start: bool) -> Result<StepReport, ExportError> {
        if start {
            self.begin_run()?;
        } else if !self.storage.progress_is_active()? {
            tracing::debug!("no active export run, nothing to do");
            return Ok(StepReport::idle());
        }

        let state = self
            .storage
            .load_progress()?
            .ok_or(StorageError::SessionMissing)?;

        match self.storage.next_entry()? {
            None => self.finalize_run(&state),
            Some(entry) => self.process_entry(entry, &state).await,
        }
    }

    /// Clears the in-flight run state, freeing the slot
    pub fn clear_run(&mut self) -> Result<(), ExportError> {
        self.storage.clear_progress()?;
        Ok(())
    }

    /// Deletes all stored artifact records; returns how many were removed
    pub fn clear_records(&mut self) -> Result<u64, ExportError> {
        Ok(self.storage.delete_artifact_records()?)
    }

    /// Reports the last generation outcome and any in-flight progress
    pub fn status(&self) -> Result<GenerationStatus, ExportError> {
        Ok(GenerationStatus {
            last: self.storage.last_generation()?,
            manifest_path: self.manifest_path.display().to_string(),
            manifest_exists: self.manifest_path.exists(),
            progress: self
                .storage
                .load_progress()?
                .as_ref()
                .map(ProgressSnapshot::from),
        })
    }

    /// Per-kind item counts from the content store
    pub fn content_stats(&self) -> Result<Vec<KindStats>, ExportError> {
        Ok(self.source.content_stats()?)
    }

    /// Clears any previous run and builds a fresh queue
    fn begin_run(&mut self) -> Result<(), ExportError> {
        if self.storage.progress_is_active()? {
            tracing::info!("clearing in-flight run: last start request wins");
        }
        self.storage.clear_progress()?;

        if self.settings.kinds.is_empty() {
            return Err(ExportError::NoItemsConfigured);
        }

        let mut queue: Vec<QueueEntry> = Vec::new();
        for kind in &self.settings.kinds {
            let items = self.source.enumerate(kind, &self.settings)?;
            tracing::debug!(kind = %kind, count = items.len(), "enumerated items");
            queue.extend(items.into_iter().map(|item| QueueEntry {
                item_id: item.id,
                kind: kind.clone(),
            }));
        }

        tracing::info!(total = queue.len(), "starting export run");
        self.storage
            .initialize_progress(&self.settings.kinds, queue.len(), &self.settings)?;
        self.storage.set_queue(&queue)?;
        Ok(())
    }

    /// Processes the queue entry handed out for this step
    ///
    /// `state` is the run state as loaded before the cursor advanced, so
    /// `state.cursor` is this entry's queue index.
    async fn process_entry(
        &mut self,
        entry: QueueEntry,
        state: &RunState,
    ) -> Result<StepReport, ExportError> {
        // the snapshot taken at start governs in-flight processing
        let options = state.options.clone();

        let last = match self.source.get_item(entry.item_id)? {
            None => {
                tracing::warn!(item_id = entry.item_id, "queued item no longer exists");
                let title = format!("#{}", entry.item_id);
                self.storage.update_current_item(&CurrentItem {
                    id: entry.item_id,
                    title: title.clone(),
                    kind: entry.kind.clone(),
                    status: ItemStatus::Failed,
                    artifact_url: None,
                    error: Some("item no longer exists".to_string()),
                })?;
                self.storage.record_failure(
                    entry.item_id,
                    &entry.kind,
                    &title,
                    "item no longer exists",
                )?;
                self.storage.increment_processed()?;
                LastItem {
                    kind: entry.kind.clone(),
                    id: entry.item_id,
                    title,
                }
            }
            Some(item) => {
                self.process_item(&item, &options).await?;
                LastItem {
                    kind: item.kind.clone(),
                    id: item.id,
                    title: item.title.clone(),
                }
            }
        };

        // section bookkeeping: was this the last entry of its kind?
        let next_kind = state.queue.get(state.cursor + 1).map(|next| &next.kind);
        if next_kind != Some(&entry.kind) {
            let items_in_kind = state.queue.iter().filter(|e| e.kind == entry.kind).count();
            self.storage.complete_section(&entry.kind, items_in_kind)?;
        }

        let updated = self
            .storage
            .load_progress()?
            .ok_or(StorageError::SessionMissing)?;

        if updated.errors.len() >= ERROR_ABORT_THRESHOLD {
            let message = format!("aborting run after {} item errors", updated.errors.len());
            tracing::error!("{}", message);
            self.storage.abort_progress(&message)?;
            return Err(ExportError::Generation(message));
        }

        Ok(StepReport {
            finished: false,
            items: StepItems {
                parsed: updated.processed_count,
                total: updated.total_count,
            },
            last: Some(last),
        })
    }

    /// Runs the item processor and records the outcome
    async fn process_item(
        &mut self,
        item: &Item,
        options: &ExportSettings,
    ) -> Result<(), ExportError> {
        self.storage.update_current_item(&CurrentItem {
            id: item.id,
            title: item.title.clone(),
            kind: item.kind.clone(),
            status: ItemStatus::Processing,
            artifact_url: None,
            error: None,
        })?;

        let processor = ItemProcessor::new(&self.client, &self.tenant_id);
        match processor.process(&mut self.storage, item, options).await {
            Ok(outcome) => {
                tracing::debug!(
                    item_id = item.id,
                    reused = outcome.reused,
                    size = outcome.size,
                    "item processed"
                );
                self.storage.record_success(item.id, &outcome.artifact_url)?;
            }
            Err(ProcessError::EmptyContent) => {
                tracing::debug!(item_id = item.id, "empty content, skipping item");
                self.storage.update_current_item(&CurrentItem {
                    id: item.id,
                    title: item.title.clone(),
                    kind: item.kind.clone(),
                    status: ItemStatus::Skipped,
                    artifact_url: None,
                    error: None,
                })?;
                self.storage.increment_processed()?;
            }
            Err(ProcessError::Artifact(e)) => {
                tracing::error!(item_id = item.id, error = %e, "artifact upload failed");
                self.storage
                    .record_failure(item.id, &item.kind, &item.title, &e.to_string())?;
                self.storage.increment_processed()?;
            }
            Err(ProcessError::Storage(e)) => {
                // storage trouble is a run-level failure, not an item failure
                let message = e.to_string();
                self.storage.abort_progress(&message)?;
                return Err(ExportError::Storage(e));
            }
        }

        Ok(())
    }

    /// Assembles and writes the manifest, then releases the slot
    fn finalize_run(&mut self, state: &RunState) -> Result<StepReport, ExportError> {
        tracing::info!("queue exhausted, assembling manifest");

        let manifest = match self.build_manifest(&state.options) {
            Ok(manifest) => manifest,
            Err(e) => {
                let message = format!("failed to assemble manifest: {}", e);
                tracing::error!("{}", message);
                self.storage.abort_progress(&message)?;
                return Err(ExportError::Generation(message));
            }
        };
        let content = format_manifest(&manifest);

        if let Err(e) = std::fs::write(&self.manifest_path, &content) {
            let message = format!(
                "failed to write manifest to {}: {}",
                self.manifest_path.display(),
                e
            );
            tracing::error!("{}", message);
            self.storage.abort_progress(&message)?;
            return Err(ExportError::Generation(message));
        }

        let size = content.len() as u64;
        let path = self.manifest_path.display().to_string();
        self.storage.finalize_progress(&path, size)?;
        self.storage.set_last_generation(&path, size)?;
        self.storage.clear_progress()?;

        tracing::info!(
            path = %path,
            size,
            items = manifest.item_count,
            "export run completed"
        );

        Ok(StepReport {
            finished: true,
            items: StepItems {
                parsed: state.processed_count,
                total: state.total_count,
            },
            last: None,
        })
    }

    /// Builds the manifest from stored artifact records
    ///
    /// Links come only from artifact records; display titles and details
    /// are re-read from the live items. Nothing here re-uploads.
    fn build_manifest(&self, options: &ExportSettings) -> Result<Manifest, ExportError> {
        let mut sections = Vec::new();
        let mut item_count = 0;

        for kind in &options.kinds {
            let items = self.source.enumerate(kind, options)?;
            let mut links = Vec::new();
            for item in items {
                let Some(record) = self.storage.get_artifact_record(item.id)? else {
                    continue;
                };
                links.push(ManifestLink {
                    details: link_details(&item, options),
                    title: item.title,
                    url: record.artifact_url,
                });
            }
            if links.is_empty() {
                continue;
            }
            item_count += links.len();
            sections.push(ManifestSection {
                name: kind_label(kind),
                links,
            });
        }

        Ok(Manifest {
            title: self.site_title.clone(),
            description: self.site_description.clone(),
            sections,
            generated_at: Utc::now(),
            item_count,
        })
    }
}

/// Link description: the excerpt when enabled and present, otherwise a
/// short summary of the body
fn link_details(item: &Item, options: &ExportSettings) -> Option<String> {
    if options.include_excerpts {
        if let Some(excerpt) = item.excerpt.as_deref().filter(|e| !e.trim().is_empty()) {
            return Some(excerpt.trim().to_string());
        }
    }
    let summary = summarize_body(&item.body);
    (!summary.is_empty()).then_some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_report_shape() {
        let report = StepReport::idle();
        assert!(report.finished);
        assert_eq!(report.items, StepItems { parsed: 0, total: 0 });
        assert!(report.last.is_none());
    }

    // The state machine itself is exercised end-to-end in
    // tests/export_pipeline.rs against a mock artifact endpoint.
}
