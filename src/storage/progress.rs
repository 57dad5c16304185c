//! Run state model for the single-slot progress store
//!
//! One export run exists system-wide at most. Its full state is persisted
//! as a single JSON document in a one-row table with a sliding expiry, so
//! a crashed run can never lock the pipeline out for more than the TTL.

use crate::config::ExportSettings;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How long an untouched run state survives before it reads as absent
pub const PROGRESS_TTL_SECS: i64 = 3600;

/// Status of an export run
///
/// Transitions only move forward (initializing -> processing ->
/// completed | error); the only way back is clearing the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Initializing,
    Processing,
    Completed,
    Error,
}

impl RunStatus {
    /// Returns true while the run still owns the slot
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Initializing | Self::Processing)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initializing => "initializing",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// Processing status of the item a step is working on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Processing,
    Uploading,
    Completed,
    Failed,
    Skipped,
}

/// One scheduled unit of work within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub item_id: i64,
    pub kind: String,
}

/// Identity and status of the item currently being processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentItem {
    pub id: i64,
    pub title: String,
    pub kind: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One recorded error; item fields are absent for run-level errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunErrorEntry {
    pub item_id: Option<i64>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub message: String,
    pub at: String,
}

/// A finished manifest section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSection {
    pub name: String,
    pub kind: String,
    pub items_processed: usize,
    pub completed_at: String,
}

/// Full state of the single in-flight export run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    pub queue: Vec<QueueEntry>,
    /// Index of the next queue entry to hand out; monotonically increasing
    pub cursor: usize,
    pub processed_count: usize,
    pub total_count: usize,
    pub percentage: u8,
    pub current_item: Option<CurrentItem>,
    pub completed_sections: Vec<CompletedSection>,
    pub errors: Vec<RunErrorEntry>,
    pub kinds: Vec<String>,
    /// Settings snapshot taken at start; in-flight processing never sees
    /// later settings changes
    pub options: ExportSettings,
    pub started_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_size: Option<u64>,
}

impl RunState {
    /// Creates the state for a freshly initialized run
    pub fn new(kinds: &[String], total: usize, options: &ExportSettings) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            status: RunStatus::Initializing,
            queue: Vec::new(),
            cursor: 0,
            processed_count: 0,
            total_count: total,
            percentage: 0,
            current_item: None,
            completed_sections: Vec::new(),
            errors: Vec::new(),
            kinds: kinds.to_vec(),
            options: options.clone(),
            started_at: now.clone(),
            updated_at: now,
            manifest_path: None,
            manifest_size: None,
        }
    }

    /// Recomputes the progress percentage: floor(min(100, processed*100/total))
    pub fn refresh_percentage(&mut self) {
        self.percentage = if self.total_count == 0 {
            0
        } else {
            std::cmp::min(100, (self.processed_count * 100) / self.total_count) as u8
        };
    }
}
