//! Export pipeline: per-item processing and the run controller
//!
//! [`ItemProcessor`] handles one item (extract, hash, upload-or-reuse,
//! record); [`ExportController`] drives whole runs one polling step at a
//! time and assembles the final manifest.

mod controller;
mod processor;

pub use controller::{
    ExportController, GenerationStatus, LastItem, ProgressSnapshot, StepItems, StepReport,
};
pub use processor::{content_hash, ItemProcessor, ProcessError, ProcessOutcome};
