//! Batch ingestion: intake, fetch, transform, reconcile, persist.

mod locks;
mod orchestrator;
mod service;

pub use locks::AccountLocks;
pub use orchestrator::{CommitError, IngestOrchestrator};
pub use service::{FileDeletion, IngestContext, IngestService};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};
use crate::models::FileRef;

/// Per-file pipeline stage. A failure is reported at the stage that was
/// being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Selected,
    Fetched,
    Transformed,
    Reconciled,
    Persisted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: FileRef,
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl FileFailure {
    pub fn new(file: &FileRef, stage: Stage, error: &PipelineError) -> Self {
        Self {
            file: file.clone(),
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one batch. Counts are per transaction record; `skipped_count`
/// counts incoming records identical to what was already stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub processed_files: Vec<FileRef>,
    pub inserted_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<FileFailure>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_changes(&self) -> bool {
        self.inserted_count > 0 || self.updated_count > 0
    }

    fn fail(&mut self, file: &FileRef, stage: Stage, error: &PipelineError) {
        tracing::warn!(
            file = %file,
            stage = ?stage,
            kind = ?error.kind(),
            error = %error,
            "File failed"
        );
        self.errors.push(FileFailure::new(file, stage, error));
    }
}
