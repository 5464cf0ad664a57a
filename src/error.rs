//! Per-file failure taxonomy for the ingestion pipeline.

use serde::{Deserialize, Serialize};

use crate::file_store::FetchError;
use crate::models::Id;

/// Errors that fail a single file. None of these abort a batch.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Unknown instrument type: {0}")]
    UnknownInstrumentType(String),

    /// Financial values are never guessed; any missing or malformed cell
    /// rejects the whole file. Row 0 is the header row.
    #[error("Invalid raw record at row {row}: {reason}")]
    InvalidRawRecord { row: usize, reason: String },

    #[error("Cannot determine the date range covered by file {0}")]
    UnknownFileDateRange(Id),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Store write for {account} still conflicting after {attempts} attempts")]
    StoreWriteConflict { account: String, attempts: usize },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    pub fn invalid_record(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRawRecord {
            row,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownInstrumentType(_) => ErrorKind::UnknownInstrumentType,
            Self::InvalidRawRecord { .. } => ErrorKind::InvalidRawRecord,
            Self::UnknownFileDateRange(_) => ErrorKind::UnknownFileDateRange,
            Self::Fetch(FetchError::FileNotFound(_)) => ErrorKind::FileNotFound,
            Self::Fetch(FetchError::AuthExpired(_)) => ErrorKind::AuthExpired,
            Self::Fetch(FetchError::Transient(_)) => ErrorKind::TransientFetchError,
            Self::StoreWriteConflict { .. } => ErrorKind::StoreWriteConflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

/// Flat, serializable mirror of [`PipelineError`] for batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownInstrumentType,
    InvalidRawRecord,
    UnknownFileDateRange,
    FileNotFound,
    AuthExpired,
    TransientFetchError,
    StoreWriteConflict,
    Storage,
}
