mod local;
mod memory;

pub use local::{LocalFileStore, MANIFEST_FILE};
pub use memory::MemoryFileStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{FileMetadata, FileRef, Id};

/// Failures reported by a file store for a single upload.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("File not found: {0}")]
    FileNotFound(Id),

    /// Credentials need refreshing outside the pipeline.
    #[error("File store authorization expired: {0}")]
    AuthExpired(String),

    #[error("Transient fetch error: {0}")]
    Transient(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Where uploaded transaction exports live.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Every upload the store knows about, processed or not.
    async fn list_files(&self) -> Result<Vec<FileRef>>;

    async fn get_file_metadata(&self, file_id: &Id) -> Result<FileMetadata, FetchError>;

    async fn get_file_content(&self, file_id: &Id) -> Result<Vec<u8>, FetchError>;
}
