mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

use crate::models::{AccountKey, FileRef, PartitionSnapshot, ProcessedFileRecord, ReconciliationResult};

/// A partition write lost an optimistic-concurrency race.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Partition {account} is at version {actual}, write expected version {expected}")]
pub struct WriteConflict {
    pub account: AccountKey,
    pub expected: u64,
    pub actual: u64,
}

pub fn is_write_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<WriteConflict>().is_some()
}

/// Storage trait for canonical transactions and the processed-file ledger.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    // Partitions

    /// Load a partition. A partition never written is empty at version 0.
    async fn load_partition(&self, key: &AccountKey) -> Result<PartitionSnapshot>;

    /// Apply `changes` atomically if the partition is still at
    /// `expected_version`, returning the new version. Fails with
    /// [`WriteConflict`] otherwise.
    async fn write_partition(
        &self,
        key: &AccountKey,
        changes: &ReconciliationResult,
        expected_version: u64,
    ) -> Result<u64>;

    async fn list_partitions(&self) -> Result<Vec<AccountKey>>;

    // Processed files
    async fn list_processed_files(&self) -> Result<Vec<ProcessedFileRecord>>;
    async fn mark_processed(&self, record: &ProcessedFileRecord) -> Result<()>;
    /// Returns whether a record was removed.
    async fn remove_processed(&self, file: &FileRef) -> Result<bool>;
}
