//! In-memory storage implementation for testing.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{
    AccountKey, FileRef, PartitionSnapshot, ProcessedFileRecord, ReconciliationResult,
};
use crate::reconcile;

use super::{Storage, WriteConflict};

/// In-memory storage for testing purposes.
pub struct MemoryStorage {
    partitions: Mutex<HashMap<AccountKey, PartitionSnapshot>>,
    processed: Mutex<BTreeMap<FileRef, ProcessedFileRecord>>,
    writes: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            partitions: Mutex::new(HashMap::new()),
            processed: Mutex::new(BTreeMap::new()),
            writes: Mutex::new(0),
        }
    }

    /// Number of successful partition writes so far.
    pub async fn write_count(&self) -> usize {
        *self.writes.lock().await
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn load_partition(&self, key: &AccountKey) -> Result<PartitionSnapshot> {
        let partitions = self.partitions.lock().await;
        Ok(partitions.get(key).cloned().unwrap_or_default())
    }

    async fn write_partition(
        &self,
        key: &AccountKey,
        changes: &ReconciliationResult,
        expected_version: u64,
    ) -> Result<u64> {
        let mut partitions = self.partitions.lock().await;
        let current = partitions.entry(*key).or_default();
        if current.version != expected_version {
            return Err(WriteConflict {
                account: *key,
                expected: expected_version,
                actual: current.version,
            }
            .into());
        }

        let records = std::mem::take(&mut current.transactions);
        current.transactions = reconcile::apply(records, changes);
        current.version += 1;
        *self.writes.lock().await += 1;
        Ok(current.version)
    }

    async fn list_partitions(&self) -> Result<Vec<AccountKey>> {
        let partitions = self.partitions.lock().await;
        let mut keys: Vec<AccountKey> = partitions.keys().copied().collect();
        keys.sort();
        Ok(keys)
    }

    async fn list_processed_files(&self) -> Result<Vec<ProcessedFileRecord>> {
        let processed = self.processed.lock().await;
        Ok(processed.values().cloned().collect())
    }

    async fn mark_processed(&self, record: &ProcessedFileRecord) -> Result<()> {
        let mut processed = self.processed.lock().await;
        processed.insert(record.file_ref(), record.clone());
        Ok(())
    }

    async fn remove_processed(&self, file: &FileRef) -> Result<bool> {
        let mut processed = self.processed.lock().await;
        Ok(processed.remove(file).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{AccountType, InstrumentType, Owner};
    use crate::storage::is_write_conflict;

    #[tokio::test]
    async fn version_mismatch_is_a_write_conflict() -> Result<()> {
        let storage = MemoryStorage::new();
        let key = AccountKey::new(Owner::Foster, InstrumentType::ChaseCredit);
        let empty = ReconciliationResult::default();

        assert_eq!(storage.write_partition(&key, &empty, 0).await?, 1);
        let err = storage.write_partition(&key, &empty, 0).await.unwrap_err();
        assert!(is_write_conflict(&err));
        let conflict = err.downcast_ref::<WriteConflict>().unwrap();
        assert_eq!(conflict.actual, 1);
        assert_eq!(storage.write_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn processed_records_are_keyed_by_file() -> Result<()> {
        let storage = MemoryStorage::new();
        let file = FileRef::new(Owner::Natalia, AccountType::Savings, "f-1");
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();

        storage
            .mark_processed(&ProcessedFileRecord::new(&file, None, at))
            .await?;
        storage
            .mark_processed(&ProcessedFileRecord::new(&file, None, at))
            .await?;
        assert_eq!(storage.list_processed_files().await?.len(), 1);

        assert!(storage.remove_processed(&file).await?);
        assert!(!storage.remove_processed(&file).await?);
        Ok(())
    }
}
