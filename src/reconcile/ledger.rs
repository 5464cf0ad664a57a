use std::collections::HashSet;

use anyhow::Result;

use crate::models::{AccountKey, Id, ReconciliationResult, StoredTransaction};
use crate::storage::Storage;

use super::{reconcile, CanonicalRecord};

/// One account partition as loaded from storage, pinned to the version it
/// was read at.
#[derive(Debug, Clone)]
pub struct AccountLedger {
    key: AccountKey,
    version: u64,
    records: Vec<StoredTransaction>,
}

impl AccountLedger {
    pub async fn load(storage: &dyn Storage, key: AccountKey) -> Result<Self> {
        let snapshot = storage.load_partition(&key).await?;
        Ok(Self {
            key,
            version: snapshot.version,
            records: snapshot.transactions,
        })
    }

    pub fn key(&self) -> AccountKey {
        self.key
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> &[StoredTransaction] {
        &self.records
    }

    pub fn find(&self, id: &Id) -> Option<&StoredTransaction> {
        self.records.iter().find(|r| r.transaction_id() == id)
    }

    /// Check every stored record and the partition-wide id uniqueness.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for record in &self.records {
            let id = record.transaction_id();
            if !seen.insert(id) {
                return Err(format!("duplicate transaction id {id} in {}", self.key));
            }
            if record.transaction.account_type() != self.key.account_type() {
                return Err(format!(
                    "{id} is a {} record in a {} partition",
                    record.transaction.account_type(),
                    self.key.account_type()
                ));
            }
            record.validate().map_err(|e| format!("{id}: {e}"))?;
        }
        Ok(())
    }

    pub fn reconcile(&self, incoming: Vec<StoredTransaction>) -> ReconciliationResult {
        reconcile(&self.records, incoming)
    }

    /// Changes that delete every record matching `predicate`.
    pub fn removal(&self, predicate: impl Fn(&StoredTransaction) -> bool) -> ReconciliationResult {
        ReconciliationResult {
            to_delete: self
                .records
                .iter()
                .filter(|&r| predicate(r))
                .map(|r| r.transaction_id().clone())
                .collect(),
            ..Default::default()
        }
    }

    /// Write `changes` if the partition is still at the loaded version.
    /// Fails with [`crate::storage::WriteConflict`] otherwise.
    pub async fn sync(&self, storage: &dyn Storage, changes: &ReconciliationResult) -> Result<u64> {
        if !changes.has_changes() {
            return Ok(self.version);
        }
        storage
            .write_partition(&self.key, changes, self.version)
            .await
    }
}
