use serde::{Deserialize, Serialize};

use super::{CanonicalTransaction, Id};

/// A canonical transaction as persisted, with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub transaction: CanonicalTransaction,
    /// The upload that first introduced this transaction.
    pub source_file_id: Id,
}

impl StoredTransaction {
    pub fn new(transaction: CanonicalTransaction, source_file_id: Id) -> Self {
        Self {
            transaction,
            source_file_id,
        }
    }
}

/// Everything stored for one account partition, plus the version used for
/// optimistic concurrency on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSnapshot {
    pub version: u64,
    pub transactions: Vec<StoredTransaction>,
}

/// The changes one reconciliation (or deletion) applies to a partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub to_insert: Vec<StoredTransaction>,
    pub to_update: Vec<StoredTransaction>,
    pub to_delete: Vec<Id>,
    /// Incoming records identical to what is already stored.
    pub unchanged: usize,
}

impl ReconciliationResult {
    pub fn has_changes(&self) -> bool {
        !self.to_insert.is_empty() || !self.to_update.is_empty() || !self.to_delete.is_empty()
    }
}
