#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use numifocus::clock::FixedClock;
use numifocus::file_store::FileStore;
use numifocus::ingest::IngestOrchestrator;
use numifocus::models::{
    AccountKey, BankingTransaction, CanonicalTransaction, Classification, FileRef, Id,
    PartitionSnapshot, ProcessedFileRecord, ReconciliationResult, StoredTransaction,
};
use numifocus::retry::RetryPolicy;
use numifocus::storage::{MemoryStorage, Storage};

pub const USAA_HEADER: &str = "Date,Description,Original Description,Category,Amount,Status";
pub const DISCOVER_HEADER: &str =
    "Transaction Date,Transaction Description,Transaction Type,Debit,Credit";

/// `(date, description, category, signed amount)` rows, all posted.
pub fn usaa_csv(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut csv = format!("{USAA_HEADER}\n");
    for (date, description, category, amount) in rows {
        csv.push_str(&format!("{date},{description},,{category},{amount},Posted\n"));
    }
    csv
}

/// `(date, description, type, debit, credit)` rows.
pub fn discover_csv(rows: &[(&str, &str, &str, &str, &str)]) -> String {
    let mut csv = format!("{DISCOVER_HEADER}\n");
    for (date, description, kind, debit, credit) in rows {
        csv.push_str(&format!("{date},{description},{kind},{debit},{credit}\n"));
    }
    csv
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, 1, 1, 0.0)
}

pub fn orchestrator(
    file_store: Arc<dyn FileStore>,
    storage: Arc<dyn Storage>,
) -> IngestOrchestrator {
    IngestOrchestrator::new(file_store, storage)
        .with_retry(fast_retry())
        .with_clock(Arc::new(FixedClock::at_midnight(2024, 6, 1)))
}

pub fn banking_record(key: AccountKey, id: &str, description: &str) -> StoredTransaction {
    let record = BankingTransaction {
        transaction_id: Id::from_string(id),
        activity_date: date(2024, 1, 20),
        account: key.label(),
        credit: None,
        debit: Some("12.00".parse().unwrap()),
        classification: Classification::Other,
        subclassification: None,
        old_classification: None,
        description: description.to_string(),
        old_description: None,
        posted: true,
    };
    let transaction = CanonicalTransaction::banking(key.account_type(), record).unwrap();
    StoredTransaction::new(transaction, Id::from_string("elsewhere"))
}

/// Memory storage where another writer sneaks in ahead of the next
/// `conflicts` partition writes, inserting one record each time.
pub struct ConflictingStorage {
    pub inner: MemoryStorage,
    conflicts: AtomicUsize,
    intrusions: AtomicUsize,
}

impl ConflictingStorage {
    pub fn new(conflicts: usize) -> Self {
        Self {
            inner: MemoryStorage::new(),
            conflicts: AtomicUsize::new(conflicts),
            intrusions: AtomicUsize::new(0),
        }
    }

    pub fn intrusions(&self) -> usize {
        self.intrusions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for ConflictingStorage {
    async fn load_partition(&self, key: &AccountKey) -> Result<PartitionSnapshot> {
        self.inner.load_partition(key).await
    }

    async fn write_partition(
        &self,
        key: &AccountKey,
        changes: &ReconciliationResult,
        expected_version: u64,
    ) -> Result<u64> {
        let intrude = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if intrude {
            let n = self.intrusions.fetch_add(1, Ordering::SeqCst);
            let intruder = banking_record(*key, &format!("intruder-{n}"), "OTHER WRITER");
            let sneaked = ReconciliationResult {
                to_insert: vec![intruder],
                ..Default::default()
            };
            self.inner
                .write_partition(key, &sneaked, expected_version)
                .await?;
        }
        self.inner
            .write_partition(key, changes, expected_version)
            .await
    }

    async fn list_partitions(&self) -> Result<Vec<AccountKey>> {
        self.inner.list_partitions().await
    }

    async fn list_processed_files(&self) -> Result<Vec<ProcessedFileRecord>> {
        self.inner.list_processed_files().await
    }

    async fn mark_processed(&self, record: &ProcessedFileRecord) -> Result<()> {
        self.inner.mark_processed(record).await
    }

    async fn remove_processed(&self, file: &FileRef) -> Result<bool> {
        self.inner.remove_processed(file).await
    }
}
