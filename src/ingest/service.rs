use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::IngestConfig;
use crate::file_store::FileStore;
use crate::intake::IngestFilters;
use crate::models::{
    AccountKey, DateRange, FileRef, Id, InstrumentType, ProcessedFileRecord, StoredTransaction,
};
use crate::reconcile::{AccountLedger, CanonicalRecord};
use crate::registry::SchemaRegistry;
use crate::storage::Storage;

use super::{BatchResult, IngestOrchestrator};

pub struct IngestContext {
    pub file_store: Arc<dyn FileStore>,
    pub storage: Arc<dyn Storage>,
    pub config: IngestConfig,
    pub registry: Arc<SchemaRegistry>,
    pub clock: Arc<dyn Clock>,
}

impl IngestContext {
    pub fn new(file_store: Arc<dyn FileStore>, storage: Arc<dyn Storage>) -> Self {
        Self {
            file_store,
            storage,
            config: IngestConfig::default(),
            registry: Arc::new(SchemaRegistry::builtin()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// What `delete_from_file_id` removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDeletion {
    pub file: FileRef,
    pub deleted: usize,
    /// Partitions that lost at least one record.
    pub accounts: Vec<AccountKey>,
    pub processed_record_cleared: bool,
}

/// Entry point for batch ingestion and the explicit deletion operations.
pub struct IngestService {
    file_store: Arc<dyn FileStore>,
    storage: Arc<dyn Storage>,
    orchestrator: IngestOrchestrator,
}

impl IngestService {
    pub fn new(context: IngestContext) -> Self {
        let orchestrator =
            IngestOrchestrator::new(context.file_store.clone(), context.storage.clone())
                .with_config(&context.config)
                .with_registry(context.registry)
                .with_clock(context.clock);

        Self {
            file_store: context.file_store,
            storage: context.storage,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &IngestOrchestrator {
        &self.orchestrator
    }

    /// Ingest every uploaded file that `filters` selects.
    pub async fn run(&self, filters: &IngestFilters) -> Result<BatchResult> {
        let files = self
            .file_store
            .list_files()
            .await
            .context("Failed to list uploaded files")?;
        self.orchestrator.process_batch(&files, filters).await
    }

    pub async fn processed_files(&self) -> Result<Vec<ProcessedFileRecord>> {
        let mut records = self.storage.list_processed_files().await?;
        records.sort_by(|a, b| a.file_ref().cmp(&b.file_ref()));
        Ok(records)
    }

    /// Stored records of one account, oldest activity first. `from` and `to`
    /// bound the activity date inclusively; an absent bound is open.
    pub async fn transactions(
        &self,
        key: AccountKey,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<StoredTransaction>> {
        let ledger = AccountLedger::load(self.storage.as_ref(), key).await?;
        let mut records: Vec<StoredTransaction> = ledger
            .records()
            .iter()
            .filter(|record| {
                let day = record.activity_date();
                DateRange::new(day, day).intersects(from, to)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.activity_date()
                .cmp(&b.activity_date())
                .then_with(|| a.transaction_id().as_str().cmp(b.transaction_id().as_str()))
        });
        Ok(records)
    }

    /// Delete one transaction. Returns whether it existed.
    pub async fn delete_from_transaction_id(&self, key: AccountKey, id: &Id) -> Result<bool> {
        let changes = self
            .orchestrator
            .commit(key, |ledger| ledger.removal(|record| record.transaction_id() == id))
            .await?;
        let deleted = !changes.to_delete.is_empty();
        tracing::info!(account = %key, transaction_id = %id, deleted, "Delete transaction");
        Ok(deleted)
    }

    /// Delete every transaction whose provenance is `file`, then forget that
    /// the file was processed so a later batch can ingest it again.
    pub async fn delete_from_file_id(&self, file: &FileRef) -> Result<FileDeletion> {
        let mut deleted = 0;
        let mut accounts = Vec::new();

        // A file's instrument is only known from its metadata, which may be
        // gone by now; scan every partition the upload tuple can map to.
        for instrument in InstrumentType::ALL
            .into_iter()
            .filter(|instrument| instrument.account_type() == file.account_type)
        {
            let key = AccountKey::new(file.owner, instrument);
            let changes = self
                .orchestrator
                .commit(key, |ledger| {
                    ledger.removal(|record| record.source_file_id == file.file_id)
                })
                .await
                .with_context(|| format!("Failed to delete records of {file} from {key}"))?;
            if !changes.to_delete.is_empty() {
                deleted += changes.to_delete.len();
                accounts.push(key);
            }
        }

        let processed_record_cleared = self.storage.remove_processed(file).await?;
        tracing::info!(
            file = %file,
            deleted,
            partitions = accounts.len(),
            processed_record_cleared,
            "Delete file"
        );

        Ok(FileDeletion {
            file: file.clone(),
            deleted,
            accounts,
            processed_record_cleared,
        })
    }
}
