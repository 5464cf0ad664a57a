//! Drives one batch of uploaded files through the pipeline.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::clock::{Clock, SystemClock};
use crate::config::IngestConfig;
use crate::error::PipelineError;
use crate::file_store::{FetchError, FileStore};
use crate::intake::{self, IngestFilters};
use crate::models::raw::decode_csv;
use crate::models::{
    AccountKey, CanonicalTransaction, DateRange, FileMetadata, FileRef, Id, ProcessedFileRecord,
    ReconciliationResult, StoredTransaction,
};
use crate::reconcile::{merge, AccountLedger, CanonicalRecord};
use crate::registry::SchemaRegistry;
use crate::retry::RetryPolicy;
use crate::storage::{is_write_conflict, Storage};
use crate::transform::normalize_file;

use super::{AccountLocks, BatchResult, FileFailure, Stage};

/// A partition commit that did not happen.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CommitError {
    pub stage: Stage,
    pub error: PipelineError,
}

/// A file that made it through transform.
struct PreparedFile {
    file: FileRef,
    account: AccountKey,
    records: Vec<CanonicalTransaction>,
    covered_range: Option<DateRange>,
}

#[derive(Default)]
struct AccountOutcome {
    processed: Vec<FileRef>,
    inserted: usize,
    updated: usize,
    skipped: usize,
    errors: Vec<FileFailure>,
}

pub struct IngestOrchestrator {
    file_store: Arc<dyn FileStore>,
    storage: Arc<dyn Storage>,
    registry: Arc<SchemaRegistry>,
    locks: Arc<AccountLocks>,
    retry: RetryPolicy,
    fetch_concurrency: usize,
    write_max_attempts: usize,
    clock: Arc<dyn Clock>,
}

impl IngestOrchestrator {
    pub fn new(file_store: Arc<dyn FileStore>, storage: Arc<dyn Storage>) -> Self {
        Self {
            file_store,
            storage,
            registry: Arc::new(SchemaRegistry::builtin()),
            locks: Arc::new(AccountLocks::new()),
            retry: RetryPolicy::default(),
            fetch_concurrency: IngestConfig::default().fetch_concurrency,
            write_max_attempts: IngestConfig::default().write_max_attempts,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config(mut self, config: &IngestConfig) -> Self {
        self.retry = RetryPolicy::from_config(config);
        self.fetch_concurrency = config.fetch_concurrency.max(1);
        self.write_max_attempts = config.write_max_attempts.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Share partition locks with another orchestrator or service.
    pub fn with_locks(mut self, locks: Arc<AccountLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Ingest `files`, isolating failures per file.
    ///
    /// Only storage failures that prevent intake itself (reading the
    /// processed-file ledger) fail the whole batch.
    pub async fn process_batch(
        &self,
        files: &[FileRef],
        filters: &IngestFilters,
    ) -> Result<BatchResult> {
        let mut result = BatchResult::default();
        let processed = self.storage.list_processed_files().await?;
        let shortlisted = intake::shortlist(files, filters, &processed);
        tracing::info!(
            candidates = files.len(),
            shortlisted = shortlisted.len(),
            filtered = filters.is_active(),
            "Starting batch"
        );

        let fetched: Vec<(FileRef, Result<FileMetadata, FetchError>)> = stream::iter(shortlisted)
            .map(|file| async move {
                let metadata = self.fetch_metadata(&file.file_id).await;
                (file, metadata)
            })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let mut metadata: HashMap<FileRef, FileMetadata> = HashMap::new();
        let mut reachable = Vec::new();
        for (file, outcome) in fetched {
            match outcome {
                Ok(meta) => {
                    reachable.push(file.clone());
                    metadata.insert(file, meta);
                }
                Err(err) => result.fail(&file, Stage::Fetched, &PipelineError::from(err)),
            }
        }

        let ranges: HashMap<FileRef, DateRange> = metadata
            .iter()
            .filter_map(|(file, meta)| meta.covered_range.map(|range| (file.clone(), range)))
            .collect();
        let selection = intake::select_files(&reachable, filters, &processed, &ranges);
        for (file, err) in &selection.rejected {
            result.fail(file, Stage::Selected, err);
        }

        let jobs: Vec<(FileRef, FileMetadata)> = selection
            .selected
            .into_iter()
            .filter_map(|file| metadata.remove(&file).map(|meta| (file, meta)))
            .collect();
        tracing::info!(selected = jobs.len(), "Fetching selected files");

        // `buffered` keeps selection order, which decides which duplicate wins.
        let prepared: Vec<Result<PreparedFile, (FileRef, Stage, PipelineError)>> =
            stream::iter(jobs)
                .map(|(file, meta)| self.prepare(file, meta))
                .buffered(self.fetch_concurrency)
                .collect()
                .await;

        let mut by_account: BTreeMap<AccountKey, Vec<PreparedFile>> = BTreeMap::new();
        for outcome in prepared {
            match outcome {
                Ok(file) => by_account.entry(file.account).or_default().push(file),
                Err((file, stage, err)) => result.fail(&file, stage, &err),
            }
        }

        // Partitions are disjoint, so accounts commit concurrently.
        let outcomes = join_all(
            by_account
                .into_iter()
                .map(|(key, files)| self.persist_account(key, files)),
        )
        .await;
        for outcome in outcomes {
            result.processed_files.extend(outcome.processed);
            result.inserted_count += outcome.inserted;
            result.updated_count += outcome.updated;
            result.skipped_count += outcome.skipped;
            result.errors.extend(outcome.errors);
        }

        tracing::info!(
            processed = result.processed_files.len(),
            inserted = result.inserted_count,
            updated = result.updated_count,
            skipped = result.skipped_count,
            failed = result.errors.len(),
            "Batch finished"
        );
        Ok(result)
    }

    async fn fetch_metadata(&self, file_id: &Id) -> Result<FileMetadata, FetchError> {
        self.retry
            .retry_if(
                |_| self.file_store.get_file_metadata(file_id),
                FetchError::is_retryable,
            )
            .await
    }

    async fn fetch_content(&self, file_id: &Id) -> Result<Vec<u8>, FetchError> {
        self.retry
            .retry_if(
                |_| self.file_store.get_file_content(file_id),
                FetchError::is_retryable,
            )
            .await
    }

    async fn prepare(
        &self,
        file: FileRef,
        metadata: FileMetadata,
    ) -> Result<PreparedFile, (FileRef, Stage, PipelineError)> {
        if metadata.owner != file.owner || metadata.account_type != file.account_type {
            tracing::warn!(
                file = %file,
                metadata_owner = %metadata.owner,
                metadata_account_type = %metadata.account_type,
                "File metadata disagrees with upload reference; using the reference"
            );
        }

        // Route before downloading anything.
        let schema = match self.registry.resolve(&metadata.instrument) {
            Ok(schema) => schema,
            Err(err) => return Err((file, Stage::Transformed, err)),
        };
        let account = match AccountKey::try_new(file.owner, file.account_type, schema.instrument)
        {
            Ok(account) => account,
            Err(err) => {
                let err = PipelineError::UnknownInstrumentType(err.value().to_string());
                return Err((file, Stage::Transformed, err));
            }
        };

        let content = match self.fetch_content(&file.file_id).await {
            Ok(content) => content,
            Err(err) => return Err((file, Stage::Fetched, PipelineError::from(err))),
        };

        let records = match decode_csv(schema.instrument, &content)
            .and_then(|rows| normalize_file(account, &rows, schema.transform))
        {
            Ok(records) => records,
            Err(err) => return Err((file, Stage::Transformed, err)),
        };

        let covered_range = metadata
            .covered_range
            .or_else(|| DateRange::covering(records.iter().map(|record| record.activity_date())));
        tracing::debug!(
            file = %file,
            account = %account,
            records = records.len(),
            "Transformed file"
        );

        Ok(PreparedFile {
            file,
            account,
            records,
            covered_range,
        })
    }

    async fn persist_account(&self, key: AccountKey, files: Vec<PreparedFile>) -> AccountOutcome {
        let mut outcome = AccountOutcome::default();
        // Later files win. Provenance stays with the first file.
        let incoming = files.iter().fold(Vec::new(), |consolidated, prepared| {
            let records: Vec<StoredTransaction> = prepared
                .records
                .iter()
                .cloned()
                .map(|record| StoredTransaction::new(record, prepared.file.file_id.clone()))
                .collect();
            merge(consolidated, records)
        });

        let changes = match self.commit(key, |ledger| ledger.reconcile(incoming.clone())).await {
            Ok(changes) => changes,
            Err(err) => {
                for prepared in &files {
                    tracing::warn!(
                        file = %prepared.file,
                        account = %key,
                        stage = ?err.stage,
                        error = %err.error,
                        "File failed"
                    );
                    outcome
                        .errors
                        .push(FileFailure::new(&prepared.file, err.stage, &err.error));
                }
                return outcome;
            }
        };
        outcome.inserted = changes.to_insert.len();
        outcome.updated = changes.to_update.len();
        outcome.skipped = changes.unchanged;

        let now = self.clock.now();
        for prepared in files {
            let record = ProcessedFileRecord::new(&prepared.file, prepared.covered_range, now);
            match self.storage.mark_processed(&record).await {
                Ok(()) => outcome.processed.push(prepared.file),
                Err(err) => {
                    let err = PipelineError::from(err);
                    tracing::warn!(file = %prepared.file, error = %err, "Failed to mark file processed");
                    outcome
                        .errors
                        .push(FileFailure::new(&prepared.file, Stage::Persisted, &err));
                }
            }
        }
        outcome
    }

    /// Load, change and write one partition under its lock, restarting from
    /// load when another writer got there first.
    pub(crate) async fn commit<F>(
        &self,
        key: AccountKey,
        build: F,
    ) -> Result<ReconciliationResult, CommitError>
    where
        F: Fn(&AccountLedger) -> ReconciliationResult,
    {
        let _guard = self.locks.lock(key).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let ledger = AccountLedger::load(self.storage.as_ref(), key)
                .await
                .map_err(|err| CommitError {
                    stage: Stage::Reconciled,
                    error: err.into(),
                })?;
            if let Err(problem) = ledger.validate() {
                tracing::warn!(account = %key, problem = %problem, "Stored partition fails validation");
            }

            let changes = build(&ledger);
            match ledger.sync(self.storage.as_ref(), &changes).await {
                Ok(version) => {
                    tracing::info!(
                        account = %key,
                        version,
                        inserted = changes.to_insert.len(),
                        updated = changes.to_update.len(),
                        deleted = changes.to_delete.len(),
                        unchanged = changes.unchanged,
                        "Committed partition"
                    );
                    return Ok(changes);
                }
                Err(err) if is_write_conflict(&err) && attempt < self.write_max_attempts => {
                    tracing::warn!(account = %key, attempt, error = %err, "Write conflict; reconciling again");
                }
                Err(err) if is_write_conflict(&err) => {
                    return Err(CommitError {
                        stage: Stage::Persisted,
                        error: PipelineError::StoreWriteConflict {
                            account: key.to_string(),
                            attempts: attempt,
                        },
                    });
                }
                Err(err) => {
                    return Err(CommitError {
                        stage: Stage::Persisted,
                        error: err.into(),
                    });
                }
            }
        }
    }
}
