mod support;

use std::sync::Arc;

use anyhow::Result;
use numifocus::config::IngestConfig;
use numifocus::error::ErrorKind;
use numifocus::file_store::MemoryFileStore;
use numifocus::ingest::{AccountLocks, Stage};
use numifocus::intake::IngestFilters;
use numifocus::models::{AccountKey, AccountType, FileRef, InstrumentType, Owner};
use numifocus::storage::{MemoryStorage, Storage};
use support::{orchestrator, usaa_csv, ConflictingStorage};

fn key() -> AccountKey {
    AccountKey::new(Owner::Shared, InstrumentType::UsaaChecking)
}

fn upload(id: &str, day: &str) -> (FileRef, String) {
    let file = FileRef::new(Owner::Shared, AccountType::Checking, id);
    (file, usaa_csv(&[(day, "UTILITIES", "Utilities", "-88.00")]))
}

#[tokio::test]
async fn lost_write_race_reconciles_again_from_load() -> Result<()> {
    let (file, csv) = upload("usaa-1", "2024-05-01");
    let store = Arc::new(MemoryFileStore::new().with_file(file.clone(), "usaa_checking", None, csv));
    let storage = Arc::new(ConflictingStorage::new(2));
    let orchestrator = orchestrator(store, storage.clone());

    let result = orchestrator.process_batch(&[file], &IngestFilters::new()).await?;
    assert!(result.is_success(), "{:?}", result.errors);
    assert_eq!(result.inserted_count, 1);
    assert_eq!(storage.intrusions(), 2);

    // The other writer's records survive alongside ours.
    let stored = storage.load_partition(&key()).await?.transactions;
    assert_eq!(stored.len(), 3);
    Ok(())
}

#[tokio::test]
async fn persistent_conflicts_fail_the_account_files() -> Result<()> {
    let (first, first_csv) = upload("usaa-1", "2024-05-01");
    let (second, second_csv) = upload("usaa-2", "2024-05-02");
    let store = Arc::new(
        MemoryFileStore::new()
            .with_file(first.clone(), "usaa_checking", None, first_csv)
            .with_file(second.clone(), "usaa_checking", None, second_csv),
    );
    let storage = Arc::new(ConflictingStorage::new(usize::MAX));
    let config = IngestConfig {
        write_max_attempts: 2,
        ..Default::default()
    };
    let orchestrator = orchestrator(store, storage.clone())
        .with_config(&config)
        .with_retry(support::fast_retry());

    let result = orchestrator
        .process_batch(&[first, second], &IngestFilters::new())
        .await?;
    assert!(result.processed_files.is_empty());
    assert_eq!(result.errors.len(), 2);
    for failure in &result.errors {
        assert_eq!(failure.stage, Stage::Persisted);
        assert_eq!(failure.kind, ErrorKind::StoreWriteConflict);
    }
    assert_eq!(storage.intrusions(), 2);
    assert!(storage.list_processed_files().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_batches_on_one_account_serialize() -> Result<()> {
    let (first, first_csv) = upload("usaa-1", "2024-05-01");
    let (second, second_csv) = upload("usaa-2", "2024-05-02");
    let store = Arc::new(
        MemoryFileStore::new()
            .with_file(first.clone(), "usaa_checking", None, first_csv)
            .with_file(second.clone(), "usaa_checking", None, second_csv),
    );
    let storage = Arc::new(MemoryStorage::new());
    let locks = Arc::new(AccountLocks::new());
    let a = orchestrator(store.clone(), storage.clone()).with_locks(locks.clone());
    let b = orchestrator(store, storage.clone()).with_locks(locks);

    let filters = IngestFilters::new();
    let first_batch = [first];
    let second_batch = [second];
    let (ra, rb) = tokio::join!(
        a.process_batch(&first_batch, &filters),
        b.process_batch(&second_batch, &filters)
    );
    assert!(ra?.is_success());
    assert!(rb?.is_success());

    let snapshot = storage.load_partition(&key()).await?;
    assert_eq!(snapshot.transactions.len(), 2);
    assert_eq!(snapshot.version, 2);
    Ok(())
}
