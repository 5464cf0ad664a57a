use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::models::{
    AccountKey, FileRef, InstrumentType, Owner, PartitionSnapshot, ProcessedFileRecord,
    ReconciliationResult,
};
use crate::reconcile;

use super::{Storage, WriteConflict};

/// One line of the processed-file ledger. Replayed in order, last entry per
/// file wins.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ProcessedLogEntry {
    Processed(ProcessedFileRecord),
    Cleared(FileRef),
}

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   partitions/
///     {owner}/
///       {instrument}/
///         partition.json
///   processed_files.jsonl
/// ```
pub struct JsonFileStorage {
    base_path: PathBuf,
    // Serializes version check + write within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn partitions_dir(&self) -> PathBuf {
        self.base_path.join("partitions")
    }

    fn partition_file(&self, key: &AccountKey) -> PathBuf {
        self.partitions_dir()
            .join(key.owner().as_str())
            .join(key.instrument().as_str())
            .join("partition.json")
    }

    fn processed_file(&self) -> PathBuf {
        self.base_path.join("processed_files.jsonl")
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    /// Write via a sibling temp file and rename, so readers never see a
    /// half-written partition.
    async fn write_json_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to move {:?} into place", tmp))?;
        Ok(())
    }

    async fn read_jsonl<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {}", line))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        self.ensure_dir(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        for item in items {
            let line = serde_json::to_string(item).context("Failed to serialize item")?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        file.flush().await?;

        Ok(())
    }

    async fn list_dir_names(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let mut entries = match fs::read_dir(path).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e).context("Failed to read directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            if let Ok(file_type) = entry.file_type().await {
                if file_type.is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn processed_map(&self) -> Result<BTreeMap<FileRef, ProcessedFileRecord>> {
        let entries: Vec<ProcessedLogEntry> = self.read_jsonl(&self.processed_file()).await?;
        let mut map = BTreeMap::new();
        for entry in entries {
            match entry {
                ProcessedLogEntry::Processed(record) => {
                    map.insert(record.file_ref(), record);
                }
                ProcessedLogEntry::Cleared(file) => {
                    map.remove(&file);
                }
            }
        }
        Ok(map)
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn load_partition(&self, key: &AccountKey) -> Result<PartitionSnapshot> {
        let snapshot = self
            .read_json(&self.partition_file(key))
            .await
            .with_context(|| format!("Failed to load partition {key}"))?;
        Ok(snapshot.unwrap_or_default())
    }

    async fn write_partition(
        &self,
        key: &AccountKey,
        changes: &ReconciliationResult,
        expected_version: u64,
    ) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        let path = self.partition_file(key);
        let current: PartitionSnapshot = self.read_json(&path).await?.unwrap_or_default();
        if current.version != expected_version {
            return Err(WriteConflict {
                account: *key,
                expected: expected_version,
                actual: current.version,
            }
            .into());
        }

        let next = PartitionSnapshot {
            version: current.version + 1,
            transactions: reconcile::apply(current.transactions, changes),
        };
        self.write_json_atomic(&path, &next)
            .await
            .with_context(|| format!("Failed to write partition {key}"))?;
        Ok(next.version)
    }

    async fn list_partitions(&self) -> Result<Vec<AccountKey>> {
        let mut keys = Vec::new();
        for owner_name in self.list_dir_names(&self.partitions_dir()).await? {
            let Ok(owner) = owner_name.parse::<Owner>() else {
                tracing::warn!(dir = %owner_name, "Ignoring unknown owner directory");
                continue;
            };
            let owner_dir = self.partitions_dir().join(&owner_name);
            for instrument_name in self.list_dir_names(&owner_dir).await? {
                match instrument_name.parse::<InstrumentType>() {
                    Ok(instrument) => keys.push(AccountKey::new(owner, instrument)),
                    Err(_) => {
                        tracing::warn!(
                            owner = %owner,
                            dir = %instrument_name,
                            "Ignoring unknown instrument directory"
                        );
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn list_processed_files(&self) -> Result<Vec<ProcessedFileRecord>> {
        Ok(self.processed_map().await?.into_values().collect())
    }

    async fn mark_processed(&self, record: &ProcessedFileRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.append_jsonl(
            &self.processed_file(),
            &[ProcessedLogEntry::Processed(record.clone())],
        )
        .await
    }

    async fn remove_processed(&self, file: &FileRef) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if !self.processed_map().await?.contains_key(file) {
            return Ok(false);
        }
        self.append_jsonl(&self.processed_file(), &[ProcessedLogEntry::Cleared(file.clone())])
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{
        AccountType, BankingTransaction, CanonicalTransaction, Classification, DateRange, Id,
        StoredTransaction,
    };
    use crate::storage::is_write_conflict;

    fn stored(id: &str) -> StoredTransaction {
        StoredTransaction::new(
            CanonicalTransaction::Savings(BankingTransaction {
                transaction_id: Id::from_string(id),
                activity_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                account: "foster_usaa_savings".to_string(),
                credit: Some(Decimal::new(112, 2)),
                debit: None,
                classification: Classification::Other,
                subclassification: Some("Interest".to_string()),
                old_classification: None,
                description: "Interest Paid".to_string(),
                old_description: None,
                posted: true,
            }),
            Id::from_string("f-1"),
        )
    }

    #[tokio::test]
    async fn partitions_persist_with_versions() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());
        let key = AccountKey::new(Owner::Foster, InstrumentType::UsaaSavings);

        let changes = ReconciliationResult {
            to_insert: vec![stored("t1"), stored("t2")],
            ..Default::default()
        };
        assert_eq!(storage.write_partition(&key, &changes, 0).await?, 1);

        // A fresh handle sees the same data.
        let reopened = JsonFileStorage::new(dir.path());
        let snapshot = reopened.load_partition(&key).await?;
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.transactions, vec![stored("t1"), stored("t2")]);
        assert!(dir
            .path()
            .join("partitions/foster/USAA_savings/partition.json")
            .exists());

        let err = reopened
            .write_partition(&key, &ReconciliationResult::default(), 0)
            .await
            .unwrap_err();
        assert!(is_write_conflict(&err));

        assert_eq!(reopened.list_partitions().await?, vec![key]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_partition_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());
        let snapshot = storage
            .load_partition(&AccountKey::new(Owner::Shared, InstrumentType::RobinhoodIra))
            .await?;
        assert_eq!(snapshot, PartitionSnapshot::default());
        assert!(storage.list_partitions().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn processed_ledger_replays_last_entry() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());
        let file = FileRef::new(Owner::Foster, AccountType::Savings, "f-1");
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let first = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        storage
            .mark_processed(&ProcessedFileRecord::new(&file, Some(range), first))
            .await?;
        storage
            .mark_processed(&ProcessedFileRecord::new(&file, Some(range), second))
            .await?;

        let records = storage.list_processed_files().await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ingested_at, second);

        assert!(storage.remove_processed(&file).await?);
        assert!(storage.list_processed_files().await?.is_empty());
        assert!(!storage.remove_processed(&file).await?);
        Ok(())
    }
}
