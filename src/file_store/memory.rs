//! In-memory file store for tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{DateRange, FileMetadata, FileRef, Id};

use super::{FetchError, FileStore};

struct StoredFile {
    file: FileRef,
    metadata: FileMetadata,
    content: Vec<u8>,
}

/// File store backed by a map, with scripted failures.
///
/// Failures queued for a file are returned, in order, by the next calls
/// before the real content is served.
#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<BTreeMap<Id, StoredFile>>,
    metadata_failures: Mutex<HashMap<Id, VecDeque<FetchError>>>,
    content_failures: Mutex<HashMap<Id, VecDeque<FetchError>>>,
    content_calls: Mutex<HashMap<Id, usize>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(
        mut self,
        file: FileRef,
        instrument: &str,
        covered_range: Option<DateRange>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        let metadata = FileMetadata {
            owner: file.owner,
            account_type: file.account_type,
            instrument: instrument.to_string(),
            covered_range,
        };
        self.files.get_mut().insert(
            file.file_id.clone(),
            StoredFile {
                file,
                metadata,
                content: content.into(),
            },
        );
        self
    }

    pub fn with_metadata_failures(mut self, file_id: impl Into<Id>, failures: Vec<FetchError>) -> Self {
        self.metadata_failures
            .get_mut()
            .insert(file_id.into(), failures.into());
        self
    }

    pub fn with_content_failures(mut self, file_id: impl Into<Id>, failures: Vec<FetchError>) -> Self {
        self.content_failures
            .get_mut()
            .insert(file_id.into(), failures.into());
        self
    }

    /// Delay every content fetch, so concurrent fetches overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace the bytes of an existing upload.
    pub async fn replace_content(&self, file_id: &Id, content: impl Into<Vec<u8>>) {
        if let Some(stored) = self.files.lock().await.get_mut(file_id) {
            stored.content = content.into();
        }
    }

    pub async fn remove_file(&self, file_id: &Id) {
        self.files.lock().await.remove(file_id);
    }

    pub async fn content_calls(&self, file_id: &Id) -> usize {
        self.content_calls
            .lock()
            .await
            .get(file_id)
            .copied()
            .unwrap_or(0)
    }

    /// Most content fetches that were ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn next_failure(
        queue: &Mutex<HashMap<Id, VecDeque<FetchError>>>,
        file_id: &Id,
    ) -> Option<FetchError> {
        queue
            .lock()
            .await
            .get_mut(file_id)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn list_files(&self) -> Result<Vec<FileRef>> {
        let files = self.files.lock().await;
        Ok(files.values().map(|stored| stored.file.clone()).collect())
    }

    async fn get_file_metadata(&self, file_id: &Id) -> Result<FileMetadata, FetchError> {
        if let Some(err) = Self::next_failure(&self.metadata_failures, file_id).await {
            return Err(err);
        }
        let files = self.files.lock().await;
        files
            .get(file_id)
            .map(|stored| stored.metadata.clone())
            .ok_or_else(|| FetchError::FileNotFound(file_id.clone()))
    }

    async fn get_file_content(&self, file_id: &Id) -> Result<Vec<u8>, FetchError> {
        *self
            .content_calls
            .lock()
            .await
            .entry(file_id.clone())
            .or_insert(0) += 1;

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = Self::next_failure(&self.content_failures, file_id).await {
            return Err(err);
        }
        let files = self.files.lock().await;
        files
            .get(file_id)
            .map(|stored| stored.content.clone())
            .ok_or_else(|| FetchError::FileNotFound(file_id.clone()))
    }
}
