//! Directory-backed file store.
//!
//! ```text
//! inbox/
//!   manifest.toml
//!   usaa_2024_01.csv
//!   ...
//! ```
//!
//! `manifest.toml` lists every upload:
//!
//! ```toml
//! [[files]]
//! id = "usaa-2024-01"
//! owner = "foster"
//! account_type = "checking"
//! instrument = "USAA_checking"
//! path = "usaa_2024_01.csv"
//! date_start = "2024-01-01"
//! date_end = "2024-01-31"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::fs;

use crate::models::{AccountType, DateRange, FileMetadata, FileRef, Id, Owner};

use super::{FetchError, FileStore};

pub const MANIFEST_FILE: &str = "manifest.toml";

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    id: Id,
    owner: Owner,
    account_type: AccountType,
    instrument: String,
    path: PathBuf,
    #[serde(default)]
    date_start: Option<NaiveDate>,
    #[serde(default)]
    date_end: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
struct Upload {
    file: FileRef,
    metadata: FileMetadata,
    path: PathBuf,
}

#[derive(Debug)]
pub struct LocalFileStore {
    root: PathBuf,
    uploads: BTreeMap<Id, Upload>,
}

impl LocalFileStore {
    /// Read the manifest under `root`. A missing manifest is an empty inbox.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE);

        let manifest: Manifest = match fs::read_to_string(&manifest_path).await {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse manifest {}", manifest_path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest::default(),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read manifest {}", manifest_path.display())
                })
            }
        };

        let mut uploads = BTreeMap::new();
        for entry in manifest.files {
            let covered_range = match (entry.date_start, entry.date_end) {
                (Some(start), Some(end)) if start > end => anyhow::bail!(
                    "Manifest entry {} has date_start {start} after date_end {end}",
                    entry.id
                ),
                (Some(start), Some(end)) => Some(DateRange::new(start, end)),
                (None, None) => None,
                _ => anyhow::bail!(
                    "Manifest entry {} must give date_start and date_end together",
                    entry.id
                ),
            };
            if !Id::is_path_safe(entry.id.as_str()) {
                anyhow::bail!("Manifest entry id {:?} is not a safe file id", entry.id.as_str());
            }
            let upload = Upload {
                file: FileRef::new(entry.owner, entry.account_type, entry.id.clone()),
                metadata: FileMetadata {
                    owner: entry.owner,
                    account_type: entry.account_type,
                    instrument: entry.instrument,
                    covered_range,
                },
                path: root.join(&entry.path),
            };
            if uploads.insert(entry.id.clone(), upload).is_some() {
                anyhow::bail!("Manifest lists file id {} twice", entry.id);
            }
        }

        Ok(Self { root, uploads })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn list_files(&self) -> Result<Vec<FileRef>> {
        Ok(self.uploads.values().map(|u| u.file.clone()).collect())
    }

    async fn get_file_metadata(&self, file_id: &Id) -> Result<FileMetadata, FetchError> {
        self.uploads
            .get(file_id)
            .map(|u| u.metadata.clone())
            .ok_or_else(|| FetchError::FileNotFound(file_id.clone()))
    }

    async fn get_file_content(&self, file_id: &Id) -> Result<Vec<u8>, FetchError> {
        let upload = self
            .uploads
            .get(file_id)
            .ok_or_else(|| FetchError::FileNotFound(file_id.clone()))?;

        fs::read(&upload.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::FileNotFound(file_id.clone()),
            std::io::ErrorKind::PermissionDenied => {
                FetchError::AuthExpired(format!("{}: {e}", upload.path.display()))
            }
            _ => FetchError::Transient(format!("{}: {e}", upload.path.display())),
        })
    }
}
