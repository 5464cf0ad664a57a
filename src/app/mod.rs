mod config;
mod ingest;
mod list;
mod mutations;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ResolvedConfig;
use crate::file_store::LocalFileStore;
use crate::ingest::{IngestContext, IngestService};
use crate::storage::JsonFileStorage;

pub use config::config_output;
pub use ingest::run_ingest;
pub use list::{list_processed_files, list_transactions};
pub use mutations::{delete_file, delete_transaction};
pub use types::{IngestOutput, ProcessedFileOutput, TransactionOutput};

/// Service over the configured inbox and data directory.
pub async fn open_service(config: &ResolvedConfig) -> Result<IngestService> {
    let file_store = LocalFileStore::open(&config.inbox_dir)
        .await
        .with_context(|| format!("Failed to open inbox {}", config.inbox_dir.display()))?;
    let storage = JsonFileStorage::new(&config.data_dir);

    let context = IngestContext::new(Arc::new(file_store), Arc::new(storage))
        .with_config(config.ingest.clone());
    Ok(IngestService::new(context))
}
