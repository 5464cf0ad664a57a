use serde::Serialize;

use crate::ingest::BatchResult;
use crate::intake::IngestFilters;
use crate::models::CanonicalTransaction;

/// JSON output for an ingest run
#[derive(Serialize)]
pub struct IngestOutput {
    pub success: bool,
    pub filters: IngestFilters,
    #[serde(flatten)]
    pub result: BatchResult,
}

/// JSON output for processed files
#[derive(Serialize)]
pub struct ProcessedFileOutput {
    pub owner: String,
    pub account_type: String,
    pub file_id: String,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub ingested_at: String,
}

/// JSON output for stored transactions
#[derive(Serialize)]
pub struct TransactionOutput {
    pub source_file_id: String,
    #[serde(flatten)]
    pub transaction: CanonicalTransaction,
}
