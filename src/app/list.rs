use anyhow::Result;
use chrono::NaiveDate;

use crate::ingest::IngestService;
use crate::models::{AccountKey, InstrumentType, Owner};

use super::{ProcessedFileOutput, TransactionOutput};

pub async fn list_processed_files(service: &IngestService) -> Result<Vec<ProcessedFileOutput>> {
    let records = service.processed_files().await?;
    let mut output = Vec::with_capacity(records.len());

    for r in records {
        output.push(ProcessedFileOutput {
            owner: r.owner.to_string(),
            account_type: r.account_type.to_string(),
            file_id: r.file_id.to_string(),
            date_start: r.covered_range.map(|range| range.start.to_string()),
            date_end: r.covered_range.map(|range| range.end.to_string()),
            ingested_at: r.ingested_at.to_rfc3339(),
        });
    }

    Ok(output)
}

pub async fn list_transactions(
    service: &IngestService,
    owner: Owner,
    instrument: InstrumentType,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<TransactionOutput>> {
    let key = AccountKey::new(owner, instrument);
    let records = service.transactions(key, from, to).await?;

    Ok(records
        .into_iter()
        .map(|r| TransactionOutput {
            source_file_id: r.source_file_id.to_string(),
            transaction: r.transaction,
        })
        .collect())
}
