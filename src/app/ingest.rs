use anyhow::Result;

use crate::ingest::IngestService;
use crate::intake::IngestFilters;

use super::IngestOutput;

pub async fn run_ingest(service: &IngestService, filters: IngestFilters) -> Result<IngestOutput> {
    let result = service.run(&filters).await?;
    Ok(IngestOutput {
        success: result.is_success(),
        filters,
        result,
    })
}
