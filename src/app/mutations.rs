use anyhow::{Context, Result};

use crate::ingest::IngestService;
use crate::models::{AccountKey, AccountType, FileRef, Id, InstrumentType, Owner};

pub async fn delete_file(
    service: &IngestService,
    owner: Owner,
    account_type: AccountType,
    file_id: &str,
) -> Result<serde_json::Value> {
    let file_id =
        Id::from_string_checked(file_id).with_context(|| format!("Invalid file id: {file_id}"))?;
    let file = FileRef::new(owner, account_type, file_id);
    let deletion = service.delete_from_file_id(&file).await?;

    Ok(serde_json::json!({
        "success": true,
        "file": file.to_string(),
        "deleted_transactions": deletion.deleted,
        "accounts": deletion.accounts.iter().map(AccountKey::label).collect::<Vec<_>>(),
        "processed_record_cleared": deletion.processed_record_cleared,
    }))
}

pub async fn delete_transaction(
    service: &IngestService,
    owner: Owner,
    instrument: InstrumentType,
    id_str: &str,
) -> Result<serde_json::Value> {
    let key = AccountKey::new(owner, instrument);
    let id = Id::from_string(id_str);

    if !service.delete_from_transaction_id(key, &id).await? {
        return Ok(serde_json::json!({
            "success": false,
            "error": "Transaction not found",
            "account": key.label(),
            "id": id_str
        }));
    }

    Ok(serde_json::json!({
        "success": true,
        "account": key.label(),
        "deleted_id": id_str
    }))
}
