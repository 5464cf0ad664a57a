//! Pure functions mapping raw institution rows onto canonical transactions.

pub mod banking;
pub mod brokerage;
mod identity;
mod parse;

use std::collections::HashMap;

pub use identity::fingerprint;
pub use parse::{parse_amount, parse_date, parse_posted, parse_quantity_with_ticker};

use crate::error::PipelineError;
use crate::models::{AccountKey, CanonicalTransaction, Id, RawTransaction};
use crate::reconcile::CanonicalRecord;

/// Signature every registered transform has.
pub type TransformFn =
    fn(&RecordContext, &RawTransaction) -> Result<CanonicalTransaction, PipelineError>;

/// What a transform knows about a row besides its cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext {
    pub account: AccountKey,
    /// 1-based data row within the export.
    pub row: usize,
    /// Row-scoped id. `normalize_file` replaces it with one derived from the
    /// parsed record.
    pub transaction_id: Id,
}

impl RecordContext {
    pub fn new(account: AccountKey, row: usize) -> Self {
        let transaction_id = Id::derive(&format!("{}|row|{}", account.label(), row));
        Self {
            account,
            row,
            transaction_id,
        }
    }

    pub fn invalid(&self, reason: impl Into<String>) -> PipelineError {
        PipelineError::invalid_record(self.row, reason)
    }
}

/// Run one transform and check the canonical invariants on its output.
pub fn normalize(
    ctx: &RecordContext,
    raw: &RawTransaction,
    transform: TransformFn,
) -> Result<CanonicalTransaction, PipelineError> {
    if raw.instrument() != ctx.account.instrument() {
        return Err(ctx.invalid(format!(
            "{} row routed to {} account",
            raw.instrument(),
            ctx.account
        )));
    }
    let record = transform(ctx, raw)?;
    if record.account_type() != ctx.account.account_type() {
        return Err(ctx.invalid(format!(
            "transform produced a {} record for a {} account",
            record.account_type(),
            ctx.account.account_type()
        )));
    }
    record.validate().map_err(|reason| ctx.invalid(reason))?;
    Ok(record)
}

/// Normalize every row of one export, in file order.
///
/// Ids come from the parsed record's fingerprint. Rows with identical
/// fingerprints are numbered so that genuinely repeated transactions (two
/// identical coffees on one day) keep distinct ids while re-exports of the
/// same file reproduce the same ids.
pub fn normalize_file(
    account: AccountKey,
    rows: &[RawTransaction],
    transform: TransformFn,
) -> Result<Vec<CanonicalTransaction>, PipelineError> {
    let mut occurrences: HashMap<String, u32> = HashMap::new();
    let mut records = Vec::with_capacity(rows.len());

    for (idx, raw) in rows.iter().enumerate() {
        let ctx = RecordContext::new(account, idx + 1);
        let record = normalize(&ctx, raw, transform)?;

        let identity = fingerprint(&record, raw.record().stable_description());
        let occurrence = occurrences.entry(identity.clone()).or_insert(0);
        *occurrence += 1;

        let id = Id::derive(&format!("{}|{}|{}", account.label(), identity, occurrence));
        records.push(record.with_transaction_id(id));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::raw::{DiscoverRow, UsaaRow};
    use crate::models::{InstrumentType, Owner};

    fn usaa_row(date: &str, description: &str, amount: &str, status: &str) -> RawTransaction {
        RawTransaction::UsaaChecking(UsaaRow {
            date: Some(date.to_string()),
            description: Some(description.to_string()),
            original_description: None,
            category: Some("Restaurants".to_string()),
            amount: Some(amount.to_string()),
            status: Some(status.to_string()),
        })
    }

    fn key() -> AccountKey {
        AccountKey::new(Owner::Foster, InstrumentType::UsaaChecking)
    }

    #[test]
    fn repeated_rows_get_distinct_stable_ids() {
        let rows = vec![
            usaa_row("2024-01-05", "Coffee", "-4.50", "Posted"),
            usaa_row("2024-01-05", "Coffee", "-4.50", "Posted"),
        ];

        let first = normalize_file(key(), &rows, banking::usaa).unwrap();
        let second = normalize_file(key(), &rows, banking::usaa).unwrap();

        assert_ne!(first[0].transaction_id(), first[1].transaction_id());
        assert_eq!(first, second);
    }

    #[test]
    fn status_change_keeps_the_id() {
        let pending = normalize_file(
            key(),
            &[usaa_row("2024-01-05", "Coffee", "-4.50", "Pending")],
            banking::usaa,
        )
        .unwrap();
        let posted = normalize_file(
            key(),
            &[usaa_row("2024-01-05", "Coffee", "-4.50", "Posted")],
            banking::usaa,
        )
        .unwrap();
        assert_eq!(pending[0].transaction_id(), posted[0].transaction_id());
    }

    #[test]
    fn ids_are_scoped_to_the_owner() {
        let rows = [usaa_row("2024-01-05", "Coffee", "-4.50", "Posted")];
        let foster = normalize_file(key(), &rows, banking::usaa).unwrap();
        let shared = normalize_file(
            AccountKey::new(Owner::Shared, InstrumentType::UsaaChecking),
            &rows,
            banking::usaa,
        )
        .unwrap();
        assert_ne!(foster[0].transaction_id(), shared[0].transaction_id());
    }

    #[test]
    fn reformatted_export_keeps_the_id() {
        let iso = normalize_file(
            key(),
            &[usaa_row("2024-01-05", "Coffee", "-4.50", "Posted")],
            banking::usaa,
        )
        .unwrap();
        let us = normalize_file(
            key(),
            &[usaa_row("01/05/2024", " COFFEE ", "-4.5", "Posted")],
            banking::usaa,
        )
        .unwrap();
        assert_eq!(iso[0].transaction_id(), us[0].transaction_id());
    }

    #[test]
    fn blank_and_zero_credit_cells_share_an_id() {
        let row = |credit: &str| {
            RawTransaction::DiscoverCredit(DiscoverRow {
                transaction_date: Some("01/20/2024".to_string()),
                transaction_description: Some("GROCER".to_string()),
                transaction_type: Some("Supermarkets".to_string()),
                debit: Some("12.00".to_string()),
                credit: Some(credit.to_string()),
            })
        };
        let account = AccountKey::new(Owner::Natalia, InstrumentType::DiscoverCredit);
        let blank = normalize_file(account, &[row("")], banking::discover).unwrap();
        let zero = normalize_file(account, &[row("0.00")], banking::discover).unwrap();
        assert_eq!(blank[0].transaction_id(), zero[0].transaction_id());
    }

    #[test]
    fn bad_row_reports_its_position() {
        let rows = vec![
            usaa_row("2024-01-05", "Coffee", "-4.50", "Posted"),
            usaa_row("2024-01-06", "Lunch", "", "Posted"),
        ];
        let err = normalize_file(key(), &rows, banking::usaa).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRawRecord { row: 2, .. }));
    }

    #[test]
    fn rows_from_another_instrument_are_rejected() {
        let ctx = RecordContext::new(AccountKey::new(Owner::Foster, InstrumentType::UsaaSavings), 1);
        let raw = usaa_row("2024-01-05", "Coffee", "-4.50", "Posted");
        let err = normalize(&ctx, &raw, banking::usaa).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRawRecord { row: 1, .. }));
    }
}
