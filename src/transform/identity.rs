//! Content-derived transaction identity.
//!
//! The fingerprint is built from parsed values, never from cell text, so an
//! export that spells the same transaction differently (`01/05/2024` vs
//! `2024-01-05`, `-4.50` vs `-4.5`, a blank credit vs `0.00`) keeps its id.
//! Classification and posting status are left out because institutions
//! revise them after the fact.

use rust_decimal::Decimal;

use crate::models::{
    BankingTransaction, CanonicalTransaction, CryptoTransaction, InvestingTransaction, TransCode,
};

/// Identity key for a normalized record. `stable_description` overrides the
/// record's description when the export carries one the bank never rewrites.
pub fn fingerprint(record: &CanonicalTransaction, stable_description: Option<&str>) -> String {
    match record {
        CanonicalTransaction::Checking(tx)
        | CanonicalTransaction::Credit(tx)
        | CanonicalTransaction::Savings(tx) => banking(tx, stable_description),
        CanonicalTransaction::Crypto(tx) => crypto(tx, stable_description),
        CanonicalTransaction::Investing(tx) | CanonicalTransaction::Ira(tx) => {
            investing(tx, stable_description)
        }
    }
}

fn banking(tx: &BankingTransaction, stable_description: Option<&str>) -> String {
    [
        tx.activity_date.to_string(),
        signed(tx.credit, tx.debit),
        text(stable_description.unwrap_or(&tx.description)),
    ]
    .join("|")
}

fn crypto(tx: &CryptoTransaction, stable_description: Option<&str>) -> String {
    [
        tx.activity_date.to_string(),
        text(stable_description.or(tx.description.as_deref()).unwrap_or_default()),
        text(&tx.ticker),
        signed(tx.credit_quantity, tx.debit_quantity),
    ]
    .join("|")
}

fn investing(tx: &InvestingTransaction, stable_description: Option<&str>) -> String {
    [
        tx.activity_date.to_string(),
        trans_code(tx.trans_code).to_string(),
        text(tx.ticker.as_deref().unwrap_or_default()),
        text(stable_description.unwrap_or(&tx.description)),
        tx.quantity.map(|q| q.normalize().to_string()).unwrap_or_default(),
        signed(tx.credit, tx.debit),
    ]
    .join("|")
}

/// Credit minus debit, without trailing zeros. Absent sides count as zero.
fn signed(credit: Option<Decimal>, debit: Option<Decimal>) -> String {
    let value = credit.unwrap_or_default() - debit.unwrap_or_default();
    value.normalize().to_string()
}

fn text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn trans_code(code: TransCode) -> &'static str {
    match code {
        TransCode::Ach => "ACH",
        TransCode::Cdiv => "CDIV",
        TransCode::Buy => "BUY",
        TransCode::Sell => "SELL",
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;

    use super::*;
    use crate::models::{Classification, Id};

    fn checking(credit: Option<&str>, debit: Option<&str>, description: &str) -> CanonicalTransaction {
        CanonicalTransaction::Checking(BankingTransaction {
            transaction_id: Id::from_string("row"),
            activity_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            account: "foster_usaa_checking".to_string(),
            credit: credit.map(|v| Decimal::from_str(v).unwrap()),
            debit: debit.map(|v| Decimal::from_str(v).unwrap()),
            classification: Classification::FoodAndDrinks,
            subclassification: None,
            old_classification: None,
            description: description.to_string(),
            old_description: None,
            posted: true,
        })
    }

    #[test]
    fn banking_fingerprint_uses_parsed_values() {
        let record = checking(None, Some("4.50"), "sq  *coffee shop");
        assert_eq!(fingerprint(&record, None), "2024-01-05|-4.5|SQ *COFFEE SHOP");
    }

    #[test]
    fn trailing_zeros_and_spacing_do_not_matter() {
        let a = checking(None, Some("12.00"), "GAS  STATION ");
        let b = checking(None, Some("12"), "gas station");
        assert_eq!(fingerprint(&a, None), fingerprint(&b, None));
    }

    #[test]
    fn stable_description_overrides_display_text() {
        let cleaned = checking(None, Some("4.50"), "Coffee Shop");
        let renamed = checking(None, Some("4.50"), "Local Coffee");
        assert_eq!(
            fingerprint(&cleaned, Some("SQ *COFFEE 123")),
            fingerprint(&renamed, Some("SQ *COFFEE 123"))
        );
        assert_ne!(fingerprint(&cleaned, None), fingerprint(&renamed, None));
    }

    #[test]
    fn direction_is_part_of_identity() {
        let spent = checking(None, Some("20.00"), "TRANSFER");
        let received = checking(Some("20.00"), None, "TRANSFER");
        assert_ne!(fingerprint(&spent, None), fingerprint(&received, None));
    }
}
