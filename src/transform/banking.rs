//! Checking, credit and savings transforms.

use crate::error::PipelineError;
use crate::models::raw::{ChaseCreditRow, DiscoverRow, UccuRow, UsaaRow};
use crate::models::{BankingTransaction, CanonicalTransaction, Classification, RawTransaction};

use super::parse::{
    optional_amount, optional_text, parse_posted, required, required_amount, required_date,
    single_sided, split_signed,
};
use super::RecordContext;

/// Map an institution category onto the canonical classification set.
pub fn classify(raw: Option<&str>) -> Classification {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Classification::Other;
    };
    if let Ok(exact) = raw.parse::<Classification>() {
        return exact;
    }

    let value = raw.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| value.contains(k));

    if matches(&[
        "restaurant", "dining", "food", "grocer", "supermarket", "coffee", "drink", "alcohol",
    ]) {
        return Classification::FoodAndDrinks;
    }
    // Utility bills name their fuel ("Gas & Electric").
    if matches(&["utilit", "electric", "water", "sewer", "mortgage"]) {
        return Classification::HouseholdsAndServices;
    }
    if matches(&[
        "gas", "fuel", "auto", "transport", "travel", "parking", "rideshare", "airline",
        "transit",
    ]) {
        return Classification::Transport;
    }
    if matches(&[
        "health", "medical", "pharmacy", "doctor", "dental", "beauty", "personal care",
        "fitness",
    ]) {
        return Classification::HealthAndBeauty;
    }
    if matches(&[
        "entertainment", "leisure", "recreation", "movie", "music", "streaming", "sport",
        "hobbies", "vacation",
    ]) {
        return Classification::Leisure;
    }
    if matches(&[
        "shopping", "merchandise", "retail", "clothing", "electronics", "department",
    ]) {
        return Classification::Shopping;
    }
    if matches(&[
        "utilities", "rent", "mortgage", "home", "household", "insurance", "service", "phone",
        "internet", "bills",
    ]) {
        return Classification::HouseholdsAndServices;
    }
    Classification::Other
}

fn wrap(
    ctx: &RecordContext,
    raw: &RawTransaction,
    record: BankingTransaction,
) -> Result<CanonicalTransaction, PipelineError> {
    CanonicalTransaction::banking(raw.instrument().account_type(), record)
        .ok_or_else(|| ctx.invalid(format!("{} is not a banking instrument", raw.instrument())))
}

fn unexpected(ctx: &RecordContext, raw: &RawTransaction, expected: &str) -> PipelineError {
    ctx.invalid(format!("expected a {expected} row, got {}", raw.instrument()))
}

pub fn chase_credit(
    ctx: &RecordContext,
    raw: &RawTransaction,
) -> Result<CanonicalTransaction, PipelineError> {
    let RawTransaction::ChaseCredit(row) = raw else {
        return Err(unexpected(ctx, raw, "Chase credit"));
    };
    wrap(ctx, raw, chase_record(ctx, row)?)
}

fn chase_record(ctx: &RecordContext, row: &ChaseCreditRow) -> Result<BankingTransaction, PipelineError> {
    let activity_date = required_date(ctx, row.transaction_date.as_deref(), "Transaction Date")?;
    let description = required(ctx, row.description.as_deref(), "Description")?;
    let amount = required_amount(ctx, row.amount.as_deref(), "Amount")?;
    let (debit, credit) = split_signed(ctx, amount)?;

    Ok(BankingTransaction {
        transaction_id: ctx.transaction_id.clone(),
        activity_date,
        account: ctx.account.label(),
        credit,
        debit,
        classification: classify(row.category.as_deref()),
        subclassification: optional_text(row.category.as_deref()),
        old_classification: None,
        description: description.to_string(),
        old_description: None,
        // Chase only assigns a post date once the charge settles.
        posted: optional_text(row.post_date.as_deref()).is_some(),
    })
}

/// Discover checking, credit and savings share one export layout.
pub fn discover(
    ctx: &RecordContext,
    raw: &RawTransaction,
) -> Result<CanonicalTransaction, PipelineError> {
    let (RawTransaction::DiscoverChecking(row)
    | RawTransaction::DiscoverCredit(row)
    | RawTransaction::DiscoverSavings(row)) = raw
    else {
        return Err(unexpected(ctx, raw, "Discover"));
    };
    wrap(ctx, raw, discover_record(ctx, row)?)
}

fn discover_record(ctx: &RecordContext, row: &DiscoverRow) -> Result<BankingTransaction, PipelineError> {
    let activity_date = required_date(ctx, row.transaction_date.as_deref(), "Transaction Date")?;
    let description = required(
        ctx,
        row.transaction_description.as_deref(),
        "Transaction Description",
    )?;
    let debit = optional_amount(ctx, row.debit.as_deref(), "Debit")?;
    let credit = optional_amount(ctx, row.credit.as_deref(), "Credit")?;
    let (debit, credit) = single_sided(ctx, debit, credit)?;

    Ok(BankingTransaction {
        transaction_id: ctx.transaction_id.clone(),
        activity_date,
        account: ctx.account.label(),
        credit,
        debit,
        classification: classify(row.transaction_type.as_deref()),
        subclassification: optional_text(row.transaction_type.as_deref()),
        old_classification: None,
        description: description.to_string(),
        old_description: None,
        posted: true,
    })
}

/// UCCU checking, credit and savings share one export layout.
pub fn uccu(
    ctx: &RecordContext,
    raw: &RawTransaction,
) -> Result<CanonicalTransaction, PipelineError> {
    let (RawTransaction::UccuChecking(row)
    | RawTransaction::UccuCredit(row)
    | RawTransaction::UccuSavings(row)) = raw
    else {
        return Err(unexpected(ctx, raw, "UCCU"));
    };
    wrap(ctx, raw, uccu_record(ctx, row)?)
}

fn uccu_record(ctx: &RecordContext, row: &UccuRow) -> Result<BankingTransaction, PipelineError> {
    let activity_date = required_date(ctx, row.post_date.as_deref(), "Post Date")?;
    let description = required(ctx, row.description.as_deref(), "Description")?;
    let debit = optional_amount(ctx, row.debit.as_deref(), "Debit")?;
    let credit = optional_amount(ctx, row.credit.as_deref(), "Credit")?;
    let (debit, credit) = single_sided(ctx, debit, credit)?;
    let status = required(ctx, row.status.as_deref(), "Status")?;
    let posted = parse_posted(status).map_err(|e| ctx.invalid(format!("Status: {e}")))?;

    Ok(BankingTransaction {
        transaction_id: ctx.transaction_id.clone(),
        activity_date,
        account: ctx.account.label(),
        credit,
        debit,
        classification: classify(row.classification.as_deref()),
        subclassification: optional_text(row.classification.as_deref()),
        old_classification: None,
        description: description.to_string(),
        old_description: None,
        posted,
    })
}

/// USAA checking, credit and savings share one export layout.
pub fn usaa(
    ctx: &RecordContext,
    raw: &RawTransaction,
) -> Result<CanonicalTransaction, PipelineError> {
    let (RawTransaction::UsaaChecking(row)
    | RawTransaction::UsaaCredit(row)
    | RawTransaction::UsaaSavings(row)) = raw
    else {
        return Err(unexpected(ctx, raw, "USAA"));
    };
    wrap(ctx, raw, usaa_record(ctx, row)?)
}

fn usaa_record(ctx: &RecordContext, row: &UsaaRow) -> Result<BankingTransaction, PipelineError> {
    let activity_date = required_date(ctx, row.date.as_deref(), "Date")?;
    let description = required(ctx, row.description.as_deref(), "Description")?;
    let amount = required_amount(ctx, row.amount.as_deref(), "Amount")?;
    let (debit, credit) = split_signed(ctx, amount)?;
    let status = required(ctx, row.status.as_deref(), "Status")?;
    let posted = parse_posted(status).map_err(|e| ctx.invalid(format!("Status: {e}")))?;

    Ok(BankingTransaction {
        transaction_id: ctx.transaction_id.clone(),
        activity_date,
        account: ctx.account.label(),
        credit,
        debit,
        classification: classify(row.category.as_deref()),
        subclassification: optional_text(row.category.as_deref()),
        old_classification: None,
        description: description.to_string(),
        old_description: None,
        posted,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{AccountKey, InstrumentType, Owner};

    fn ctx(instrument: InstrumentType) -> RecordContext {
        RecordContext::new(AccountKey::new(Owner::Foster, instrument), 1)
    }

    fn discover_row(debit: &str, credit: &str) -> DiscoverRow {
        DiscoverRow {
            transaction_date: Some("01/02/2024".to_string()),
            transaction_description: Some("WHOLE FOODS".to_string()),
            transaction_type: Some("Supermarkets".to_string()),
            debit: Some(debit.to_string()),
            credit: Some(credit.to_string()),
        }
    }

    #[test]
    fn discover_rejects_rows_with_both_sides() {
        let raw = RawTransaction::DiscoverCredit(discover_row("12.00", "3.00"));
        let err = discover(&ctx(InstrumentType::DiscoverCredit), &raw).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRawRecord { row: 1, .. }));
        assert!(err.to_string().contains("both debit and credit"));
    }

    #[test]
    fn discover_rejects_rows_with_neither_side() {
        let raw = RawTransaction::DiscoverChecking(discover_row("", ""));
        let err = discover(&ctx(InstrumentType::DiscoverChecking), &raw).unwrap_err();
        assert!(err.to_string().contains("neither debit nor credit"));
    }

    #[test]
    fn discover_debit_row_normalizes() {
        let raw = RawTransaction::DiscoverCredit(discover_row("$1,012.40", "0.00"));
        let tx = discover(&ctx(InstrumentType::DiscoverCredit), &raw).unwrap();

        let CanonicalTransaction::Credit(tx) = tx else {
            panic!("expected a credit-account record");
        };
        assert_eq!(tx.debit, Some(Decimal::from_str("1012.40").unwrap()));
        assert_eq!(tx.credit, None);
        assert_eq!(tx.activity_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(tx.classification, Classification::FoodAndDrinks);
        assert_eq!(tx.subclassification.as_deref(), Some("Supermarkets"));
        assert_eq!(tx.account, "foster_discover_credit");
    }

    #[test]
    fn usaa_missing_amount_is_not_zero() {
        let raw = RawTransaction::UsaaSavings(UsaaRow {
            date: Some("2024-01-05".to_string()),
            description: Some("Interest".to_string()),
            original_description: None,
            category: Some("Interest".to_string()),
            amount: None,
            status: Some("Posted".to_string()),
        });
        let err = usaa(&ctx(InstrumentType::UsaaSavings), &raw).unwrap_err();
        assert!(err.to_string().contains("missing Amount"));
    }

    #[test]
    fn usaa_signed_amount_splits_into_debit_and_credit() {
        let row = UsaaRow {
            date: Some("2024-01-05".to_string()),
            description: Some("Payroll".to_string()),
            original_description: None,
            category: Some("Income".to_string()),
            amount: Some("2000.00".to_string()),
            status: Some("Pending".to_string()),
        };
        let tx = usaa(
            &ctx(InstrumentType::UsaaChecking),
            &RawTransaction::UsaaChecking(row.clone()),
        )
        .unwrap();
        let banking = tx.as_banking().unwrap();
        assert_eq!(banking.credit, Some(Decimal::from_str("2000.00").unwrap()));
        assert!(!banking.posted);
        assert_eq!(banking.classification, Classification::Other);

        let spent = UsaaRow {
            amount: Some("-4.50".to_string()),
            ..row
        };
        let tx = usaa(
            &ctx(InstrumentType::UsaaChecking),
            &RawTransaction::UsaaChecking(spent),
        )
        .unwrap();
        assert_eq!(tx.as_banking().unwrap().debit, Some(Decimal::from_str("4.50").unwrap()));
    }

    #[test]
    fn uccu_rejects_unknown_status() {
        let raw = RawTransaction::UccuChecking(UccuRow {
            account_number: Some("1234".to_string()),
            post_date: Some("03/01/2024".to_string()),
            check: None,
            description: Some("RENT".to_string()),
            debit: Some("1500.00".to_string()),
            credit: None,
            status: Some("Reversed".to_string()),
            balance: Some("10.00".to_string()),
            classification: Some("Rent".to_string()),
        });
        let err = uccu(&ctx(InstrumentType::UccuChecking), &raw).unwrap_err();
        assert!(err.to_string().contains("Status"));
    }

    #[test]
    fn chase_post_date_marks_posted() {
        let row = ChaseCreditRow {
            transaction_date: Some("02/10/2024".to_string()),
            post_date: None,
            description: Some("SHELL OIL".to_string()),
            category: Some("Gas".to_string()),
            kind: Some("Sale".to_string()),
            amount: Some("-40.12".to_string()),
            memo: None,
        };
        let pending = chase_credit(
            &ctx(InstrumentType::ChaseCredit),
            &RawTransaction::ChaseCredit(row.clone()),
        )
        .unwrap();
        assert!(!pending.as_banking().unwrap().posted);
        assert_eq!(pending.as_banking().unwrap().classification, Classification::Transport);

        let posted = ChaseCreditRow {
            post_date: Some("02/11/2024".to_string()),
            ..row
        };
        let posted = chase_credit(
            &ctx(InstrumentType::ChaseCredit),
            &RawTransaction::ChaseCredit(posted),
        )
        .unwrap();
        assert!(posted.as_banking().unwrap().posted);
    }

    #[test]
    fn classify_maps_keywords_and_exact_names() {
        assert_eq!(classify(Some("Restaurants")), Classification::FoodAndDrinks);
        assert_eq!(classify(Some("Health & Beauty")), Classification::HealthAndBeauty);
        assert_eq!(classify(Some("Utilities")), Classification::HouseholdsAndServices);
        assert_eq!(classify(Some("Payment")), Classification::Other);
        assert_eq!(classify(Some("  ")), Classification::Other);
        assert_eq!(classify(None), Classification::Other);
    }

    #[test]
    fn utility_categories_win_over_fuel_keywords() {
        assert_eq!(classify(Some("Gas & Electric")), Classification::HouseholdsAndServices);
        assert_eq!(classify(Some("Water/Sewer")), Classification::HouseholdsAndServices);
        assert_eq!(classify(Some("Gas")), Classification::Transport);
        assert_eq!(classify(Some("Gasoline")), Classification::Transport);
        assert_eq!(classify(Some("Gas Stations")), Classification::Transport);
    }

    #[test]
    fn wrong_row_shape_is_rejected() {
        let raw = RawTransaction::DiscoverSavings(discover_row("1.00", ""));
        let err = usaa(&ctx(InstrumentType::DiscoverSavings), &raw).unwrap_err();
        assert!(err.to_string().contains("expected a USAA row"));
    }
}
