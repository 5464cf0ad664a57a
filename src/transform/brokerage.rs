//! Robinhood crypto, investing and IRA transforms.

use crate::error::PipelineError;
use crate::models::raw::{RobinhoodBrokerageRow, RobinhoodCryptoRow};
use crate::models::{
    CanonicalTransaction, CryptoTransaction, InvestingTransaction, RawTransaction, TransCode,
};

use super::parse::{
    optional_amount, optional_text, parse_quantity_with_ticker, required, required_amount,
    required_date, single_sided,
};
use super::RecordContext;

pub fn robinhood_crypto(
    ctx: &RecordContext,
    raw: &RawTransaction,
) -> Result<CanonicalTransaction, PipelineError> {
    let RawTransaction::RobinhoodCrypto(row) = raw else {
        return Err(ctx.invalid(format!(
            "expected a Robinhood crypto row, got {}",
            raw.instrument()
        )));
    };
    crypto_record(ctx, row).map(CanonicalTransaction::Crypto)
}

fn crypto_record(
    ctx: &RecordContext,
    row: &RobinhoodCryptoRow,
) -> Result<CryptoTransaction, PipelineError> {
    let activity_date = required_date(ctx, row.date.as_deref(), "Date")?;
    let transaction_type = required(ctx, row.transaction_type.as_deref(), "Transaction Type")?;

    let debit = quantity_cell(ctx, row.debit.as_deref(), "Debit")?;
    let credit = quantity_cell(ctx, row.credit.as_deref(), "Credit")?;
    let ticker = match (&debit, &credit) {
        (Some((_, ticker)), None) | (None, Some((_, ticker))) => ticker.clone(),
        (Some((_, left)), Some((_, right))) if left != right => {
            return Err(ctx.invalid(format!("debit and credit name different assets: {left}, {right}")));
        }
        (Some((_, ticker)), Some(_)) => ticker.clone(),
        (None, None) => return Err(ctx.invalid("neither debit nor credit is populated")),
    };
    let (debit_quantity, credit_quantity) =
        single_sided(ctx, debit.map(|(q, _)| q), credit.map(|(q, _)| q))?;

    let price = required_amount(ctx, row.price.as_deref(), "Price")?;
    let amount = required_amount(ctx, row.value.as_deref(), "Value")?;
    let fee = optional_amount(ctx, row.fee.as_deref(), "Fee")?;

    Ok(CryptoTransaction {
        transaction_id: ctx.transaction_id.clone(),
        activity_date,
        account: ctx.account.label(),
        description: Some(transaction_type.to_string()),
        ticker,
        credit_quantity,
        debit_quantity,
        price: price.abs(),
        amount: amount.abs(),
        fee: fee.map(|f| f.abs()),
    })
}

fn quantity_cell(
    ctx: &RecordContext,
    value: Option<&str>,
    column: &str,
) -> Result<Option<(rust_decimal::Decimal, String)>, PipelineError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_quantity_with_ticker(raw)
            .map(Some)
            .map_err(|e| ctx.invalid(format!("{column}: {e}"))),
    }
}

pub fn parse_trans_code(raw: &str) -> Option<TransCode> {
    match raw.trim().to_ascii_uppercase().as_str() {
        // Older exports spell the ACH code transposed.
        "ACH" | "AHC" => Some(TransCode::Ach),
        "CDIV" => Some(TransCode::Cdiv),
        "BUY" => Some(TransCode::Buy),
        "SELL" => Some(TransCode::Sell),
        _ => None,
    }
}

/// Robinhood individual and IRA accounts share one export layout.
pub fn robinhood_brokerage(
    ctx: &RecordContext,
    raw: &RawTransaction,
) -> Result<CanonicalTransaction, PipelineError> {
    let (RawTransaction::RobinhoodInvesting(row) | RawTransaction::RobinhoodIra(row)) = raw else {
        return Err(ctx.invalid(format!(
            "expected a Robinhood brokerage row, got {}",
            raw.instrument()
        )));
    };
    let record = brokerage_record(ctx, row)?;
    CanonicalTransaction::investing(raw.instrument().account_type(), record).ok_or_else(|| {
        ctx.invalid(format!("{} is not a brokerage instrument", raw.instrument()))
    })
}

fn brokerage_record(
    ctx: &RecordContext,
    row: &RobinhoodBrokerageRow,
) -> Result<InvestingTransaction, PipelineError> {
    let activity_date = required_date(ctx, row.activity_date.as_deref(), "Activity Date")?;
    let process_date = required_date(ctx, row.process_date.as_deref(), "Process Date")?;
    let settle_date = required_date(ctx, row.settle_date.as_deref(), "Settle Date")?;
    let description = required(ctx, row.description.as_deref(), "Description")?;
    let code = required(ctx, row.trans_code.as_deref(), "Trans Code")?;
    let trans_code = parse_trans_code(code)
        .ok_or_else(|| ctx.invalid(format!("unknown Trans Code {code:?}")))?;

    let ticker = optional_text(row.symbol.as_deref()).map(|s| s.to_ascii_uppercase());
    let quantity = optional_amount(ctx, row.quantity.as_deref(), "Quantity")?.map(|q| q.abs());
    let price = optional_amount(ctx, row.price.as_deref(), "Price")?.map(|p| p.abs());

    if matches!(trans_code, TransCode::Buy | TransCode::Sell) {
        if ticker.is_none() {
            return Err(ctx.invalid("trade without a Symbol"));
        }
        if quantity.is_none() || price.is_none() {
            return Err(ctx.invalid("trade without Quantity and Price"));
        }
    }

    let debit = optional_amount(ctx, row.debit.as_deref(), "Debit")?;
    let credit = optional_amount(ctx, row.credit.as_deref(), "Credit")?;
    let (debit, credit) = single_sided(ctx, debit, credit)?;

    Ok(InvestingTransaction {
        transaction_id: ctx.transaction_id.clone(),
        activity_date,
        account: ctx.account.label(),
        process_date,
        settle_date,
        ticker,
        description: description.to_string(),
        trans_code,
        quantity,
        price,
        credit,
        debit,
    })
}
