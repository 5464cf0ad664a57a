//! Cell parsers shared by the transforms.
//!
//! Every parser rejects what it cannot read. A blank amount is never zero.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::PipelineError;

use super::RecordContext;

/// Parse a money cell: `$1,234.56`, `-12.00`, `+3`, `(45.10)`.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Err("empty amount".to_string());
    }

    let (negate, body) = match cleaned
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };
    let body = body.strip_prefix('+').unwrap_or(body);

    let value =
        Decimal::from_str(body).map_err(|_| format!("not a decimal amount: {raw:?}"))?;
    Ok(if negate { -value } else { value })
}

/// Parse a date cell in `YYYY-MM-DD`, `MM/DD/YYYY` or `MM/DD/YY` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    let parsed = if raw.contains('-') {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    } else {
        match raw.rsplit('/').next() {
            Some(year) if year.len() == 2 => NaiveDate::parse_from_str(raw, "%m/%d/%y"),
            _ => NaiveDate::parse_from_str(raw, "%m/%d/%Y"),
        }
    };
    parsed.map_err(|_| format!("not a date: {raw:?}"))
}

/// Parse a crypto quantity cell such as `0.25 BTC` into quantity and ticker.
pub fn parse_quantity_with_ticker(raw: &str) -> Result<(Decimal, String), String> {
    let mut parts = raw.split_whitespace();
    let (Some(quantity), Some(ticker), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected '<quantity> <ticker>', got {raw:?}"));
    };
    let quantity = parse_amount(quantity)?;
    if !ticker.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("not a ticker: {ticker:?}"));
    }
    Ok((quantity.abs(), ticker.to_ascii_uppercase()))
}

/// Map an export status cell to the canonical `posted` flag.
pub fn parse_posted(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "posted" | "cleared" | "complete" | "completed" => Ok(true),
        "pending" => Ok(false),
        other => Err(format!("unknown status: {other:?}")),
    }
}

pub(crate) fn required<'a>(
    ctx: &RecordContext,
    value: Option<&'a str>,
    column: &str,
) -> Result<&'a str, PipelineError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ctx.invalid(format!("missing {column}")))
}

pub(crate) fn required_date(
    ctx: &RecordContext,
    value: Option<&str>,
    column: &str,
) -> Result<NaiveDate, PipelineError> {
    let raw = required(ctx, value, column)?;
    parse_date(raw).map_err(|e| ctx.invalid(format!("{column}: {e}")))
}

pub(crate) fn required_amount(
    ctx: &RecordContext,
    value: Option<&str>,
    column: &str,
) -> Result<Decimal, PipelineError> {
    let raw = required(ctx, value, column)?;
    parse_amount(raw).map_err(|e| ctx.invalid(format!("{column}: {e}")))
}

pub(crate) fn optional_amount(
    ctx: &RecordContext,
    value: Option<&str>,
    column: &str,
) -> Result<Option<Decimal>, PipelineError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_amount(raw)
            .map(Some)
            .map_err(|e| ctx.invalid(format!("{column}: {e}"))),
    }
}

pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve separate debit/credit columns into exactly one populated side.
///
/// A zero cell counts as empty; the populated side is stored as a magnitude.
pub(crate) fn single_sided(
    ctx: &RecordContext,
    debit: Option<Decimal>,
    credit: Option<Decimal>,
) -> Result<(Option<Decimal>, Option<Decimal>), PipelineError> {
    let debit = debit.filter(|d| !d.is_zero()).map(|d| d.abs());
    let credit = credit.filter(|c| !c.is_zero()).map(|c| c.abs());
    match (debit, credit) {
        (Some(_), Some(_)) => Err(ctx.invalid("both debit and credit are populated")),
        (None, None) => Err(ctx.invalid("neither debit nor credit is populated")),
        sides => Ok(sides),
    }
}

/// Split a signed amount (negative = money out) into `(debit, credit)`.
pub(crate) fn split_signed(
    ctx: &RecordContext,
    amount: Decimal,
) -> Result<(Option<Decimal>, Option<Decimal>), PipelineError> {
    if amount.is_zero() {
        return Err(ctx.invalid("zero amount"));
    }
    if amount.is_sign_negative() {
        Ok((Some(amount.abs()), None))
    } else {
        Ok((None, Some(amount)))
    }
}
