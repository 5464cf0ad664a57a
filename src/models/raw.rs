//! Institution-specific export rows.
//!
//! Rows are decoded from CSV with every cell kept as text. Turning cells into
//! amounts and dates is the transform's job, so a malformed value is reported
//! against the row instead of being coerced here.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::PipelineError;

use super::InstrumentType;

/// Capability shared by every raw row.
pub trait RawRecord {
    /// Description as the institution first posted it, when the export
    /// carries one next to a cleaned-up display description.
    fn stable_description(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChaseCreditRow {
    #[serde(rename = "Transaction Date")]
    pub transaction_date: Option<String>,
    #[serde(rename = "Post Date")]
    pub post_date: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    /// Signed: purchases are negative.
    #[serde(rename = "Amount")]
    pub amount: Option<String>,
    #[serde(rename = "Memo")]
    pub memo: Option<String>,
}

impl RawRecord for ChaseCreditRow {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoverRow {
    #[serde(rename = "Transaction Date")]
    pub transaction_date: Option<String>,
    #[serde(rename = "Transaction Description")]
    pub transaction_description: Option<String>,
    #[serde(rename = "Transaction Type")]
    pub transaction_type: Option<String>,
    #[serde(rename = "Debit")]
    pub debit: Option<String>,
    #[serde(rename = "Credit")]
    pub credit: Option<String>,
}

impl RawRecord for DiscoverRow {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UccuRow {
    #[serde(rename = "Account Number")]
    pub account_number: Option<String>,
    #[serde(rename = "Post Date")]
    pub post_date: Option<String>,
    #[serde(rename = "Check")]
    pub check: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Debit")]
    pub debit: Option<String>,
    #[serde(rename = "Credit")]
    pub credit: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Balance")]
    pub balance: Option<String>,
    #[serde(rename = "Classification")]
    pub classification: Option<String>,
}

impl RawRecord for UccuRow {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UsaaRow {
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Original Description")]
    pub original_description: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    /// Signed: debits are negative.
    #[serde(rename = "Amount")]
    pub amount: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
}

impl RawRecord for UsaaRow {
    // USAA rewrites `Description` when it cleans up merchant names.
    fn stable_description(&self) -> Option<&str> {
        self.original_description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RobinhoodCryptoRow {
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Transaction Type")]
    pub transaction_type: Option<String>,
    /// Quantity with ticker, e.g. `0.25 BTC`.
    #[serde(rename = "Debit")]
    pub debit: Option<String>,
    #[serde(rename = "Credit")]
    pub credit: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Value")]
    pub value: Option<String>,
    #[serde(rename = "Fee")]
    pub fee: Option<String>,
}

impl RawRecord for RobinhoodCryptoRow {}

/// Robinhood brokerage export, shared by the individual and IRA accounts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RobinhoodBrokerageRow {
    #[serde(rename = "Activity Date")]
    pub activity_date: Option<String>,
    #[serde(rename = "Process Date")]
    pub process_date: Option<String>,
    #[serde(rename = "Settle Date")]
    pub settle_date: Option<String>,
    #[serde(rename = "Symbol")]
    pub symbol: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Account Type")]
    pub account_type: Option<String>,
    #[serde(rename = "Trans Code")]
    pub trans_code: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Debit")]
    pub debit: Option<String>,
    #[serde(rename = "Credit")]
    pub credit: Option<String>,
}

impl RawRecord for RobinhoodBrokerageRow {}

/// One raw row, tagged by the instrument it was exported from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTransaction {
    ChaseCredit(ChaseCreditRow),
    DiscoverChecking(DiscoverRow),
    DiscoverCredit(DiscoverRow),
    DiscoverSavings(DiscoverRow),
    RobinhoodCrypto(RobinhoodCryptoRow),
    RobinhoodInvesting(RobinhoodBrokerageRow),
    RobinhoodIra(RobinhoodBrokerageRow),
    UccuChecking(UccuRow),
    UccuCredit(UccuRow),
    UccuSavings(UccuRow),
    UsaaChecking(UsaaRow),
    UsaaCredit(UsaaRow),
    UsaaSavings(UsaaRow),
}

impl RawTransaction {
    pub fn instrument(&self) -> InstrumentType {
        match self {
            RawTransaction::ChaseCredit(_) => InstrumentType::ChaseCredit,
            RawTransaction::DiscoverChecking(_) => InstrumentType::DiscoverChecking,
            RawTransaction::DiscoverCredit(_) => InstrumentType::DiscoverCredit,
            RawTransaction::DiscoverSavings(_) => InstrumentType::DiscoverSavings,
            RawTransaction::RobinhoodCrypto(_) => InstrumentType::RobinhoodCrypto,
            RawTransaction::RobinhoodInvesting(_) => InstrumentType::RobinhoodInvesting,
            RawTransaction::RobinhoodIra(_) => InstrumentType::RobinhoodIra,
            RawTransaction::UccuChecking(_) => InstrumentType::UccuChecking,
            RawTransaction::UccuCredit(_) => InstrumentType::UccuCredit,
            RawTransaction::UccuSavings(_) => InstrumentType::UccuSavings,
            RawTransaction::UsaaChecking(_) => InstrumentType::UsaaChecking,
            RawTransaction::UsaaCredit(_) => InstrumentType::UsaaCredit,
            RawTransaction::UsaaSavings(_) => InstrumentType::UsaaSavings,
        }
    }

    pub fn record(&self) -> &dyn RawRecord {
        match self {
            RawTransaction::ChaseCredit(row) => row,
            RawTransaction::DiscoverChecking(row)
            | RawTransaction::DiscoverCredit(row)
            | RawTransaction::DiscoverSavings(row) => row,
            RawTransaction::RobinhoodCrypto(row) => row,
            RawTransaction::RobinhoodInvesting(row) | RawTransaction::RobinhoodIra(row) => row,
            RawTransaction::UccuChecking(row)
            | RawTransaction::UccuCredit(row)
            | RawTransaction::UccuSavings(row) => row,
            RawTransaction::UsaaChecking(row)
            | RawTransaction::UsaaCredit(row)
            | RawTransaction::UsaaSavings(row) => row,
        }
    }
}

/// The export layouts, one per institution product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawShape {
    ChaseCredit,
    Discover,
    RobinhoodCrypto,
    RobinhoodBrokerage,
    Uccu,
    Usaa,
}

impl RawShape {
    pub fn for_instrument(instrument: InstrumentType) -> Self {
        match instrument {
            InstrumentType::ChaseCredit => RawShape::ChaseCredit,
            InstrumentType::DiscoverChecking
            | InstrumentType::DiscoverCredit
            | InstrumentType::DiscoverSavings => RawShape::Discover,
            InstrumentType::RobinhoodCrypto => RawShape::RobinhoodCrypto,
            InstrumentType::RobinhoodInvesting | InstrumentType::RobinhoodIra => {
                RawShape::RobinhoodBrokerage
            }
            InstrumentType::UccuChecking
            | InstrumentType::UccuCredit
            | InstrumentType::UccuSavings => RawShape::Uccu,
            InstrumentType::UsaaChecking
            | InstrumentType::UsaaCredit
            | InstrumentType::UsaaSavings => RawShape::Usaa,
        }
    }

    /// Columns an export must carry. Optional columns (memos, original
    /// descriptions, fees) may be left out entirely.
    pub fn required_headers(&self) -> &'static [&'static str] {
        match self {
            RawShape::ChaseCredit => &["Transaction Date", "Description", "Amount"],
            RawShape::Discover => &[
                "Transaction Date",
                "Transaction Description",
                "Transaction Type",
                "Debit",
                "Credit",
            ],
            RawShape::RobinhoodCrypto => &["Date", "Transaction Type", "Debit", "Credit", "Price", "Value"],
            RawShape::RobinhoodBrokerage => &[
                "Activity Date",
                "Process Date",
                "Settle Date",
                "Description",
                "Trans Code",
                "Debit",
                "Credit",
            ],
            RawShape::Uccu => &["Post Date", "Description", "Debit", "Credit", "Status"],
            RawShape::Usaa => &["Date", "Description", "Category", "Amount", "Status"],
        }
    }
}

/// Decode a CSV export into raw rows for `instrument`.
pub fn decode_csv(
    instrument: InstrumentType,
    content: &[u8],
) -> Result<Vec<RawTransaction>, PipelineError> {
    let shape = RawShape::for_instrument(instrument);
    let rows = match instrument {
        InstrumentType::ChaseCredit => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::ChaseCredit)
            .collect(),
        InstrumentType::DiscoverChecking => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::DiscoverChecking)
            .collect(),
        InstrumentType::DiscoverCredit => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::DiscoverCredit)
            .collect(),
        InstrumentType::DiscoverSavings => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::DiscoverSavings)
            .collect(),
        InstrumentType::RobinhoodCrypto => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::RobinhoodCrypto)
            .collect(),
        InstrumentType::RobinhoodInvesting => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::RobinhoodInvesting)
            .collect(),
        InstrumentType::RobinhoodIra => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::RobinhoodIra)
            .collect(),
        InstrumentType::UccuChecking => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::UccuChecking)
            .collect(),
        InstrumentType::UccuCredit => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::UccuCredit)
            .collect(),
        InstrumentType::UccuSavings => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::UccuSavings)
            .collect(),
        InstrumentType::UsaaChecking => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::UsaaChecking)
            .collect(),
        InstrumentType::UsaaCredit => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::UsaaCredit)
            .collect(),
        InstrumentType::UsaaSavings => decode_rows(shape, content)?
            .into_iter()
            .map(RawTransaction::UsaaSavings)
            .collect(),
    };
    Ok(rows)
}

fn decode_rows<T: DeserializeOwned>(shape: RawShape, content: &[u8]) -> Result<Vec<T>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::invalid_record(0, format!("unreadable header row: {e}")))?
        .clone();
    for required in shape.required_headers() {
        if !headers.iter().any(|h| h == *required) {
            return Err(PipelineError::invalid_record(
                0,
                format!("missing column {required:?}"),
            ));
        }
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        // Row numbers are 1-based and exclude the header.
        let row = result.map_err(|e| PipelineError::invalid_record(idx + 1, e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}
