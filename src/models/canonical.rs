//! Institution-agnostic transaction records, one shape per account-type family.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountType, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Households & Services")]
    HouseholdsAndServices,
    #[serde(rename = "Food & Drinks")]
    FoodAndDrinks,
    #[serde(rename = "Transport")]
    Transport,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Leisure")]
    Leisure,
    #[serde(rename = "Health & Beauty")]
    HealthAndBeauty,
    #[serde(rename = "Other")]
    Other,
}

impl Classification {
    pub const ALL: [Classification; 7] = [
        Classification::HouseholdsAndServices,
        Classification::FoodAndDrinks,
        Classification::Transport,
        Classification::Shopping,
        Classification::Leisure,
        Classification::HealthAndBeauty,
        Classification::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::HouseholdsAndServices => "Households & Services",
            Classification::FoodAndDrinks => "Food & Drinks",
            Classification::Transport => "Transport",
            Classification::Shopping => "Shopping",
            Classification::Leisure => "Leisure",
            Classification::HealthAndBeauty => "Health & Beauty",
            Classification::Other => "Other",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Classification::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown classification: {s:?}"))
    }
}

/// Checking, credit and savings accounts share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankingTransaction {
    pub transaction_id: Id,
    pub activity_date: NaiveDate,
    pub account: String,
    pub credit: Option<Decimal>,
    pub debit: Option<Decimal>,
    pub classification: Classification,
    pub subclassification: Option<String>,
    pub old_classification: Option<String>,
    pub description: String,
    pub old_description: Option<String>,
    pub posted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoTransaction {
    pub transaction_id: Id,
    pub activity_date: NaiveDate,
    pub account: String,
    pub description: Option<String>,
    pub ticker: String,
    pub credit_quantity: Option<Decimal>,
    pub debit_quantity: Option<Decimal>,
    pub price: Decimal,
    pub amount: Decimal,
    pub fee: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransCode {
    Ach,
    Cdiv,
    Buy,
    Sell,
}

/// Investing and IRA accounts share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestingTransaction {
    pub transaction_id: Id,
    pub activity_date: NaiveDate,
    pub account: String,
    pub process_date: NaiveDate,
    pub settle_date: NaiveDate,
    pub ticker: Option<String>,
    pub description: String,
    pub trans_code: TransCode,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub debit: Option<Decimal>,
}

/// A normalized transaction, tagged by the account type it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum CanonicalTransaction {
    Checking(BankingTransaction),
    Credit(BankingTransaction),
    Savings(BankingTransaction),
    Crypto(CryptoTransaction),
    Investing(InvestingTransaction),
    Ira(InvestingTransaction),
}

/// Which canonical shape an instrument normalizes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalShape {
    Banking,
    Crypto,
    Investing,
}

impl CanonicalShape {
    pub fn for_account_type(account_type: AccountType) -> Self {
        match account_type {
            AccountType::Checking | AccountType::Credit | AccountType::Savings => {
                CanonicalShape::Banking
            }
            AccountType::Crypto => CanonicalShape::Crypto,
            AccountType::Investing | AccountType::Ira => CanonicalShape::Investing,
        }
    }
}

impl CanonicalTransaction {
    /// Wrap a banking record in the variant for `account_type`.
    pub fn banking(account_type: AccountType, record: BankingTransaction) -> Option<Self> {
        match account_type {
            AccountType::Checking => Some(Self::Checking(record)),
            AccountType::Credit => Some(Self::Credit(record)),
            AccountType::Savings => Some(Self::Savings(record)),
            _ => None,
        }
    }

    /// Wrap an investing record in the variant for `account_type`.
    pub fn investing(account_type: AccountType, record: InvestingTransaction) -> Option<Self> {
        match account_type {
            AccountType::Investing => Some(Self::Investing(record)),
            AccountType::Ira => Some(Self::Ira(record)),
            _ => None,
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            Self::Checking(_) => AccountType::Checking,
            Self::Credit(_) => AccountType::Credit,
            Self::Savings(_) => AccountType::Savings,
            Self::Crypto(_) => AccountType::Crypto,
            Self::Investing(_) => AccountType::Investing,
            Self::Ira(_) => AccountType::Ira,
        }
    }

    pub fn with_transaction_id(mut self, id: Id) -> Self {
        match &mut self {
            Self::Checking(tx) | Self::Credit(tx) | Self::Savings(tx) => tx.transaction_id = id,
            Self::Crypto(tx) => tx.transaction_id = id,
            Self::Investing(tx) | Self::Ira(tx) => tx.transaction_id = id,
        }
        self
    }

    pub fn shape(&self) -> CanonicalShape {
        CanonicalShape::for_account_type(self.account_type())
    }

    pub fn as_banking(&self) -> Option<&BankingTransaction> {
        match self {
            Self::Checking(tx) | Self::Credit(tx) | Self::Savings(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn as_crypto(&self) -> Option<&CryptoTransaction> {
        match self {
            Self::Crypto(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn as_investing(&self) -> Option<&InvestingTransaction> {
        match self {
            Self::Investing(tx) | Self::Ira(tx) => Some(tx),
            _ => None,
        }
    }
}
