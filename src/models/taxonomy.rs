//! Account owner / account type / instrument type taxonomy.
//!
//! The set of instruments is closed: every institution export the tracker
//! understands has a variant here, and nothing is registered at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value:?}")]
pub struct TaxonomyError {
    kind: &'static str,
    value: String,
}

impl TaxonomyError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Foster,
    Natalia,
    Shared,
}

impl Owner {
    pub const ALL: [Owner; 3] = [Owner::Foster, Owner::Natalia, Owner::Shared];

    pub fn as_str(&self) -> &'static str {
        match self {
            Owner::Foster => "foster",
            Owner::Natalia => "natalia",
            Owner::Shared => "shared",
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Owner {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Owner::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TaxonomyError::new("account owner", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "checking")]
    Checking,
    #[serde(rename = "credit")]
    Credit,
    #[serde(rename = "crypto")]
    Crypto,
    #[serde(rename = "investing")]
    Investing,
    #[serde(rename = "IRA")]
    Ira,
    #[serde(rename = "savings")]
    Savings,
}

impl AccountType {
    pub const ALL: [AccountType; 6] = [
        AccountType::Checking,
        AccountType::Credit,
        AccountType::Crypto,
        AccountType::Investing,
        AccountType::Ira,
        AccountType::Savings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Credit => "credit",
            AccountType::Crypto => "crypto",
            AccountType::Investing => "investing",
            AccountType::Ira => "IRA",
            AccountType::Savings => "savings",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AccountType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TaxonomyError::new("account type", s))
    }
}

/// A specific institution + account product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentType {
    #[serde(rename = "chase_credit")]
    ChaseCredit,
    #[serde(rename = "discover_checking")]
    DiscoverChecking,
    #[serde(rename = "discover_credit")]
    DiscoverCredit,
    #[serde(rename = "discover_savings")]
    DiscoverSavings,
    #[serde(rename = "robinhood_crypto")]
    RobinhoodCrypto,
    #[serde(rename = "robinhood_investing")]
    RobinhoodInvesting,
    #[serde(rename = "robinhood_IRA")]
    RobinhoodIra,
    #[serde(rename = "UCCU_checking")]
    UccuChecking,
    #[serde(rename = "UCCU_credit")]
    UccuCredit,
    #[serde(rename = "UCCU_savings")]
    UccuSavings,
    #[serde(rename = "USAA_checking")]
    UsaaChecking,
    #[serde(rename = "USAA_credit")]
    UsaaCredit,
    #[serde(rename = "USAA_savings")]
    UsaaSavings,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 13] = [
        InstrumentType::ChaseCredit,
        InstrumentType::DiscoverChecking,
        InstrumentType::DiscoverCredit,
        InstrumentType::DiscoverSavings,
        InstrumentType::RobinhoodCrypto,
        InstrumentType::RobinhoodInvesting,
        InstrumentType::RobinhoodIra,
        InstrumentType::UccuChecking,
        InstrumentType::UccuCredit,
        InstrumentType::UccuSavings,
        InstrumentType::UsaaChecking,
        InstrumentType::UsaaCredit,
        InstrumentType::UsaaSavings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::ChaseCredit => "chase_credit",
            InstrumentType::DiscoverChecking => "discover_checking",
            InstrumentType::DiscoverCredit => "discover_credit",
            InstrumentType::DiscoverSavings => "discover_savings",
            InstrumentType::RobinhoodCrypto => "robinhood_crypto",
            InstrumentType::RobinhoodInvesting => "robinhood_investing",
            InstrumentType::RobinhoodIra => "robinhood_IRA",
            InstrumentType::UccuChecking => "UCCU_checking",
            InstrumentType::UccuCredit => "UCCU_credit",
            InstrumentType::UccuSavings => "UCCU_savings",
            InstrumentType::UsaaChecking => "USAA_checking",
            InstrumentType::UsaaCredit => "USAA_credit",
            InstrumentType::UsaaSavings => "USAA_savings",
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            InstrumentType::DiscoverChecking
            | InstrumentType::UccuChecking
            | InstrumentType::UsaaChecking => AccountType::Checking,
            InstrumentType::ChaseCredit
            | InstrumentType::DiscoverCredit
            | InstrumentType::UccuCredit
            | InstrumentType::UsaaCredit => AccountType::Credit,
            InstrumentType::DiscoverSavings
            | InstrumentType::UccuSavings
            | InstrumentType::UsaaSavings => AccountType::Savings,
            InstrumentType::RobinhoodCrypto => AccountType::Crypto,
            InstrumentType::RobinhoodInvesting => AccountType::Investing,
            InstrumentType::RobinhoodIra => AccountType::Ira,
        }
    }

    pub fn institution(&self) -> &'static str {
        match self {
            InstrumentType::ChaseCredit => "chase",
            InstrumentType::DiscoverChecking
            | InstrumentType::DiscoverCredit
            | InstrumentType::DiscoverSavings => "discover",
            InstrumentType::RobinhoodCrypto
            | InstrumentType::RobinhoodInvesting
            | InstrumentType::RobinhoodIra => "robinhood",
            InstrumentType::UccuChecking
            | InstrumentType::UccuCredit
            | InstrumentType::UccuSavings => "uccu",
            InstrumentType::UsaaChecking
            | InstrumentType::UsaaCredit
            | InstrumentType::UsaaSavings => "usaa",
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentType {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        InstrumentType::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TaxonomyError::new("instrument type", s))
    }
}

/// Routes raw data to its transform and to its stored dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
    owner: Owner,
    account_type: AccountType,
    instrument: InstrumentType,
}

impl AccountKey {
    pub fn new(owner: Owner, instrument: InstrumentType) -> Self {
        Self {
            owner,
            account_type: instrument.account_type(),
            instrument,
        }
    }

    /// Build a key from an upload tuple, rejecting instruments that do not
    /// belong to the stated account type.
    pub fn try_new(
        owner: Owner,
        account_type: AccountType,
        instrument: InstrumentType,
    ) -> Result<Self, TaxonomyError> {
        if instrument.account_type() != account_type {
            return Err(TaxonomyError::new(
                "instrument for account type",
                &format!("{instrument} ({account_type})"),
            ));
        }
        Ok(Self::new(owner, instrument))
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn instrument(&self) -> InstrumentType {
        self.instrument
    }

    /// Value of the canonical `account` field, e.g. `foster_usaa_checking`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.owner.as_str(), self.instrument.as_str()).to_lowercase()
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.instrument)
    }
}
