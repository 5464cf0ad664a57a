use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{
    BankingTransaction, CanonicalTransaction, CryptoTransaction, Id, InvestingTransaction,
    StoredTransaction,
};

/// Operations reconciliation needs from a canonical record. Implemented once
/// per canonical shape rather than once per institution.
pub trait CanonicalRecord: Clone + PartialEq {
    fn transaction_id(&self) -> &Id;

    fn activity_date(&self) -> NaiveDate;

    /// Check the record-level invariants (one populated side, no negative
    /// magnitudes).
    fn validate(&self) -> Result<(), String>;

    /// The record `self` becomes once `incoming` (same transaction, newer
    /// data) is applied over it. Keeps `self`'s id and moves replaced
    /// history-tracked values into their `old_` fields.
    fn updated_with(&self, incoming: &Self) -> Self;
}

fn exactly_one_side(
    debit: Option<Decimal>,
    credit: Option<Decimal>,
    debit_name: &str,
    credit_name: &str,
) -> Result<(), String> {
    match (debit, credit) {
        (Some(_), Some(_)) => Err(format!("both {debit_name} and {credit_name} are populated")),
        (None, None) => Err(format!("neither {debit_name} nor {credit_name} is populated")),
        (Some(value), None) | (None, Some(value)) if value.is_sign_negative() => {
            Err(format!("negative {debit_name}/{credit_name} magnitude: {value}"))
        }
        _ => Ok(()),
    }
}

impl CanonicalRecord for BankingTransaction {
    fn transaction_id(&self) -> &Id {
        &self.transaction_id
    }

    fn activity_date(&self) -> NaiveDate {
        self.activity_date
    }

    fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("empty description".to_string());
        }
        exactly_one_side(self.debit, self.credit, "debit", "credit")
    }

    fn updated_with(&self, incoming: &Self) -> Self {
        let mut next = incoming.clone();
        next.transaction_id = self.transaction_id.clone();
        next.old_classification = if incoming.classification != self.classification {
            Some(self.classification.to_string())
        } else {
            self.old_classification.clone()
        };
        next.old_description = if incoming.description != self.description {
            Some(self.description.clone())
        } else {
            self.old_description.clone()
        };
        next
    }
}

impl CanonicalRecord for CryptoTransaction {
    fn transaction_id(&self) -> &Id {
        &self.transaction_id
    }

    fn activity_date(&self) -> NaiveDate {
        self.activity_date
    }

    fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("empty ticker".to_string());
        }
        if self.price.is_sign_negative() || self.amount.is_sign_negative() {
            return Err("negative price or amount".to_string());
        }
        exactly_one_side(
            self.debit_quantity,
            self.credit_quantity,
            "debit_quantity",
            "credit_quantity",
        )
    }

    fn updated_with(&self, incoming: &Self) -> Self {
        let mut next = incoming.clone();
        next.transaction_id = self.transaction_id.clone();
        next
    }
}

impl CanonicalRecord for InvestingTransaction {
    fn transaction_id(&self) -> &Id {
        &self.transaction_id
    }

    fn activity_date(&self) -> NaiveDate {
        self.activity_date
    }

    fn validate(&self) -> Result<(), String> {
        let negative = |v: Option<Decimal>| v.is_some_and(|v| v.is_sign_negative());
        if negative(self.quantity) || negative(self.price) {
            return Err("negative quantity or price".to_string());
        }
        exactly_one_side(self.debit, self.credit, "debit", "credit")
    }

    fn updated_with(&self, incoming: &Self) -> Self {
        let mut next = incoming.clone();
        next.transaction_id = self.transaction_id.clone();
        next
    }
}

impl CanonicalRecord for CanonicalTransaction {
    fn transaction_id(&self) -> &Id {
        match self {
            Self::Checking(tx) | Self::Credit(tx) | Self::Savings(tx) => tx.transaction_id(),
            Self::Crypto(tx) => tx.transaction_id(),
            Self::Investing(tx) | Self::Ira(tx) => tx.transaction_id(),
        }
    }

    fn activity_date(&self) -> NaiveDate {
        match self {
            Self::Checking(tx) | Self::Credit(tx) | Self::Savings(tx) => tx.activity_date,
            Self::Crypto(tx) => tx.activity_date,
            Self::Investing(tx) | Self::Ira(tx) => tx.activity_date,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Checking(tx) | Self::Credit(tx) | Self::Savings(tx) => tx.validate(),
            Self::Crypto(tx) => tx.validate(),
            Self::Investing(tx) | Self::Ira(tx) => tx.validate(),
        }
    }

    fn updated_with(&self, incoming: &Self) -> Self {
        match (self, incoming) {
            (Self::Checking(old), Self::Checking(new)) => Self::Checking(old.updated_with(new)),
            (Self::Credit(old), Self::Credit(new)) => Self::Credit(old.updated_with(new)),
            (Self::Savings(old), Self::Savings(new)) => Self::Savings(old.updated_with(new)),
            (Self::Crypto(old), Self::Crypto(new)) => Self::Crypto(old.updated_with(new)),
            (Self::Investing(old), Self::Investing(new)) => Self::Investing(old.updated_with(new)),
            (Self::Ira(old), Self::Ira(new)) => Self::Ira(old.updated_with(new)),
            // Partitions hold a single account type. A record that changes
            // shape is not the same transaction, so the stored one stands.
            (current, new) => {
                tracing::warn!(
                    id = %current.transaction_id(),
                    stored = %current.account_type(),
                    incoming = %new.account_type(),
                    "Ignoring update that changes the account type"
                );
                current.clone()
            }
        }
    }
}

impl CanonicalRecord for StoredTransaction {
    fn transaction_id(&self) -> &Id {
        self.transaction.transaction_id()
    }

    fn activity_date(&self) -> NaiveDate {
        self.transaction.activity_date()
    }

    fn validate(&self) -> Result<(), String> {
        self.transaction.validate()
    }

    /// Provenance stays with the file that first introduced the transaction.
    fn updated_with(&self, incoming: &Self) -> Self {
        StoredTransaction::new(
            self.transaction.updated_with(&incoming.transaction),
            self.source_file_id.clone(),
        )
    }
}
