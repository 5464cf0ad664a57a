mod canonical;
mod file;
mod id;
pub mod raw;
mod stored;
mod taxonomy;

pub use canonical::{
    BankingTransaction, CanonicalShape, CanonicalTransaction, Classification, CryptoTransaction,
    InvestingTransaction, TransCode,
};
pub use file::{DateRange, FileMetadata, FileRef, ProcessedFileRecord};
pub use id::{Id, IdError};
pub use raw::{RawRecord, RawShape, RawTransaction};
pub use stored::{PartitionSnapshot, ReconciliationResult, StoredTransaction};
pub use taxonomy::{AccountKey, AccountType, InstrumentType, Owner, TaxonomyError};
