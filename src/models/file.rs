use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountType, Id, Owner};

/// Inclusive calendar range covered by an uploaded export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the bounds if they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Smallest range containing every date, or `None` for no dates.
    pub fn covering(dates: impl IntoIterator<Item = NaiveDate>) -> Option<Self> {
        let mut iter = dates.into_iter();
        let first = iter.next()?;
        let (start, end) = iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self { start, end })
    }

    /// Standard range-overlap test against a filter window; an absent bound
    /// is unbounded on that side.
    pub fn intersects(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        from.map_or(true, |from| self.end >= from) && to.map_or(true, |to| self.start <= to)
    }
}

/// An uploaded transaction export: `(owner, account_type, file_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileRef {
    pub owner: Owner,
    pub account_type: AccountType,
    pub file_id: Id,
}

impl FileRef {
    pub fn new(owner: Owner, account_type: AccountType, file_id: impl Into<Id>) -> Self {
        Self {
            owner,
            account_type,
            file_id: file_id.into(),
        }
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.account_type, self.file_id)
    }
}

/// Metadata the file store reports for an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub owner: Owner,
    pub account_type: AccountType,
    /// Instrument name as uploaded; resolved against the schema registry.
    pub instrument: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covered_range: Option<DateRange>,
}

/// Ledger entry for a file that has been ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFileRecord {
    pub owner: Owner,
    pub account_type: AccountType,
    pub file_id: Id,
    /// `None` only for exports that contained no transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covered_range: Option<DateRange>,
    pub ingested_at: DateTime<Utc>,
}

impl ProcessedFileRecord {
    pub fn new(file: &FileRef, covered_range: Option<DateRange>, ingested_at: DateTime<Utc>) -> Self {
        Self {
            owner: file.owner,
            account_type: file.account_type,
            file_id: file.file_id.clone(),
            covered_range,
            ingested_at,
        }
    }

    pub fn file_ref(&self) -> FileRef {
        FileRef::new(self.owner, self.account_type, self.file_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn intersects_uses_symmetric_overlap() {
        let january = DateRange::new(d(2024, 1, 1), d(2024, 1, 31));

        assert!(january.intersects(Some(d(2024, 1, 15)), Some(d(2024, 2, 15))));
        assert!(!january.intersects(Some(d(2024, 2, 1)), None));
        assert!(january.intersects(None, Some(d(2024, 1, 1))));
        assert!(!january.intersects(None, Some(d(2023, 12, 31))));
        assert!(january.intersects(None, None));
        // Filter window strictly inside the file range.
        assert!(january.intersects(Some(d(2024, 1, 10)), Some(d(2024, 1, 12))));
    }

    #[test]
    fn covering_spans_min_and_max() {
        let range = DateRange::covering([d(2024, 3, 5), d(2024, 3, 1), d(2024, 3, 9)]).unwrap();
        assert_eq!(range, DateRange::new(d(2024, 3, 1), d(2024, 3, 9)));
        assert_eq!(DateRange::covering(std::iter::empty()), None);
    }

    #[test]
    fn new_orders_reversed_bounds() {
        let range = DateRange::new(d(2024, 2, 1), d(2024, 1, 1));
        assert_eq!(range.start, d(2024, 1, 1));
        assert_eq!(range.end, d(2024, 2, 1));
    }
}
