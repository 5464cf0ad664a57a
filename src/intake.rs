//! Decides which uploaded files a batch should ingest.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{AccountType, DateRange, FileRef, ProcessedFileRecord};

/// Optional batch filters. When any is set, already-processed files can be
/// selected again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<AccountType>,
}

impl IngestFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_start(mut self, date: NaiveDate) -> Self {
        self.date_start = Some(date);
        self
    }

    pub fn with_date_end(mut self, date: NaiveDate) -> Self {
        self.date_end = Some(date);
        self
    }

    pub fn with_account(mut self, account_type: AccountType) -> Self {
        if !self.accounts.contains(&account_type) {
            self.accounts.push(account_type);
        }
        self
    }

    pub fn is_active(&self) -> bool {
        self.has_date_filter() || !self.accounts.is_empty()
    }

    pub fn has_date_filter(&self) -> bool {
        self.date_start.is_some() || self.date_end.is_some()
    }

    pub fn admits_account(&self, account_type: AccountType) -> bool {
        self.accounts.is_empty() || self.accounts.contains(&account_type)
    }
}

/// Outcome of file selection.
#[derive(Debug, Default)]
pub struct Selection {
    pub selected: Vec<FileRef>,
    /// Files that could not be judged against the filters.
    pub rejected: Vec<(FileRef, PipelineError)>,
}

/// Candidates that pass every check not needing a covered date range.
/// Keeps candidate order and drops repeated references.
pub fn shortlist(
    candidates: &[FileRef],
    filters: &IngestFilters,
    processed: &[ProcessedFileRecord],
) -> Vec<FileRef> {
    let done: HashSet<FileRef> = processed.iter().map(ProcessedFileRecord::file_ref).collect();
    let mut seen = HashSet::new();

    candidates
        .iter()
        .filter(|file| seen.insert((*file).clone()))
        .filter(|file| {
            if filters.is_active() {
                filters.admits_account(file.account_type)
            } else {
                !done.contains(*file)
            }
        })
        .cloned()
        .collect()
}

/// Select the files a batch should ingest.
///
/// `covered_ranges` carries ranges reported by file metadata. A file
/// without one falls back to the range recorded when it was last ingested.
pub fn select_files(
    candidates: &[FileRef],
    filters: &IngestFilters,
    processed: &[ProcessedFileRecord],
    covered_ranges: &HashMap<FileRef, DateRange>,
) -> Selection {
    let mut selection = Selection::default();
    let shortlisted = shortlist(candidates, filters, processed);
    if !filters.has_date_filter() {
        selection.selected = shortlisted;
        return selection;
    }

    let recorded: HashMap<FileRef, DateRange> = processed
        .iter()
        .filter_map(|record| record.covered_range.map(|range| (record.file_ref(), range)))
        .collect();

    for file in shortlisted {
        let range = covered_ranges
            .get(&file)
            .or_else(|| recorded.get(&file))
            .copied();
        match range {
            Some(range) if range.intersects(filters.date_start, filters.date_end) => {
                selection.selected.push(file);
            }
            Some(_) => {}
            None => {
                let err = PipelineError::UnknownFileDateRange(file.file_id.clone());
                selection.rejected.push((file, err));
            }
        }
    }
    selection
}
