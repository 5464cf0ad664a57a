//! Merging normalized records into what is already stored for an account.

mod ledger;
mod record;

pub use ledger::AccountLedger;
pub use record::CanonicalRecord;

use std::collections::HashMap;

use crate::models::{Id, ReconciliationResult, StoredTransaction};

/// Collapse records sharing a transaction id into one, keeping first-seen
/// order. Later records win, applied with the usual update semantics.
pub fn dedupe<T: CanonicalRecord>(records: Vec<T>) -> Vec<T> {
    let mut positions: HashMap<Id, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(record.transaction_id()) {
            Some(&idx) => {
                let next = out[idx].updated_with(&record);
                out[idx] = next;
            }
            None => {
                positions.insert(record.transaction_id().clone(), out.len());
                out.push(record);
            }
        }
    }

    out
}

/// Combine two independently loaded collections for the same account.
/// Records in `second` are applied over `first`.
pub fn merge<T: CanonicalRecord>(first: Vec<T>, second: Vec<T>) -> Vec<T> {
    let mut combined = first;
    combined.extend(second);
    dedupe(combined)
}

/// Work out what must change in `existing` to absorb `incoming`.
pub fn reconcile(
    existing: &[StoredTransaction],
    incoming: Vec<StoredTransaction>,
) -> ReconciliationResult {
    let by_id: HashMap<&Id, &StoredTransaction> = existing
        .iter()
        .map(|stored| (stored.transaction_id(), stored))
        .collect();

    let mut result = ReconciliationResult::default();
    for record in dedupe(incoming) {
        match by_id.get(record.transaction_id()) {
            None => result.to_insert.push(record),
            Some(current) => {
                let candidate = current.updated_with(&record);
                if candidate == **current {
                    result.unchanged += 1;
                } else {
                    result.to_update.push(candidate);
                }
            }
        }
    }
    result
}

/// Apply a reconciliation result to a partition's records.
pub fn apply(records: Vec<StoredTransaction>, changes: &ReconciliationResult) -> Vec<StoredTransaction> {
    let replacements: HashMap<&Id, &StoredTransaction> = changes
        .to_update
        .iter()
        .chain(changes.to_insert.iter())
        .map(|stored| (stored.transaction_id(), stored))
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<StoredTransaction> = records
        .into_iter()
        .filter(|stored| !changes.to_delete.contains(stored.transaction_id()))
        .map(|stored| {
            seen.insert(stored.transaction_id().clone());
            match replacements.get(stored.transaction_id()) {
                Some(replacement) => (*replacement).clone(),
                None => stored,
            }
        })
        .collect();

    for inserted in &changes.to_insert {
        if seen.insert(inserted.transaction_id().clone()) {
            out.push(inserted.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{BankingTransaction, CanonicalTransaction, Classification};

    fn banking(id: &str, classification: Classification, description: &str) -> BankingTransaction {
        BankingTransaction {
            transaction_id: Id::from_string(id),
            activity_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            account: "foster_usaa_checking".to_string(),
            credit: None,
            debit: Some(Decimal::new(450, 2)),
            classification,
            subclassification: None,
            old_classification: None,
            description: description.to_string(),
            old_description: None,
            posted: true,
        }
    }

    fn stored(id: &str, classification: Classification, file: &str) -> StoredTransaction {
        StoredTransaction::new(
            CanonicalTransaction::Checking(banking(id, classification, "Coffee")),
            Id::from_string(file),
        )
    }

    #[test]
    fn identical_incoming_is_a_no_op() {
        let existing = vec![stored("t1", Classification::FoodAndDrinks, "f1")];
        let result = reconcile(&existing, existing.clone());
        assert!(!result.has_changes());
        assert_eq!(result.unchanged, 1);
    }

    #[test]
    fn changed_classification_shifts_history() {
        let existing = vec![stored("t1", Classification::Other, "f1")];
        let incoming = vec![stored("t1", Classification::FoodAndDrinks, "f2")];

        let result = reconcile(&existing, incoming);
        assert!(result.to_insert.is_empty());
        assert_eq!(result.to_update.len(), 1);

        let updated = &result.to_update[0];
        assert_eq!(updated.source_file_id, Id::from_string("f1"));
        let tx = updated.transaction.as_banking().unwrap();
        assert_eq!(tx.classification, Classification::FoodAndDrinks);
        assert_eq!(tx.old_classification.as_deref(), Some("Other"));
        assert_eq!(tx.old_description, None);

        // Re-applying the same data against the updated record is a no-op.
        let again = reconcile(&result.to_update, vec![stored("t1", Classification::FoodAndDrinks, "f2")]);
        assert!(!again.has_changes());
    }

    #[test]
    fn changed_description_shifts_history() {
        let old = banking("t1", Classification::Other, "SQ *COFFEE");
        let new = banking("t1", Classification::Other, "Coffee Shop");
        let next = old.updated_with(&new);
        assert_eq!(next.description, "Coffee Shop");
        assert_eq!(next.old_description.as_deref(), Some("SQ *COFFEE"));
        assert_eq!(next.old_classification, None);
    }

    #[test]
    fn account_type_change_keeps_the_stored_record() {
        let mut current = banking("t1", Classification::Other, "Coffee");
        current.old_description = Some("SQ *COFFEE".to_string());
        let existing = vec![StoredTransaction::new(
            CanonicalTransaction::Checking(current),
            Id::from_string("f1"),
        )];
        let reshaped = StoredTransaction::new(
            CanonicalTransaction::Savings(banking("t1", Classification::Shopping, "Other")),
            Id::from_string("f2"),
        );

        let next = existing[0].updated_with(&reshaped);
        assert_eq!(next, existing[0]);
        let kept = next.transaction.as_banking().unwrap();
        assert_eq!(kept.old_description.as_deref(), Some("SQ *COFFEE"));

        let result = reconcile(&existing, vec![reshaped]);
        assert!(!result.has_changes());
        assert_eq!(result.unchanged, 1);
    }

    #[test]
    fn new_ids_are_inserted() {
        let existing = vec![stored("t1", Classification::Other, "f1")];
        let result = reconcile(&existing, vec![stored("t2", Classification::Other, "f2")]);
        assert_eq!(result.to_insert.len(), 1);
        assert_eq!(result.to_insert[0].source_file_id, Id::from_string("f2"));
    }

    #[test]
    fn dedupe_keeps_later_record_in_first_position() {
        let records = vec![
            stored("t1", Classification::Other, "f1"),
            stored("t2", Classification::Other, "f1"),
            stored("t1", Classification::Shopping, "f2"),
        ];
        let deduped = dedupe(records);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].transaction_id(), &Id::from_string("t1"));
        let first = deduped[0].transaction.as_banking().unwrap();
        assert_eq!(first.classification, Classification::Shopping);
        assert_eq!(first.old_classification.as_deref(), Some("Other"));
        assert_eq!(deduped[0].source_file_id, Id::from_string("f1"));
    }

    #[test]
    fn merge_is_associative_for_disjoint_collections() {
        let a = vec![stored("a1", Classification::Other, "fa"), stored("a2", Classification::Leisure, "fa")];
        let b = vec![stored("b1", Classification::Transport, "fb")];
        let c = vec![stored("c1", Classification::Shopping, "fc"), stored("c2", Classification::Other, "fc")];

        let left = merge(merge(a.clone(), b.clone()), c.clone());
        let right = merge(a, merge(b, c));
        assert_eq!(left, right);
        assert_eq!(left.len(), 5);
    }

    #[test]
    fn apply_replaces_inserts_and_deletes() {
        let records = vec![
            stored("t1", Classification::Other, "f1"),
            stored("t2", Classification::Other, "f1"),
        ];
        let changes = ReconciliationResult {
            to_insert: vec![stored("t3", Classification::Other, "f2")],
            to_update: vec![stored("t1", Classification::Leisure, "f1")],
            to_delete: vec![Id::from_string("t2")],
            unchanged: 0,
        };

        let next = apply(records, &changes);
        let ids: Vec<&str> = next.iter().map(|s| s.transaction_id().as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
        assert_eq!(
            next[0].transaction.as_banking().unwrap().classification,
            Classification::Leisure
        );
    }
}
