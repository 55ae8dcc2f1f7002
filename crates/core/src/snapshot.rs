//! Normalized, ordered view of the node's invoices.

use serde::Serialize;
use std::ops::Deref;

use crate::models::InvoiceRecord;

/// Invoices ordered newest expiration first.
///
/// Only [`normalize`] builds a non-empty snapshot, so the ordering always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    records: Vec<InvoiceRecord>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[InvoiceRecord] {
        &self.records
    }
}

impl Deref for Snapshot {
    type Target = [InvoiceRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a InvoiceRecord;
    type IntoIter = std::slice::Iter<'a, InvoiceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Copies `raw`, sorts it by expiration ascending and reverses the result.
///
/// The sort is stable and the reverse covers the whole sequence, so records
/// sharing an expiration time come out in the reverse of their input order.
/// That is not the same as a descending sort, which would keep input order
/// inside each tie group.
pub fn normalize(raw: &[InvoiceRecord]) -> Snapshot {
    let mut records = raw.to_vec();
    records.sort_by_key(|r| r.expiration_time);
    records.reverse();
    Snapshot { records }
}

/// Index-by-index structural comparison.
pub fn equals(a: &Snapshot, b: &Snapshot) -> bool {
    a.records == b.records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn rec(exp: i64, label: &str) -> InvoiceRecord {
        InvoiceRecord::new(Utc.timestamp_opt(exp, 0).unwrap(), label, 100, "pending")
    }

    fn labels(s: &Snapshot) -> Vec<&str> {
        s.iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn ties_come_out_in_reverse_input_order() {
        let raw = vec![rec(5, "A"), rec(5, "B"), rec(3, "C")];
        assert_eq!(labels(&normalize(&raw)), vec!["B", "A", "C"]);
    }

    #[test]
    fn newest_expiration_first() {
        let raw = vec![rec(1, "old"), rec(30, "new"), rec(10, "mid")];
        assert_eq!(labels(&normalize(&raw)), vec!["new", "mid", "old"]);
    }

    #[test]
    fn input_is_left_untouched() {
        let raw = vec![rec(1, "a"), rec(2, "b")];
        let before = raw.clone();
        let _ = normalize(&raw);
        assert_eq!(raw, before);
    }

    #[test]
    fn empty_input_gives_empty_snapshot() {
        let snap = normalize(&[]);
        assert!(snap.is_empty());
        assert!(equals(&snap, &Snapshot::empty()));
    }

    #[test]
    fn order_matters_for_equality() {
        let a = normalize(&[rec(1, "x"), rec(2, "y")]);
        let b = Snapshot {
            records: a.iter().rev().cloned().collect(),
        };
        assert!(!equals(&a, &b));
    }

    #[test]
    fn duplicate_labels_are_kept() {
        let snap = normalize(&[rec(1, "same"), rec(2, "same")]);
        assert_eq!(snap.len(), 2);
    }

    fn arb_records() -> impl Strategy<Value = Vec<InvoiceRecord>> {
        proptest::collection::vec((0i64..20, "[a-d]{0,2}"), 0..40).prop_map(|items| {
            items
                .into_iter()
                .map(|(exp, label)| rec(exp, &label))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn output_is_non_increasing(raw in arb_records()) {
            let snap = normalize(&raw);
            prop_assert_eq!(snap.len(), raw.len());
            for pair in snap.windows(2) {
                prop_assert!(pair[0].expiration_time >= pair[1].expiration_time);
            }
        }

        #[test]
        fn ties_follow_reverse_input_order(raw in arb_records()) {
            // Tag each record with its input position through a unique label.
            let tagged: Vec<InvoiceRecord> = raw
                .iter()
                .enumerate()
                .map(|(i, r)| InvoiceRecord { label: i.to_string(), ..r.clone() })
                .collect();
            let snap = normalize(&tagged);
            for pair in snap.windows(2) {
                if pair[0].expiration_time == pair[1].expiration_time {
                    let first: usize = pair[0].label.parse().unwrap();
                    let second: usize = pair[1].label.parse().unwrap();
                    prop_assert!(first > second);
                }
            }
        }

        #[test]
        fn normalization_is_reflexive(raw in arb_records()) {
            prop_assert!(equals(&normalize(&raw), &normalize(&raw)));
        }
    }
}
