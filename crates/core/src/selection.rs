use std::collections::BTreeSet;

use crate::models::InvoiceRecord;
use crate::snapshot::Snapshot;

/// Collapses selected `(row, column)` cells into the set of selected rows.
pub fn rows_from_indexes<I>(cells: I) -> BTreeSet<usize>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    cells.into_iter().map(|(row, _col)| row).collect()
}

/// Record shown in the detail pane for the given row selection.
///
/// Exactly one selected row yields that row's record. No selection, a
/// multi-row selection, or a row the snapshot no longer has yields `None`,
/// and the detail pane is expected to blank itself.
pub fn project_selection<'a>(
    selected_rows: &BTreeSet<usize>,
    snapshot: &'a Snapshot,
) -> Option<&'a InvoiceRecord> {
    if selected_rows.len() != 1 {
        return None;
    }
    let row = *selected_rows.iter().next()?;
    let record = snapshot.get(row);
    if record.is_none() {
        tracing::warn!(
            row,
            rows = snapshot.len(),
            "selected row is past the end of the current snapshot"
        );
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::normalize;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn three() -> Snapshot {
        let at = |s| Utc.timestamp_opt(s, 0).unwrap();
        normalize(&[
            InvoiceRecord::new(at(3), "first", 1, "pending"),
            InvoiceRecord::new(at(2), "second", 2, "paid"),
            InvoiceRecord::new(at(1), "third", 3, "expired"),
        ])
    }

    #[test]
    fn single_row_projects_that_record() {
        let snap = three();
        let picked = project_selection(&BTreeSet::from([1]), &snap);
        assert_eq!(picked.map(|r| r.label.as_str()), Some("second"));
    }

    #[test]
    fn empty_or_multi_selection_projects_nothing() {
        let snap = three();
        assert!(project_selection(&BTreeSet::new(), &snap).is_none());
        assert!(project_selection(&BTreeSet::from([0, 2]), &snap).is_none());
    }

    #[test]
    fn stale_row_projects_nothing() {
        let snap = three();
        assert!(project_selection(&BTreeSet::from([3]), &snap).is_none());
        assert!(project_selection(&BTreeSet::from([0]), &Snapshot::empty()).is_none());
    }

    #[test]
    fn cells_of_one_row_count_once() {
        let rows = rows_from_indexes([(2, 0), (2, 1), (2, 2), (2, 3)]);
        assert_eq!(rows, BTreeSet::from([2]));
        let snap = three();
        assert_eq!(
            project_selection(&rows, &snap).map(|r| r.amount),
            Some(3)
        );
    }
}
