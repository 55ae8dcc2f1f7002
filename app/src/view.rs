use lnw_core::formatting::{format_amount, format_timestamp};
use lnw_core::selection::project_selection;
use lnw_core::{InvoiceRecord, Snapshot};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

pub const HEADER: [&str; 4] = ["Expiration date", "Label", "Amount", "Status"];

/// Row/column view over the current snapshot.
#[derive(Default)]
pub struct InvoiceTable {
    rows: Arc<Snapshot>,
}

impl InvoiceTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        HEADER.len()
    }

    pub fn header(&self, col: usize) -> Option<&'static str> {
        HEADER.get(col).copied()
    }

    pub fn data(&self, row: usize, col: usize) -> Option<String> {
        let invoice = self.rows.get(row)?;
        match col {
            0 => Some(format_timestamp(&invoice.expiration_time)),
            1 => Some(invoice.label.clone()),
            2 => Some(format_amount(invoice.amount)),
            3 => Some(invoice.status.to_string()),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.rows
    }

    pub fn render(&self) -> String {
        let headers: Vec<&str> = (0..self.column_count())
            .filter_map(|col| self.header(col))
            .collect();
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        let cells: Vec<Vec<String>> = (0..self.row_count())
            .map(|row| {
                (0..self.column_count())
                    .map(|col| self.data(row, col).unwrap_or_default())
                    .collect()
            })
            .collect();
        for line in &cells {
            for (w, cell) in widths.iter_mut().zip(line) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let mut emit = |prefix: &str, fields: &[&str]| {
            let _ = write!(out, "{prefix:>4} ");
            for (field, &w) in fields.iter().zip(&widths) {
                let _ = write!(out, " {field:<w$} ");
            }
            out.push('\n');
        };
        emit("#", &headers);
        for (i, line) in cells.iter().enumerate() {
            let fields: Vec<&str> = line.iter().map(String::as_str).collect();
            emit(&i.to_string(), &fields);
        }
        out
    }
}

/// Text shown for the selected invoice. All fields are blank when nothing,
/// or more than one row, is selected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetailPane {
    pub expiration: String,
    pub label: String,
    pub amount: String,
    pub status: String,
}

impl DetailPane {
    pub fn show(&mut self, invoice: Option<&InvoiceRecord>) {
        *self = match invoice {
            Some(inv) => Self {
                expiration: format_timestamp(&inv.expiration_time),
                label: inv.label.clone(),
                amount: format_amount(inv.amount),
                status: inv.status.to_string(),
            },
            None => Self::default(),
        };
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    pub fn render(&self) -> String {
        format!(
            "Expiration date: {}\nLabel:           {}\nAmount:          {}\nStatus:          {}\n",
            self.expiration, self.label, self.amount, self.status
        )
    }
}

/// The invoices screen: table, current selection and detail pane.
#[derive(Default)]
pub struct InvoicesView {
    pub table: InvoiceTable,
    pub detail: DetailPane,
    selection: BTreeSet<usize>,
}

impl InvoicesView {
    /// Installs a new snapshot. Like any model reset this drops the row
    /// selection, since row numbers no longer mean the same invoices.
    pub fn reset(&mut self, snapshot: Arc<Snapshot>) {
        self.table.rows = snapshot;
        self.select_rows(BTreeSet::new());
    }

    pub fn select_rows(&mut self, rows: BTreeSet<usize>) {
        self.selection = rows;
        self.detail
            .show(project_selection(&self.selection, self.table.snapshot()));
    }

    pub fn selection(&self) -> &BTreeSet<usize> {
        &self.selection
    }
}
