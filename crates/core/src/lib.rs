pub mod formatting;
pub mod models;
pub mod parsing;
pub mod selection;
pub mod snapshot;
pub mod validation;

pub use models::{InvoiceRecord, InvoiceStatus, RawInvoice};
pub use snapshot::Snapshot;
