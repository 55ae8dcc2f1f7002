mod rules;

use crate::models::RawInvoice;

/// Checks that a wire record carries every field an [`InvoiceRecord`] needs.
///
/// [`InvoiceRecord`]: crate::models::InvoiceRecord
pub fn validate(raw: &RawInvoice) -> Result<(), Vec<String>> {
    let mut errs = Vec::new();
    if let Err(mut re) = rules::required_fields(raw) {
        errs.append(&mut re);
    }
    if let Err(mut re) = rules::well_formed_fields(raw) {
        errs.append(&mut re);
    }
    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}
