use crate::models::RawInvoice;

pub fn required_fields(raw: &RawInvoice) -> Result<(), Vec<String>> {
    let mut errs = Vec::new();

    if raw.label.is_none() {
        errs.push("label is missing".to_string());
    }

    match raw.status.as_deref() {
        None => errs.push("status is missing".to_string()),
        Some(s) if s.trim().is_empty() => errs.push("status is empty".to_string()),
        Some(_) => {}
    }

    if raw.expires_at.is_none() {
        errs.push("expires_at is missing".to_string());
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}

pub fn well_formed_fields(raw: &RawInvoice) -> Result<(), Vec<String>> {
    let mut errs = Vec::new();

    if raw.expires_at.is_some() && raw.expiration_time().is_none() {
        errs.push("expires_at is out of range".to_string());
    }

    // An absent amount is an "any amount" invoice; a present one must parse.
    if let Some(amount) = &raw.amount_msat {
        if amount.to_msat().is_none() {
            errs.push(format!("amount_msat is not a millisatoshi value: {amount:?}"));
        }
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}
