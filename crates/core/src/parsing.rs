use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{InvoiceRecord, InvoiceStatus, RawInvoice};
use crate::validation;

/// Body of a `listinvoices` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListInvoicesResponse {
    #[serde(default)]
    pub invoices: Vec<RawInvoice>,
}

pub fn parse_list_invoices(json: &str) -> Result<Vec<RawInvoice>> {
    let resp: ListInvoicesResponse =
        serde_json::from_str(json).context("Failed to parse listinvoices response")?;
    Ok(resp.invoices)
}

/// A single wire record that could not become an [`InvoiceRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invoice {} rejected: {}", .label.as_deref().unwrap_or("<unlabelled>"), .problems.join("; "))]
pub struct RecordError {
    pub label: Option<String>,
    pub problems: Vec<String>,
}

impl TryFrom<RawInvoice> for InvoiceRecord {
    type Error = RecordError;

    fn try_from(raw: RawInvoice) -> Result<Self, Self::Error> {
        let reject = |raw: &RawInvoice, problems: Vec<String>| RecordError {
            label: raw.label.clone(),
            problems,
        };

        validation::validate(&raw).map_err(|problems| reject(&raw, problems))?;

        let expiration_time = raw
            .expiration_time()
            .ok_or_else(|| reject(&raw, vec!["expires_at is out of range".into()]))?;
        let amount = match &raw.amount_msat {
            Some(wire) => wire
                .to_msat()
                .ok_or_else(|| reject(&raw, vec!["amount_msat is unreadable".into()]))?,
            None => 0,
        };

        let RawInvoice { label, status, .. } = raw;
        Ok(InvoiceRecord {
            expiration_time,
            label: label.unwrap_or_default(),
            amount,
            status: InvoiceStatus::new(status.unwrap_or_default()),
        })
    }
}

/// Result of converting a fetched batch: the usable records in fetch order and
/// one error per record that was dropped.
#[derive(Debug, Clone, Default)]
pub struct ParsedInvoices {
    pub records: Vec<InvoiceRecord>,
    pub rejected: Vec<RecordError>,
}

/// Converts every wire record it can. A bad record never aborts the batch.
pub fn into_records(raw: Vec<RawInvoice>) -> ParsedInvoices {
    let mut out = ParsedInvoices::default();
    for item in raw {
        match InvoiceRecord::try_from(item) {
            Ok(rec) => out.records.push(rec),
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed invoice record");
                out.rejected.push(err);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const LISTINVOICES: &str = r#"{
        "invoices": [
            {
                "label": "coffee",
                "bolt11": "lnbcrt50u1p...",
                "payment_hash": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
                "amount_msat": 5000000,
                "status": "unpaid",
                "description": "one flat white",
                "expires_at": 1700000600
            },
            {
                "label": "legacy",
                "msatoshi": 1000,
                "amount_msat": "1000msat",
                "status": "paid",
                "expires_at": 1700000000
            },
            {
                "label": "broken",
                "status": "unpaid"
            },
            {
                "label": "donation",
                "status": "expired",
                "expires_at": 1600000000
            }
        ]
    }"#;

    #[test]
    fn parses_listinvoices_body() {
        let raw = parse_list_invoices(LISTINVOICES).unwrap();
        assert_eq!(raw.len(), 4);
        assert_eq!(raw[0].label.as_deref(), Some("coffee"));
        assert_eq!(raw[1].amount_msat.as_ref().and_then(|a| a.to_msat()), Some(1000));
    }

    #[test]
    fn malformed_record_is_dropped_rest_survive() {
        let parsed = into_records(parse_list_invoices(LISTINVOICES).unwrap());

        let labels: Vec<&str> = parsed.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["coffee", "legacy", "donation"]);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].label.as_deref(), Some("broken"));
    }

    #[test]
    fn amountless_invoice_has_zero_amount() {
        let parsed = into_records(parse_list_invoices(LISTINVOICES).unwrap());
        let donation = &parsed.records[2];
        assert_eq!(donation.amount, 0);
        assert_eq!(
            donation.expiration_time,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap()
        );
        assert_eq!(donation.status.as_str(), "expired");
    }

    #[test]
    fn record_error_names_the_invoice() {
        let err = InvoiceRecord::try_from(RawInvoice {
            label: Some("x".into()),
            ..Default::default()
        })
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invoice x rejected"), "{msg}");
        assert!(msg.contains("status is missing"), "{msg}");
    }

    #[test]
    fn empty_body_yields_no_invoices() {
        assert!(parse_list_invoices("{}").unwrap().is_empty());
        assert!(parse_list_invoices("not json").is_err());
    }
}
