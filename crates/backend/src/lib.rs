use async_trait::async_trait;
use lnw_core::RawInvoice;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("lightning node unavailable: {0}")]
    NodeUnavailable(String),
    #[error("rpc {method} failed with status {status}: {body}")]
    Rpc {
        method: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode {method} response: {reason}")]
    Decode { method: String, reason: String },
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("tls setup failed: {0}")]
    Tls(String),
}

/// Source of the node's current invoice list.
///
/// Calls may block on the network and may fail; a failed fetch means "no
/// update this cycle" to the caller, never a reason to clear what it holds.
#[async_trait]
pub trait InvoiceBackend: Send + Sync {
    async fn get_invoices(&self) -> Result<Vec<RawInvoice>, BackendError>;
    async fn check_connectivity(&self) -> Result<(), BackendError>;
}

pub mod lightningd;
pub mod mock;
