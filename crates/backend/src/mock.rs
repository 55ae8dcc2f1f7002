use super::{BackendError, InvoiceBackend};
use async_trait::async_trait;
use chrono::Utc;
use lnw_core::models::WireMsat;
use lnw_core::RawInvoice;
use rand::{seq::SliceRandom, Rng};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};

/// In-memory node whose invoice list and failures are scripted by the caller.
#[derive(Default)]
pub struct MockBackend {
    invoices: RwLock<Vec<RawInvoice>>,
    failures_pending: AtomicUsize,
    calls: AtomicUsize,
    latency: Duration,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_invoices(invoices: Vec<RawInvoice>) -> Arc<Self> {
        Arc::new(Self {
            invoices: RwLock::new(invoices),
            ..Default::default()
        })
    }

    pub fn with_latency(invoices: Vec<RawInvoice>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            invoices: RwLock::new(invoices),
            latency,
            ..Default::default()
        })
    }

    pub async fn set_invoices(&self, invoices: Vec<RawInvoice>) {
        *self.invoices.write().await = invoices;
    }

    /// Makes the next `n` fetches fail as if the node were down.
    pub fn fail_next(&self, n: usize) {
        self.failures_pending.store(n, Ordering::SeqCst);
    }

    /// Number of `get_invoices` calls served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl InvoiceBackend for MockBackend {
    async fn get_invoices(&self) -> Result<Vec<RawInvoice>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            // simulate network latency
            sleep(self.latency).await;
        }
        if self.take_failure() {
            return Err(BackendError::NodeUnavailable("mock node offline".to_string()));
        }
        Ok(self.invoices.read().await.clone())
    }

    async fn check_connectivity(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Random but well-formed invoices for running the app without a node.
pub fn demo_invoices(count: usize) -> Vec<RawInvoice> {
    const LABELS: &[&str] = &["coffee", "rent", "donation", "pizza", "books", ""];
    const STATUSES: &[&str] = &["unpaid", "paid", "expired"];

    let mut rng = rand::thread_rng();
    let now = Utc::now().timestamp();
    (0..count)
        .map(|i| {
            let preimage: [u8; 32] = rng.gen();
            let label = LABELS.choose(&mut rng).copied().unwrap_or_default();
            RawInvoice {
                label: Some(format!("{label}-{i}")),
                status: STATUSES.choose(&mut rng).map(|s| s.to_string()),
                expires_at: Some(now + rng.gen_range(-86_400..86_400)),
                amount_msat: Some(WireMsat::Int(rng.gen_range(1..50_000) * 1_000)),
                payment_hash: Some(hex::encode(Sha256::digest(preimage))),
                bolt11: None,
                description: Some(format!("demo invoice {i}")),
            }
        })
        .collect()
}
