use backend::{BackendError, InvoiceBackend};
use lnw_core::parsing;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::bus::{Subscription, UpdateBus};
use crate::store::InvoiceStore;

/// Pulls the node's invoices into an [`InvoiceStore`] whenever the update bus
/// fires.
///
/// The bus handler only starts the work: the fetch runs as a task on the
/// runtime and the store update happens when it resolves, so a slow node never
/// holds up the other handlers. At most one fetch runs at a time; a trigger
/// arriving while one is in flight is dropped.
pub struct InvoiceSync {
    backend: Arc<dyn InvoiceBackend>,
    store: Arc<InvoiceStore>,
    in_flight: Arc<AtomicBool>,
    runtime: Handle,
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl InvoiceSync {
    pub fn new(
        backend: Arc<dyn InvoiceBackend>,
        store: Arc<InvoiceStore>,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            store,
            in_flight: Arc::new(AtomicBool::new(false)),
            runtime,
        })
    }

    pub fn store(&self) -> &Arc<InvoiceStore> {
        &self.store
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Registers [`trigger`](Self::trigger) on `bus` for as long as the
    /// returned subscription is held.
    pub fn attach(self: &Arc<Self>, bus: &UpdateBus) -> Subscription {
        let this = Arc::clone(self);
        bus.subscribe(move || {
            this.trigger();
        })
    }

    /// Starts a background refresh unless one is already running.
    pub fn trigger(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("invoice refresh already in flight, skipping trigger");
            return None;
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let this = Arc::clone(self);

        Some(self.runtime.spawn(async move {
            let _guard = guard;
            if let Err(e) = this.refresh().await {
                tracing::warn!(error = %e, "invoice refresh failed, keeping last snapshot");
            }
        }))
    }

    /// Fetches, converts and applies one invoice list. Returns whether the
    /// store changed. On error the store is left as it was.
    pub async fn refresh(&self) -> Result<bool, BackendError> {
        let raw = self.backend.get_invoices().await?;
        let fetched = raw.len();
        let parsed = parsing::into_records(raw);
        let changed = self.store.update(&parsed.records);
        tracing::debug!(
            fetched,
            rejected = parsed.rejected.len(),
            changed,
            "invoice refresh applied"
        );
        Ok(changed)
    }
}

/// Publishes on `bus` every `period` until the bus is shut down.
pub fn spawn_refresh_timer(bus: UpdateBus, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if bus.is_closed() {
                tracing::debug!("update bus closed, stopping refresh timer");
                break;
            }
            bus.publish();
        }
    })
}
