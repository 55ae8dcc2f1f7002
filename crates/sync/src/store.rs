use lnw_core::snapshot::{self, Snapshot};
use lnw_core::InvoiceRecord;
use std::sync::Arc;
use tokio::sync::watch;

/// Holds the current invoice snapshot and tells observers when it changes.
///
/// The snapshot lives behind one shared pointer that `update` swaps in a
/// single step, so a reader sees either the old list or the new one. A change
/// always means "everything may have moved": observers re-read the whole
/// snapshot instead of patching rows.
pub struct InvoiceStore {
    current: watch::Sender<Arc<Snapshot>>,
}

impl Default for InvoiceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(Arc::new(Snapshot::empty()));
        Self { current }
    }

    pub fn get(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.borrow())
    }

    /// Normalizes `raw` and installs it if it differs from what is held.
    ///
    /// Returns `true` when the snapshot was replaced and observers were woken.
    /// On `false` the held snapshot is the same allocation as before.
    pub fn update(&self, raw: &[InvoiceRecord]) -> bool {
        let next = snapshot::normalize(raw);
        let changed = self.current.send_if_modified(|held| {
            if snapshot::equals(&**held, &next) {
                return false;
            }
            *held = Arc::new(next);
            true
        });
        if changed {
            tracing::debug!(rows = raw.len(), "invoice snapshot replaced");
        }
        changed
    }

    /// Receiver that wakes once per real change. The value seen on
    /// subscription counts as already observed.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.current.subscribe()
    }
}
