//! Refresh signal fanned out to every live component.
//!
//! The bus carries no payload: a handler only learns that fresh node data
//! should be pulled and fetches it itself. It is an ordinary value created at
//! startup and cloned into whoever needs it; every clone talks to the same
//! handler list.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct UpdateBus {
    registry: Arc<Mutex<Registry>>,
}

/// Keeps a handler registered for as long as it is alive.
///
/// A component holds its subscription next to the state the handler touches,
/// so tearing the component down unregisters the handler with it.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|reg| lock(&reg).handlers.iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(reg) = self.registry.upgrade() {
            drop(remove(&reg, self.id));
        }
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A panicking handler runs outside the lock, so the list itself is intact.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Takes a handler out of the list. The caller drops it after the lock is
/// released, since a handler may own subscriptions of its own.
fn remove(registry: &Mutex<Registry>, id: SubscriptionId) -> Option<Handler> {
    let mut reg = lock(registry);
    let pos = reg.handlers.iter().position(|(h, _)| *h == id)?;
    Some(reg.handlers.remove(pos).1)
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut reg = lock(&self.registry);
        let id = SubscriptionId(reg.next_id);
        reg.next_id += 1;

        if reg.closed {
            tracing::warn!(?id, "subscribe on a shut down update bus ignored");
            return Subscription {
                id,
                registry: Weak::new(),
            };
        }

        reg.handlers.push((id, Arc::new(handler)));
        tracing::debug!(?id, handlers = reg.handlers.len(), "handler subscribed");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a handler. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove(&self.registry, id).is_some()
    }

    /// Runs every registered handler once, in registration order, on the
    /// calling thread. Returns how many ran.
    ///
    /// Dispatch walks a copy of the handler list taken before the first call,
    /// so handlers may subscribe or unsubscribe freely while it runs.
    pub fn publish(&self) -> usize {
        let handlers: Vec<Handler> = lock(&self.registry)
            .handlers
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();

        for handler in &handlers {
            handler();
        }
        tracing::trace!(handlers = handlers.len(), "update published");
        handlers.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.registry).closed
    }

    /// Drops every handler and refuses new ones.
    pub fn shutdown(&self) {
        let mut reg = lock(&self.registry);
        reg.closed = true;
        let dropped = std::mem::take(&mut reg.handlers);
        drop(reg);
        tracing::info!(handlers = dropped.len(), "update bus shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder() -> (Log, impl Fn(&'static str) -> Box<dyn Fn() + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |name: &'static str| {
            let sink = Arc::clone(&sink);
            Box::new(move || sink.lock().unwrap().push(name)) as Box<dyn Fn() + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn handlers_run_once_in_registration_order() {
        let bus = UpdateBus::new();
        let (log, make) = recorder();
        let first = bus.subscribe(make("first"));
        let _second = bus.subscribe(make("second"));

        assert_eq!(bus.publish(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);

        assert!(bus.unsubscribe(first.id()));
        assert_eq!(bus.publish(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "second"]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = UpdateBus::new();
        let (log, make) = recorder();
        {
            let _scoped = bus.subscribe(make("scoped"));
            assert_eq!(bus.len(), 1);
        }
        assert!(bus.is_empty());
        assert_eq!(bus.publish(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = UpdateBus::new();
        let sub = bus.subscribe(|| {});
        assert!(sub.is_active());
        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));
        assert!(!sub.is_active());
    }

    #[test]
    fn unsubscribing_during_dispatch_is_safe() {
        let bus = UpdateBus::new();
        let (log, make) = recorder();

        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&victim);
        let _killer = bus.subscribe(move || {
            slot.lock().unwrap().take();
        });
        *victim.lock().unwrap() = Some(bus.subscribe(make("victim")));
        let _survivor = bus.subscribe(make("survivor"));

        // The round already underway still reaches every handler it started with.
        assert_eq!(bus.publish(), 3);
        assert_eq!(*log.lock().unwrap(), vec!["victim", "survivor"]);

        assert_eq!(bus.publish(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["victim", "survivor", "survivor"]);
    }

    #[test]
    fn clones_share_handlers() {
        let bus = UpdateBus::new();
        let other = bus.clone();
        let (log, make) = recorder();
        let _sub = other.subscribe(make("via clone"));
        bus.publish();
        assert_eq!(*log.lock().unwrap(), vec!["via clone"]);
    }

    #[test]
    fn shutdown_drops_and_refuses_handlers() {
        let bus = UpdateBus::new();
        let (log, make) = recorder();
        let early = bus.subscribe(make("early"));
        bus.shutdown();

        assert!(bus.is_closed());
        assert!(!early.is_active());
        let late = bus.subscribe(make("late"));
        assert!(!late.is_active());
        assert_eq!(bus.publish(), 0);
        assert!(log.lock().unwrap().is_empty());
    }
}
