//! Keeps a normalized copy of the node's invoices in step with the backend.

mod bus;
mod refresh;
mod store;

pub use bus::{Subscription, SubscriptionId, UpdateBus};
pub use refresh::{spawn_refresh_timer, InvoiceSync};
pub use store::InvoiceStore;
