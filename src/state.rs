use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::{debug, info};
use tokio::sync::RwLock;

use crate::types::{OrderId, SubscriptionId, TickKind};

/// Connection and reference data shared by every control loop and the
/// gateway event dispatcher.
///
/// Each field is synchronized on its own: the flag and the order-id counter
/// are atomics, the price map sits behind an async `RwLock`.
#[derive(Debug, Default)]
pub struct ReferenceState {
    connected: AtomicBool,
    next_order_id: AtomicU64,
    reference_prices: RwLock<HashMap<SubscriptionId, f64>>,
}

impl ReferenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_connected(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!("[Connected]");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Seeds the counter with the venue's next valid id. A seed below the
    /// current value is ignored so ids already handed out are never reissued.
    pub fn seed_order_id(&self, order_id: OrderId) {
        let previous = self.next_order_id.fetch_max(order_id, Ordering::SeqCst);
        if previous > order_id {
            debug!("Ignoring order id seed {} below current {}", order_id, previous);
        } else {
            info!("Order id counter seeded at {}", order_id);
        }
    }

    pub fn allocate_order_id(&self) -> OrderId {
        self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last_order_id(&self) -> OrderId {
        self.next_order_id.load(Ordering::SeqCst)
    }

    /// Stores `price` for `subscription_id` when the tick is a last-trade tick.
    /// Other tick kinds are dropped here.
    pub async fn record_price(&self, subscription_id: SubscriptionId, kind: TickKind, price: f64) {
        if kind != TickKind::Last {
            return;
        }
        self.reference_prices
            .write()
            .await
            .insert(subscription_id, price);
    }

    /// Last trade price for the subscription, or `None` while no usable
    /// price has arrived. Non-positive prices count as no data.
    pub async fn price(&self, subscription_id: SubscriptionId) -> Option<f64> {
        self.reference_prices
            .read()
            .await
            .get(&subscription_id)
            .copied()
            .filter(|price| *price > 0.0)
    }
}
