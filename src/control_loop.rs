use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::MissedTickBehavior;

use crate::gateway::ExecutionGateway;
use crate::state::ReferenceState;
use crate::strategy::{Decision, PositionBook, TradingSignal};
use crate::types::{Instrument, OrderAction, OrderTicket, SubscriptionId};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Periodic task driving one instrument: subscribes once the session is up,
/// then evaluates its signal on every poll where a reference price exists.
pub struct ControlLoop {
    system_id: String,
    state: Arc<ReferenceState>,
    instrument: Instrument,
    subscription_id: SubscriptionId,
    signal: Box<dyn TradingSignal>,
    book: PositionBook,
    subscribed: bool,
}

impl ControlLoop {
    pub fn new(
        system_id: impl Into<String>,
        state: Arc<ReferenceState>,
        instrument: Instrument,
        subscription_id: SubscriptionId,
        signal: Box<dyn TradingSignal>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            state,
            instrument,
            subscription_id,
            signal,
            book: PositionBook::new(),
            subscribed: false,
        }
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    /// Runs forever, one `tick` per interval. Ticks never overlap.
    pub async fn run(mut self, gateway: Arc<dyn ExecutionGateway>, poll_interval: Duration) {
        info!(
            "System {}: started on {} with {} every {:?}",
            self.system_id,
            self.instrument,
            self.signal.name(),
            poll_interval
        );
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick(gateway.as_ref()).await;
        }
    }

    pub async fn tick(&mut self, gateway: &dyn ExecutionGateway) {
        let price = self.state.price(self.subscription_id).await;

        // Request Market Data
        if price.is_none() && !self.subscribed && self.state.is_connected() {
            match gateway
                .subscribe_market_data(self.subscription_id, &self.instrument)
                .await
            {
                Ok(()) => {
                    self.subscribed = true;
                    info!(
                        "System {}: requested market data (id {})",
                        self.system_id, self.subscription_id
                    );
                }
                Err(e) => warn!("System {}: market data request failed: {}", self.system_id, e),
            }
        }

        let Some(price) = price else {
            debug!("System {}: waiting for market data", self.system_id);
            return;
        };

        info!("System {}: Trading Signal Call", self.system_id);
        let decision = self.signal.decide(&self.book, price);
        let Some(action) = decision.order_action() else {
            if let Decision::NoAction(reason) = decision {
                info!("System {}: {}", self.system_id, reason);
            }
            return;
        };

        // Send Order
        let order_id = self.state.allocate_order_id();
        let ticket = OrderTicket::market(action);
        if let Err(e) = gateway.submit_order(order_id, &self.instrument, &ticket).await {
            error!(
                "System {}: failed to submit {} order {}: {}",
                self.system_id, action, order_id, e
            );
        }

        self.book.apply(decision, order_id, price);
        let verb = match action {
            OrderAction::Buy => "Buy",
            OrderAction::Sell => "Sell",
        };
        info!(
            "System {}: {} Executed | OrderId: {} | Price: {:.2}",
            self.system_id, verb, order_id, price
        );
    }
}
