pub mod fix;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Instrument, OrderId, OrderTicket, SubscriptionId, TickKind};

pub use fix::FixGateway;

/// Inbound callbacks from the venue, delivered to the supervisor's
/// dispatch loop over a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    SessionAcknowledged,
    NextValidId(OrderId),
    PriceTick {
        subscription_id: SubscriptionId,
        kind: TickKind,
        price: f64,
    },
    Error {
        code: i32,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0} session is closed")]
    SessionClosed(&'static str),
}

/// Outbound half of the execution venue. Both calls are fire-and-forget:
/// `Ok` means the request was handed to the session, not that the venue
/// accepted it.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn subscribe_market_data(
        &self,
        subscription_id: SubscriptionId,
        instrument: &Instrument,
    ) -> Result<(), GatewayError>;

    async fn submit_order(
        &self,
        order_id: OrderId,
        instrument: &Instrument,
        order: &OrderTicket,
    ) -> Result<(), GatewayError>;
}
