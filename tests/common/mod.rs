use async_trait::async_trait;
use tokio::sync::Mutex;

use profit_taker::types::{Instrument, OrderId, OrderTicket, SubscriptionId};
use profit_taker::{ExecutionGateway, GatewayError};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Subscribe(SubscriptionId, String),
    Submit(OrderId, OrderTicket),
}

/// Records every outbound request and accepts all of them.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
}

impl RecordingGateway {
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    pub async fn subscribe_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| matches!(call, GatewayCall::Subscribe(..)))
            .count()
    }

    pub async fn orders(&self) -> Vec<(OrderId, OrderTicket)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Submit(id, ticket) => Some((*id, *ticket)),
                GatewayCall::Subscribe(..) => None,
            })
            .collect()
    }
}

#[async_trait]
impl ExecutionGateway for RecordingGateway {
    async fn subscribe_market_data(
        &self,
        subscription_id: SubscriptionId,
        instrument: &Instrument,
    ) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .await
            .push(GatewayCall::Subscribe(subscription_id, instrument.symbol.clone()));
        Ok(())
    }

    async fn submit_order(
        &self,
        order_id: OrderId,
        _instrument: &Instrument,
        order: &OrderTicket,
    ) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .await
            .push(GatewayCall::Submit(order_id, *order));
        Ok(())
    }
}

pub fn nasdaq_future() -> Instrument {
    Instrument::new("NQ", "NQH1", "FUT", "GLOBEX", "USD")
}
