//! FIX 4.4 venue gateway: one TLS session for market data and one for
//! order entry, both logged on with an Ed25519-signed Logon.

pub mod auth;
pub mod codec;
pub mod message;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use tokio::sync::mpsc;

use crate::config::VenueConfig;
use crate::gateway::{ExecutionGateway, GatewayError, GatewayEvent};
use crate::types::{Instrument, OrderId, OrderTicket, SubscriptionId};

use self::session::{Credentials, SessionHandle, SessionRole};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct FixGateway {
    market_data: SessionHandle,
    order_entry: SessionHandle,
}

impl FixGateway {
    /// Opens both sessions. The returned receiver yields inbound events and
    /// closes once both sessions have ended.
    pub async fn connect(config: &VenueConfig) -> anyhow::Result<(Self, mpsc::Receiver<GatewayEvent>)> {
        let credentials = Arc::new(Credentials {
            target_comp_id: config.target_comp_id.clone(),
            api_key: config.api_key.clone(),
            signing_key: auth::load_signing_key(&config.private_key_base64)?,
        });
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let order_entry = session::open_session(
            SessionRole::OrderEntry {
                order_id_seed: config.order_id_seed,
            },
            &config.order_entry_hostname,
            config.port,
            Arc::clone(&credentials),
            events_tx.clone(),
        )
        .await?;
        let market_data = session::open_session(
            SessionRole::MarketData,
            &config.market_data_hostname,
            config.port,
            credentials,
            events_tx,
        )
        .await?;

        info!(
            "FIX gateway connecting (md: {}, oe: {})",
            config.market_data_hostname, config.order_entry_hostname
        );
        Ok((
            Self {
                market_data,
                order_entry,
            },
            events_rx,
        ))
    }
}

#[async_trait]
impl ExecutionGateway for FixGateway {
    async fn subscribe_market_data(
        &self,
        subscription_id: SubscriptionId,
        instrument: &Instrument,
    ) -> Result<(), GatewayError> {
        self.market_data
            .send(message::market_data_request(subscription_id, instrument))
    }

    async fn submit_order(
        &self,
        order_id: OrderId,
        instrument: &Instrument,
        order: &OrderTicket,
    ) -> Result<(), GatewayError> {
        info!(
            "Sending NewOrderSingle | ClOrdID: {} | {} {} {}",
            order_id, order.action, order.quantity, instrument.symbol
        );
        self.order_entry
            .send(message::new_order_single(order_id, instrument, order))
    }
}
