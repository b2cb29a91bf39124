use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::control_loop::ControlLoop;
use crate::gateway::{ExecutionGateway, GatewayEvent};
use crate::state::ReferenceState;
use crate::strategy::SignalKind;
use crate::types::{Instrument, SubscriptionId};

/// One registry entry: everything needed to build a control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingSystemConfig {
    pub system_id: String,
    pub subscription_id: SubscriptionId,
    pub instrument: Instrument,
    pub signal: SignalKind,
}

/// Composition root: owns the shared reference state and the control loops
/// built from the registry, starts them, then pumps gateway events.
pub struct Supervisor {
    state: Arc<ReferenceState>,
    loops: Vec<ControlLoop>,
    poll_interval: Duration,
}

impl Supervisor {
    pub fn new(systems: Vec<TradingSystemConfig>, poll_interval: Duration) -> Self {
        let state = Arc::new(ReferenceState::new());
        let loops = systems
            .into_iter()
            .map(|system| {
                ControlLoop::new(
                    system.system_id,
                    Arc::clone(&state),
                    system.instrument,
                    system.subscription_id,
                    system.signal.build(),
                )
            })
            .collect();
        Self {
            state,
            loops,
            poll_interval,
        }
    }

    pub fn state(&self) -> Arc<ReferenceState> {
        Arc::clone(&self.state)
    }

    pub fn spawn_loops(&mut self, gateway: Arc<dyn ExecutionGateway>) -> Vec<JoinHandle<()>> {
        let poll_interval = self.poll_interval;
        self.loops
            .drain(..)
            .map(|control_loop| {
                info!("Starting system {}", control_loop.system_id());
                let gateway = Arc::clone(&gateway);
                tokio::spawn(control_loop.run(gateway, poll_interval))
            })
            .collect()
    }

    /// Starts the loops and dispatches inbound events until the gateway's
    /// event stream closes, which only happens when every session is gone.
    pub async fn run(
        mut self,
        gateway: Arc<dyn ExecutionGateway>,
        mut events: mpsc::Receiver<GatewayEvent>,
    ) -> anyhow::Result<()> {
        let handles = self.spawn_loops(gateway);

        while let Some(event) = events.recv().await {
            dispatch_event(&self.state, event).await;
        }

        for handle in handles {
            handle.abort();
        }
        anyhow::bail!("gateway event stream closed")
    }
}

pub async fn dispatch_event(state: &ReferenceState, event: GatewayEvent) {
    match event {
        GatewayEvent::SessionAcknowledged => state.mark_connected(),
        GatewayEvent::NextValidId(order_id) => state.seed_order_id(order_id),
        GatewayEvent::PriceTick {
            subscription_id,
            kind,
            price,
        } => state.record_price(subscription_id, kind, price).await,
        GatewayEvent::Error { code, message } => error!("Venue error {}: {}", code, message),
    }
}
