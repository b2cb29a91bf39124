use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ed25519_dalek::SigningKey;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_native_tls::{TlsConnector, TlsStream};
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::gateway::fix::auth::logon_raw_data;
use crate::gateway::fix::codec::FixCodec;
use crate::gateway::fix::message::{
    self, printable, CompIds, FixMessage, Inbound, HEARTBEAT_INTERVAL_SECS,
};
use crate::gateway::{GatewayError, GatewayEvent};
use crate::types::{OrderId, SubscriptionId};

/// Which venue session this is. Only order entry reports connectivity and
/// seeds order ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    MarketData,
    OrderEntry { order_id_seed: OrderId },
}

impl SessionRole {
    pub fn label(&self) -> &'static str {
        match self {
            SessionRole::MarketData => "market data",
            SessionRole::OrderEntry { .. } => "order entry",
        }
    }
}

pub struct Credentials {
    pub target_comp_id: String,
    pub api_key: String,
    pub signing_key: SigningKey,
}

/// Outbound side of a running session. Messages queue until logon.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    label: &'static str,
    outbound: mpsc::UnboundedSender<FixMessage>,
}

impl SessionHandle {
    pub fn send(&self, message: FixMessage) -> Result<(), GatewayError> {
        self.outbound
            .send(message)
            .map_err(|_| GatewayError::SessionClosed(self.label))
    }
}

pub async fn connect_fix_endpoint(
    hostname: &str,
    port: u16,
) -> anyhow::Result<Framed<TlsStream<TcpStream>, FixCodec>> {
    let tcp = TcpStream::connect((hostname, port)).await?;
    let connector = native_tls::TlsConnector::builder().build()?;
    let tls = TlsConnector::from(connector);
    let stream = tls.connect(hostname, tcp).await?;
    Ok(Framed::new(stream, FixCodec))
}

pub async fn open_session(
    role: SessionRole,
    hostname: &str,
    port: u16,
    credentials: Arc<Credentials>,
    events: mpsc::Sender<GatewayEvent>,
) -> anyhow::Result<SessionHandle> {
    let framed = connect_fix_endpoint(hostname, port)
        .await
        .with_context(|| format!("connecting {} session to {}:{}", role.label(), hostname, port))?;
    Ok(spawn_session(role, framed, credentials, events))
}

pub fn spawn_session<T>(
    role: SessionRole,
    framed: Framed<T, FixCodec>,
    credentials: Arc<Credentials>,
    events: mpsc::Sender<GatewayEvent>,
) -> SessionHandle
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let label = role.label();
    let session = Session {
        role,
        framed,
        comp_ids: CompIds {
            sender: Uuid::new_v4().simple().to_string()[..8].to_string(),
            target: credentials.target_comp_id.clone(),
        },
        seq_num: 1,
        logged_on: false,
        events,
    };

    tokio::spawn(async move {
        if let Err(e) = session.run(&credentials, outbound_rx).await {
            error!("FIX {} session failed: {:#}", label, e);
        }
        info!("FIX {} session ended", label);
    });

    SessionHandle {
        label,
        outbound: outbound_tx,
    }
}

enum Flow {
    Continue,
    LoggedOn,
    Close,
}

struct Session<T> {
    role: SessionRole,
    framed: Framed<T, FixCodec>,
    comp_ids: CompIds,
    seq_num: u64,
    logged_on: bool,
    events: mpsc::Sender<GatewayEvent>,
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(
        mut self,
        credentials: &Credentials,
        mut outbound: mpsc::UnboundedReceiver<FixMessage>,
    ) -> anyhow::Result<()> {
        self.logon(credentials).await?;

        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = self.framed.next() => {
                    let line = match frame {
                        Some(line) => line?,
                        None => {
                            info!("FIX {} stream closed by venue", self.role.label());
                            return Ok(());
                        }
                    };
                    debug!("Received: {}", printable(&line));
                    match self.handle(&line).await? {
                        Flow::Continue => {}
                        Flow::LoggedOn => heartbeat.reset(),
                        Flow::Close => return Ok(()),
                    }
                }
                Some(msg) = outbound.recv(), if self.logged_on => {
                    self.send(msg).await?;
                }
                _ = heartbeat.tick(), if self.logged_on => {
                    self.send(message::heartbeat(None)).await?;
                }
            }
        }
    }

    async fn logon(&mut self, credentials: &Credentials) -> anyhow::Result<()> {
        let sending_time = message::sending_time();
        let raw_data = logon_raw_data(
            &credentials.signing_key,
            &self.comp_ids,
            self.seq_num,
            &sending_time,
        );
        let logon = message::logon(&raw_data, &credentials.api_key).encode(
            &self.comp_ids,
            self.seq_num,
            &sending_time,
        );
        debug!("Sending {} Logon: {}", self.role.label(), printable(&logon));
        self.framed.send(logon).await?;
        self.seq_num += 1;
        info!("Sent {} logon", self.role.label());
        Ok(())
    }

    async fn send(&mut self, msg: FixMessage) -> anyhow::Result<()> {
        let encoded = msg.encode(&self.comp_ids, self.seq_num, &message::sending_time());
        debug!("Sending: {}", printable(&encoded));
        self.framed.send(encoded).await?;
        self.seq_num += 1;
        Ok(())
    }

    async fn emit(&mut self, event: GatewayEvent) -> anyhow::Result<()> {
        self.events
            .send(event)
            .await
            .context("gateway event receiver dropped")
    }

    async fn handle(&mut self, line: &str) -> anyhow::Result<Flow> {
        let Some(inbound) = Inbound::parse(line) else {
            warn!("Dropping FIX message without MsgType: {}", printable(line));
            return Ok(Flow::Continue);
        };

        match inbound {
            Inbound::Logon => {
                self.logged_on = true;
                info!("FIX {} logon successful", self.role.label());
                if let SessionRole::OrderEntry { order_id_seed } = self.role {
                    self.emit(GatewayEvent::NextValidId(order_id_seed)).await?;
                    self.emit(GatewayEvent::SessionAcknowledged).await?;
                }
                return Ok(Flow::LoggedOn);
            }
            Inbound::Heartbeat => debug!("Received {} heartbeat", self.role.label()),
            Inbound::TestRequest { test_req_id } => {
                self.send(message::heartbeat(test_req_id.as_deref())).await?;
                debug!("Answered {} TestRequest", self.role.label());
            }
            Inbound::Logout { text } => {
                info!(
                    "FIX {} logout received: {}",
                    self.role.label(),
                    text.as_deref().unwrap_or("no reason given")
                );
                return Ok(Flow::Close);
            }
            Inbound::MarketData { req_id, entries } => {
                let Some(subscription_id) = req_id
                    .as_deref()
                    .and_then(|id| id.parse::<SubscriptionId>().ok())
                else {
                    debug!("Market data for unknown MDReqID {:?}", req_id);
                    return Ok(Flow::Continue);
                };
                for entry in entries {
                    self.emit(GatewayEvent::PriceTick {
                        subscription_id,
                        kind: entry.kind,
                        price: entry.price,
                    })
                    .await?;
                }
            }
            Inbound::ExecutionReport {
                cl_ord_id,
                exec_type,
                ord_status,
                text,
                error_code,
            } => {
                if exec_type == "8" {
                    self.emit(GatewayEvent::Error {
                        code: error_code.unwrap_or(0),
                        message: format!(
                            "Order {} rejected: {}",
                            cl_ord_id,
                            text.unwrap_or_default()
                        ),
                    })
                    .await?;
                } else {
                    info!(
                        "ExecutionReport | ClOrdID: {} | ExecType: {} | OrdStatus: {}",
                        cl_ord_id, exec_type, ord_status
                    );
                }
            }
            Inbound::Reject { text, error_code } => {
                self.emit(GatewayEvent::Error {
                    code: error_code.unwrap_or(0),
                    message: text.unwrap_or_else(|| "message rejected".to_string()),
                })
                .await?;
            }
            Inbound::Other(msg_type) => info!("Received message type: {}", msg_type),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fix::message::extract_field;
    use crate::types::{Instrument, TickKind};
    use tokio::io::DuplexStream;

    fn credentials() -> Arc<Credentials> {
        Arc::new(Credentials {
            target_comp_id: "SPOT".to_string(),
            api_key: "api-key".to_string(),
            signing_key: SigningKey::from_bytes(&[3u8; 32]),
        })
    }

    fn venue_says(msg_type: &'static str) -> String {
        let venue = CompIds {
            sender: "SPOT".to_string(),
            target: "client".to_string(),
        };
        FixMessage::new(msg_type).encode(&venue, 1, "t")
    }

    async fn expect_frame(venue: &mut Framed<DuplexStream, FixCodec>) -> String {
        venue.next().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn order_entry_logon_seeds_and_acknowledges() {
        let (client, server) = tokio::io::duplex(4096);
        let mut venue = Framed::new(server, FixCodec);
        let (events_tx, mut events) = mpsc::channel(16);
        let handle = spawn_session(
            SessionRole::OrderEntry { order_id_seed: 1000 },
            Framed::new(client, FixCodec),
            credentials(),
            events_tx,
        );

        // Queued before logon; must not be written until the venue acks.
        handle
            .send(message::new_order_single(
                1001,
                &Instrument::new("BTCUSDT", "BTCUSDT", "CRYPTO", "BINANCE", "USDT"),
                &crate::types::OrderTicket::market(crate::types::OrderAction::Buy),
            ))
            .unwrap();

        let logon = expect_frame(&mut venue).await;
        assert_eq!(extract_field(&logon, "35"), Some("A"));
        assert_eq!(extract_field(&logon, "34"), Some("1"));
        assert_eq!(extract_field(&logon, "553"), Some("api-key"));

        venue.send(venue_says("A")).await.unwrap();
        assert_eq!(events.recv().await, Some(GatewayEvent::NextValidId(1000)));
        assert_eq!(events.recv().await, Some(GatewayEvent::SessionAcknowledged));

        let order = expect_frame(&mut venue).await;
        assert_eq!(extract_field(&order, "35"), Some("D"));
        assert_eq!(extract_field(&order, "34"), Some("2"));
        assert_eq!(extract_field(&order, "11"), Some("1001"));
    }

    #[tokio::test]
    async fn market_data_becomes_price_ticks() {
        let (client, server) = tokio::io::duplex(4096);
        let mut venue = Framed::new(server, FixCodec);
        let (events_tx, mut events) = mpsc::channel(16);
        let _handle = spawn_session(
            SessionRole::MarketData,
            Framed::new(client, FixCodec),
            credentials(),
            events_tx,
        );

        expect_frame(&mut venue).await;
        venue.send(venue_says("A")).await.unwrap();

        let venue_ids = CompIds {
            sender: "SPOT".to_string(),
            target: "client".to_string(),
        };
        let trade = FixMessage::new("X")
            .field(262, 1000)
            .field(268, 1)
            .field(279, 0)
            .field(269, 2)
            .field(270, 50.0)
            .encode(&venue_ids, 2, "t");
        venue.send(trade).await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(GatewayEvent::PriceTick {
                subscription_id: 1000,
                kind: TickKind::Last,
                price: 50.0,
            })
        );
    }

    async fn logged_on_market_data_session() -> (
        Framed<DuplexStream, FixCodec>,
        mpsc::Receiver<GatewayEvent>,
        SessionHandle,
    ) {
        let (client, server) = tokio::io::duplex(4096);
        let mut venue = Framed::new(server, FixCodec);
        let (events_tx, events) = mpsc::channel(16);
        let handle = spawn_session(
            SessionRole::MarketData,
            Framed::new(client, FixCodec),
            credentials(),
            events_tx,
        );
        expect_frame(&mut venue).await;
        venue.send(venue_says("A")).await.unwrap();
        (venue, events, handle)
    }

    #[tokio::test]
    async fn rejects_become_error_events() {
        let (mut venue, mut events, _handle) = logged_on_market_data_session().await;
        let venue_ids = CompIds {
            sender: "SPOT".to_string(),
            target: "client".to_string(),
        };

        let session_reject = FixMessage::new("3")
            .field(45, 2)
            .field(58, "bad tag")
            .encode(&venue_ids, 2, "t");
        let business_reject = FixMessage::new("j")
            .field(58, "too many requests")
            .field(25016, -1013)
            .encode(&venue_ids, 3, "t");
        let rejected_order = FixMessage::new("8")
            .field(11, 1001)
            .field(150, 8)
            .field(39, 8)
            .field(58, "Insufficient balance")
            .encode(&venue_ids, 4, "t");
        for frame in [session_reject, business_reject, rejected_order] {
            venue.send(frame).await.unwrap();
        }

        assert_eq!(
            events.recv().await,
            Some(GatewayEvent::Error {
                code: 0,
                message: "bad tag".to_string(),
            })
        );
        assert_eq!(
            events.recv().await,
            Some(GatewayEvent::Error {
                code: -1013,
                message: "too many requests".to_string(),
            })
        );
        assert_eq!(
            events.recv().await,
            Some(GatewayEvent::Error {
                code: 0,
                message: "Order 1001 rejected: Insufficient balance".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn accepted_execution_report_emits_nothing() {
        let (mut venue, mut events, _handle) = logged_on_market_data_session().await;
        let venue_ids = CompIds {
            sender: "SPOT".to_string(),
            target: "client".to_string(),
        };

        let accepted = FixMessage::new("8")
            .field(11, 1001)
            .field(150, 0)
            .field(39, 0)
            .encode(&venue_ids, 2, "t");
        let rejected = FixMessage::new("8")
            .field(11, 1002)
            .field(150, 8)
            .field(39, 8)
            .field(58, "no")
            .field(25016, -2010)
            .encode(&venue_ids, 3, "t");
        venue.send(accepted).await.unwrap();
        venue.send(rejected).await.unwrap();

        // Events arrive in wire order, so the first one must come from 1002.
        assert_eq!(
            events.recv().await,
            Some(GatewayEvent::Error {
                code: -2010,
                message: "Order 1002 rejected: no".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_follows_logon_after_interval() {
        let (mut venue, _events, _handle) = logged_on_market_data_session().await;
        let logged_on_at = tokio::time::Instant::now();

        let heartbeat = expect_frame(&mut venue).await;
        assert_eq!(extract_field(&heartbeat, "35"), Some("0"));
        assert_eq!(extract_field(&heartbeat, "34"), Some("2"));
        assert_eq!(extract_field(&heartbeat, "112"), None);
        assert!(logged_on_at.elapsed() >= Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    }

    #[tokio::test]
    async fn test_request_is_answered_and_logout_ends_session() {
        let (client, server) = tokio::io::duplex(4096);
        let mut venue = Framed::new(server, FixCodec);
        let (events_tx, mut events) = mpsc::channel(16);
        let _handle = spawn_session(
            SessionRole::MarketData,
            Framed::new(client, FixCodec),
            credentials(),
            events_tx,
        );

        expect_frame(&mut venue).await;
        venue.send(venue_says("A")).await.unwrap();

        let venue_ids = CompIds {
            sender: "SPOT".to_string(),
            target: "client".to_string(),
        };
        let test_request = FixMessage::new("1").field(112, "are-you-there").encode(&venue_ids, 2, "t");
        venue.send(test_request).await.unwrap();

        let reply = expect_frame(&mut venue).await;
        assert_eq!(extract_field(&reply, "35"), Some("0"));
        assert_eq!(extract_field(&reply, "112"), Some("are-you-there"));

        venue.send(venue_says("5")).await.unwrap();
        // Session task exits and drops its sender.
        assert_eq!(events.recv().await, None);
    }
}
