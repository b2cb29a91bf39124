//! Environment-driven configuration. `main` loads `.env` through `dotenvy`
//! before any of this runs.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::control_loop::DEFAULT_POLL_INTERVAL;
use crate::strategy::SignalKind;
use crate::supervisor::TradingSystemConfig;
use crate::types::{Instrument, OrderId, SubscriptionId};

const DEFAULT_FIX_PORT: u16 = 9000;
const DEFAULT_FIRST_SUBSCRIPTION_ID: SubscriptionId = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct VenueConfig {
    pub market_data_hostname: String,
    pub order_entry_hostname: String,
    pub port: u16,
    pub target_comp_id: String,
    pub api_key: String,
    pub private_key_base64: String,
    /// Seed reported as the next valid order id once order entry is up.
    pub order_id_seed: OrderId,
}

impl VenueConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match parse_var::<u16>(&lookup, "FIX_PORT")? {
            None | Some(0) => DEFAULT_FIX_PORT,
            Some(port) => port,
        };
        let order_id_seed = match parse_var::<OrderId>(&lookup, "TRADER_ORDER_ID_SEED")? {
            Some(seed) => seed,
            None => chrono::Utc::now().timestamp_millis().max(0) as OrderId,
        };

        Ok(Self {
            market_data_hostname: require(&lookup, "FIX_MD_HOSTNAME")?,
            order_entry_hostname: require(&lookup, "FIX_OE_HOSTNAME")?,
            port,
            target_comp_id: require(&lookup, "FIX_TARGET_COMP_ID")?,
            api_key: require(&lookup, "FIX_API_KEY")?,
            private_key_base64: require(&lookup, "FIX_PRIVATE_KEY_BASE64")?,
            order_id_seed,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraderConfig {
    pub poll_interval: Duration,
    pub systems: Vec<TradingSystemConfig>,
}

impl TraderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let poll_interval = parse_var::<u64>(&lookup, "TRADER_POLL_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        if poll_interval.is_zero() {
            anyhow::bail!("TRADER_POLL_INTERVAL_SECS must be positive");
        }

        let first_id = parse_var::<SubscriptionId>(&lookup, "TRADER_FIRST_SUBSCRIPTION_ID")?
            .unwrap_or(DEFAULT_FIRST_SUBSCRIPTION_ID);
        let exchange = lookup("TRADER_EXCHANGE").unwrap_or_else(|| "BINANCE".to_string());
        let security_type = lookup("TRADER_SECURITY_TYPE").unwrap_or_else(|| "CRYPTO".to_string());
        let currency = lookup("TRADER_CURRENCY").unwrap_or_else(|| "USDT".to_string());
        let symbols = lookup("TRADER_SYMBOLS").unwrap_or_else(|| "BTCUSDT".to_string());

        let systems: Vec<TradingSystemConfig> = symbols
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .zip(first_id..)
            .map(|(entry, subscription_id)| {
                // "NQ:NQH1" names the local symbol sent to the venue.
                let (symbol, local_symbol) = match entry.split_once(':') {
                    Some((symbol, local)) => (symbol.trim(), local.trim()),
                    None => (entry, entry),
                };
                TradingSystemConfig {
                    system_id: format!("{} A", symbol),
                    subscription_id,
                    instrument: Instrument::new(
                        symbol,
                        local_symbol,
                        &security_type,
                        &exchange,
                        &currency,
                    ),
                    signal: SignalKind::ProfitTakingLong,
                }
            })
            .collect();

        if systems.is_empty() {
            anyhow::bail!("TRADER_SYMBOLS does not name any symbol");
        }

        Ok(Self {
            poll_interval,
            systems,
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key).with_context(|| format!("missing environment variable {}", key))
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("invalid value for {}", key))
}
