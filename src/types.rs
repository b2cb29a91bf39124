use std::fmt;

pub type OrderId = u64;

pub type SubscriptionId = u32;

/// Static contract descriptor used to build subscribe and order requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub symbol: String,
    pub local_symbol: String,
    pub security_type: String,
    pub exchange: String,
    pub currency: String,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        local_symbol: impl Into<String>,
        security_type: impl Into<String>,
        exchange: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            local_symbol: local_symbol.into(),
            security_type: security_type.into(),
            exchange: exchange.into(),
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}@{})", self.local_symbol, self.security_type, self.exchange)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Bid,
    Ask,
    /// Last trade price, the only kind the reference state keeps.
    Last,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Buy,
    Sell,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Buy => "BUY",
            OrderAction::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
}

/// Order body handed to the gateway alongside an allocated order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTicket {
    pub action: OrderAction,
    pub order_type: OrderType,
    pub quantity: u32,
}

impl OrderTicket {
    pub const QUANTITY: u32 = 1;

    pub fn market(action: OrderAction) -> Self {
        Self {
            action,
            order_type: OrderType::Market,
            quantity: Self::QUANTITY,
        }
    }
}

/// The engine's belief about what it holds in one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long,
}
