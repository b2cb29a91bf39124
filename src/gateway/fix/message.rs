use std::fmt;

use chrono::Utc;

use crate::types::{Instrument, OrderAction, OrderId, OrderTicket, OrderType, SubscriptionId, TickKind};

pub const SOH: char = '\x01';
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

const BEGIN_STRING: &str = "FIX.4.4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompIds {
    pub sender: String,
    pub target: String,
}

/// Outbound message body. Header and trailer are added by `encode`, which
/// the session calls with its next sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct FixMessage {
    msg_type: &'static str,
    body: Vec<(u32, String)>,
}

impl FixMessage {
    pub fn new(msg_type: &'static str) -> Self {
        Self {
            msg_type,
            body: Vec::new(),
        }
    }

    pub fn field(mut self, tag: u32, value: impl fmt::Display) -> Self {
        self.body.push((tag, value.to_string()));
        self
    }

    pub fn encode(&self, comp_ids: &CompIds, seq_num: u64, sending_time: &str) -> String {
        let mut body = format!(
            "35={}{SOH}34={}{SOH}49={}{SOH}52={}{SOH}56={}{SOH}",
            self.msg_type, seq_num, comp_ids.sender, sending_time, comp_ids.target
        );
        for (tag, value) in &self.body {
            body.push_str(&format!("{}={}{SOH}", tag, value));
        }

        let mut message = format!("8={BEGIN_STRING}{SOH}9={}{SOH}{}", body.len(), body);
        let checksum = message.bytes().map(u32::from).sum::<u32>() % 256;
        message.push_str(&format!("10={:03}{SOH}", checksum));
        message
    }
}

pub fn sending_time() -> String {
    Utc::now().format("%Y%m%d-%H:%M:%S%.3f").to_string()
}

pub fn logon(raw_data: &str, username: &str) -> FixMessage {
    FixMessage::new("A")
        .field(95, raw_data.len())
        .field(96, raw_data)
        .field(98, 0)
        .field(108, HEARTBEAT_INTERVAL_SECS)
        .field(141, "Y")
        .field(553, username)
        .field(25035, 1)
}

pub fn heartbeat(test_req_id: Option<&str>) -> FixMessage {
    let message = FixMessage::new("0");
    match test_req_id {
        Some(id) => message.field(112, id),
        None => message,
    }
}

// The venue keys instruments on Symbol(55) alone, so only the local symbol
// goes on the wire. Security type, exchange and currency stay local.

/// Subscribes to the trade stream of one symbol; MDReqID carries the
/// subscription id so ticks can be routed back.
pub fn market_data_request(subscription_id: SubscriptionId, instrument: &Instrument) -> FixMessage {
    FixMessage::new("V")
        .field(262, subscription_id)
        .field(263, 1)
        .field(266, "Y")
        .field(146, 1)
        .field(55, &instrument.local_symbol)
        .field(267, 1)
        .field(269, 2)
}

pub fn new_order_single(order_id: OrderId, instrument: &Instrument, order: &OrderTicket) -> FixMessage {
    let side = match order.action {
        OrderAction::Buy => 1,
        OrderAction::Sell => 2,
    };
    let ord_type = match order.order_type {
        OrderType::Market => 1,
    };
    FixMessage::new("D")
        .field(11, order_id)
        .field(55, &instrument.local_symbol)
        .field(54, side)
        .field(38, order.quantity)
        .field(40, ord_type)
}

pub fn fields(message: &str) -> impl Iterator<Item = (&str, &str)> {
    message
        .split(SOH)
        .filter_map(|field| field.split_once('='))
}

pub fn extract_field<'a>(message: &'a str, tag: &str) -> Option<&'a str> {
    fields(message).find(|(t, _)| *t == tag).map(|(_, value)| value)
}

pub fn printable(message: &str) -> String {
    message.replace(SOH, "|")
}

#[derive(Debug, Clone, PartialEq)]
pub struct MdEntry {
    pub kind: TickKind,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Logon,
    Heartbeat,
    TestRequest {
        test_req_id: Option<String>,
    },
    Logout {
        text: Option<String>,
    },
    MarketData {
        req_id: Option<String>,
        entries: Vec<MdEntry>,
    },
    ExecutionReport {
        cl_ord_id: String,
        exec_type: String,
        ord_status: String,
        text: Option<String>,
        error_code: Option<i32>,
    },
    Reject {
        text: Option<String>,
        error_code: Option<i32>,
    },
    Other(String),
}

impl Inbound {
    pub fn parse(message: &str) -> Option<Self> {
        let msg_type = extract_field(message, "35")?;
        let owned = |tag: &str| extract_field(message, tag).map(str::to_string);
        let error_code = || extract_field(message, "25016").and_then(|code| code.parse::<i32>().ok());

        let inbound = match msg_type {
            "A" => Inbound::Logon,
            "0" => Inbound::Heartbeat,
            "1" => Inbound::TestRequest {
                test_req_id: owned("112"),
            },
            "5" => Inbound::Logout { text: owned("58") },
            "W" | "X" => Inbound::MarketData {
                req_id: owned("262"),
                entries: md_entries(message),
            },
            "8" => Inbound::ExecutionReport {
                cl_ord_id: owned("11").unwrap_or_default(),
                exec_type: owned("150").unwrap_or_default(),
                ord_status: owned("39").unwrap_or_default(),
                text: owned("58"),
                error_code: error_code(),
            },
            "3" | "j" => Inbound::Reject {
                text: owned("58"),
                error_code: error_code(),
            },
            other => Inbound::Other(other.to_string()),
        };
        Some(inbound)
    }
}

fn md_entries(message: &str) -> Vec<MdEntry> {
    let mut entries = Vec::new();
    // 269 may be omitted on repeated entries; the previous type carries over.
    let mut kind = None;
    for (tag, value) in fields(message) {
        match tag {
            "269" => kind = Some(tick_kind(value)),
            "270" => {
                if let (Some(kind), Ok(price)) = (kind, value.parse::<f64>()) {
                    entries.push(MdEntry { kind, price });
                }
            }
            _ => {}
        }
    }
    entries
}

fn tick_kind(md_entry_type: &str) -> TickKind {
    match md_entry_type {
        "0" => TickKind::Bid,
        "1" => TickKind::Ask,
        "2" => TickKind::Last,
        _ => TickKind::Other,
    }
}
