pub mod profit_taker;

use std::fmt;

use crate::types::{OrderAction, OrderId, Position};

pub use profit_taker::ProfitTakingLong;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    Unprofitable,
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::Unprofitable => f.write_str("No Profit, Holding"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NoAction(HoldReason),
    EnterLong,
    ExitLong,
}

impl Decision {
    pub fn order_action(&self) -> Option<OrderAction> {
        match self {
            Decision::NoAction(_) => None,
            Decision::EnterLong => Some(OrderAction::Buy),
            Decision::ExitLong => Some(OrderAction::Sell),
        }
    }
}

/// Per-instrument position bookkeeping driven by executed decisions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBook {
    position: Position,
    entry_price: Option<f64>,
    outstanding_order_id: Option<OrderId>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Only set while long.
    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn outstanding_order_id(&self) -> Option<OrderId> {
        self.outstanding_order_id
    }

    /// Applies the transition for a decision whose order was just sent.
    ///
    /// The flip is optimistic: no fill confirmation is awaited, so a rejected
    /// order leaves the book out of step with the venue.
    pub fn apply(&mut self, decision: Decision, order_id: OrderId, price: f64) {
        match decision {
            Decision::NoAction(_) => return,
            Decision::EnterLong => {
                self.position = Position::Long;
                self.entry_price = Some(price);
            }
            Decision::ExitLong => {
                self.position = Position::Flat;
                self.entry_price = None;
            }
        }
        self.outstanding_order_id = Some(order_id);
    }
}

/// Entry/exit decision logic for one kind of trading system.
pub trait TradingSignal: Send + Sync {
    fn name(&self) -> &str;

    /// Maps the current book and reference price to a decision. Must not
    /// mutate anything; transitions are applied by the caller.
    fn decide(&self, book: &PositionBook, price: f64) -> Decision;
}

/// Registry of the signal implementations a trading system can be
/// configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalKind {
    #[default]
    ProfitTakingLong,
}

impl SignalKind {
    pub fn build(&self) -> Box<dyn TradingSignal> {
        match self {
            SignalKind::ProfitTakingLong => Box::new(ProfitTakingLong),
        }
    }
}
