use crate::strategy::{Decision, HoldReason, PositionBook, TradingSignal};
use crate::types::Position;

/// Buys when flat, sells only once the reference price is strictly above
/// the entry price.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitTakingLong;

impl TradingSignal for ProfitTakingLong {
    fn name(&self) -> &str {
        "profit-taking-long"
    }

    fn decide(&self, book: &PositionBook, price: f64) -> Decision {
        match book.position() {
            Position::Flat => Decision::EnterLong,
            Position::Long => match book.entry_price() {
                Some(entry) if price > entry => Decision::ExitLong,
                _ => Decision::NoAction(HoldReason::Unprofitable),
            },
        }
    }
}
