//! Single-instrument profit-taking trader: per-instrument control loops
//! polling shared reference prices and trading through a FIX venue gateway.

pub mod config;
pub mod control_loop;
pub mod gateway;
pub mod state;
pub mod strategy;
pub mod supervisor;
pub mod types;

pub use control_loop::ControlLoop;
pub use gateway::{ExecutionGateway, GatewayError, GatewayEvent};
pub use state::ReferenceState;
pub use supervisor::{Supervisor, TradingSystemConfig};
