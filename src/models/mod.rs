//! Data models for simulated trades, market samples, signals and run results.

mod market;
mod metrics;
mod trade;

pub use market::{PricePoint, Signal};
pub use metrics::{EquitySample, PerformanceStats, RunResult};
pub use trade::{ExitReason, SimulatedTrade, TradeDirection, TradeStatus};
