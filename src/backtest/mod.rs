//! Backtesting engine: trade ledger, equity tracking, the run loop and
//! report rendering.

mod config;
mod engine;
mod equity;
mod ledger;
mod report;

pub use config::BacktestConfig;
pub use engine::{compare_strategies_quick, lookback_period, quick_backtest, Backtester};
pub use equity::EquityTracker;
pub use ledger::TradeLedger;
pub use report::{generate_report, Report};
