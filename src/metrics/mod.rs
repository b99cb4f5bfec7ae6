//! Performance metrics for backtest runs.

mod calculator;

pub use calculator::{MetricsCalculator, TRADING_DAYS_PER_YEAR};
