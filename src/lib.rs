//! Backtesting and performance evaluation for leveraged-perpetuals trading
//! strategies.
//!
//! A [`Backtester`] replays a [`Strategy`] over a price series from a
//! [`MarketDataSource`], manages simulated trades through their lifecycle,
//! tracks equity and drawdown, and reduces the run to a [`RunResult`].

pub mod backtest;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod trading;

pub use backtest::{compare_strategies_quick, generate_report, quick_backtest, BacktestConfig, Backtester};
pub use data::{MarketDataSource, ReplaySeries, SyntheticConfig, SyntheticSeries};
pub use error::{BacktestError, Result, StrategyError};
pub use models::{PricePoint, RunResult, Signal, SimulatedTrade, TradeDirection};
pub use trading::{RiskManager, Strategy, StrategyConfig};
