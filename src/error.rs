//! Error types for the backtesting engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced to callers of the backtesting engine.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// `end` does not lie after `start`.
    #[error("invalid date range: end {end} is not after start {start}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Sampling interval is zero or negative.
    #[error("invalid sampling interval: {0}s (must be positive)")]
    InvalidInterval(i64),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Strategy comparison was requested with nothing to compare.
    #[error("no strategies to compare")]
    EmptyStrategyList,

    /// Two strategies in a comparison share a name.
    #[error("duplicate strategy name: {0}")]
    DuplicateStrategy(String),

    /// The data source produced no samples for the period.
    #[error("no market data for {pair}")]
    NoMarketData { pair: String },

    /// A strategy reported a failure it cannot recover from.
    #[error("strategy {strategy} aborted the run: {reason}")]
    StrategyAborted { strategy: String, reason: String },

    /// The run was cancelled between samples.
    #[error("backtest cancelled")]
    Cancelled,

    /// A comparison run panicked or was dropped by the runtime.
    #[error("backtest task failed: {0}")]
    TaskFailed(String),
}

/// Failure reported by a strategy while handling a sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// The current sample is skipped; the run continues.
    #[error("recoverable strategy error: {0}")]
    Recoverable(String),

    /// The run is aborted.
    #[error("fatal strategy error: {0}")]
    Fatal(String),
}

impl StrategyError {
    pub fn recoverable(reason: impl Into<String>) -> Self {
        Self::Recoverable(reason.into())
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

pub type Result<T, E = BacktestError> = std::result::Result<T, E>;
