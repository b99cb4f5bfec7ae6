//! Backtest run results: trade statistics, equity curve and return series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SimulatedTrade;

/// Capital value after an equity event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    /// Simulation time of the event
    pub timestamp: DateTime<Utc>,

    /// Capital after the event
    pub capital: Decimal,
}

/// Risk/return statistics reduced from a closed-trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    // === Basic Statistics ===
    /// Total number of closed trades
    pub total_trades: usize,

    /// Trades with strictly positive P&L
    pub winning_trades: usize,

    /// Trades with zero or negative P&L
    pub losing_trades: usize,

    /// Win rate (0.0 to 1.0)
    pub win_rate: f64,

    /// Total realized P&L
    pub total_pnl: Decimal,

    /// Average P&L per trade
    pub avg_pnl: Decimal,

    /// Average profit on winning trades
    pub avg_win: Decimal,

    /// Average loss on losing trades (signed, <= 0)
    pub avg_loss: Decimal,

    /// Gross profit / gross loss; `f64::INFINITY` when there are no losses
    #[serde(with = "unbounded_f64")]
    pub profit_factor: f64,

    /// Total fees charged
    pub total_fees: Decimal,

    // === Risk Metrics ===
    /// Maximum drawdown percentage (0.0 to 100.0)
    pub max_drawdown: f64,

    /// Annualized Sharpe ratio
    pub sharpe_ratio: f64,

    /// Annualized Sortino ratio (downside deviation)
    pub sortino_ratio: f64,
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            total_pnl: Decimal::ZERO,
            avg_pnl: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: 0.0,
            total_fees: Decimal::ZERO,
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
        }
    }
}

/// Serde adapter writing infinities as `"inf"`/`"-inf"`, since JSON numbers
/// cannot represent them.
mod unbounded_f64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("expected a number or \"inf\", got {:?}", other))),
            },
        }
    }
}

/// Outcome of one (strategy, period) backtest. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Strategy that produced the run
    pub strategy_name: String,

    /// Pair the run traded
    pub pair: String,

    /// First sample time
    pub start_time: DateTime<Utc>,

    /// Last sample time
    pub end_time: DateTime<Utc>,

    /// Capital at the start of the run
    pub initial_capital: Decimal,

    /// Capital after the last equity event
    pub final_capital: Decimal,

    /// Reduced statistics
    pub stats: PerformanceStats,

    /// All closed trades in close order
    pub trades: Vec<SimulatedTrade>,

    /// Equity curve, starting with the initial capital
    pub equity_curve: Vec<EquitySample>,

    /// Per-event returns
    pub returns: Vec<f64>,

    /// Signals ignored because of the concurrency cap or sizing
    pub skipped_signals: usize,

    /// Trades rejected by the risk manager
    pub rejected_trades: usize,

    /// Steps where the strategy reported a recoverable failure
    pub failed_steps: usize,
}

impl RunResult {
    pub fn total_trades(&self) -> usize {
        self.stats.total_trades
    }

    pub fn win_rate(&self) -> f64 {
        self.stats.win_rate
    }

    pub fn total_pnl(&self) -> Decimal {
        self.stats.total_pnl
    }

    pub fn max_drawdown(&self) -> f64 {
        self.stats.max_drawdown
    }

    pub fn sharpe_ratio(&self) -> f64 {
        self.stats.sharpe_ratio
    }

    pub fn profit_factor(&self) -> f64 {
        self.stats.profit_factor
    }

    /// Total return as a fraction of initial capital.
    pub fn total_return(&self) -> Decimal {
        if self.initial_capital.is_zero() {
            return Decimal::ZERO;
        }
        (self.final_capital - self.initial_capital) / self.initial_capital
    }
}
