//! Strategy contract consumed by the backtester.
//!
//! A strategy turns market samples into entry signals, decides when its own
//! positions should be exited, and receives realized P&L as feedback. The
//! engine never constructs strategies; it only drives this trait.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;
use crate::models::{PricePoint, Signal, SimulatedTrade};

/// Capability set the backtester drives on every sample.
///
/// `analyze` and `should_exit` report failures through [`StrategyError`]:
/// `Recoverable` skips the affected decision for the current sample,
/// `Fatal` aborts the run.
pub trait Strategy: Send {
    /// Unique display name, used to key comparison results.
    fn name(&self) -> &str;

    /// Inspect a sample and optionally emit an entry signal.
    fn analyze(&mut self, point: &PricePoint) -> Result<Option<Signal>, StrategyError>;

    /// Strategy-specific exit rule for an open trade.
    fn should_exit(&mut self, trade: &SimulatedTrade, point: &PricePoint) -> Result<bool, StrategyError>;

    /// Final gate on a signal before a trade is built from it.
    fn validate_signal(&self, signal: &Signal) -> bool;

    /// Build an open trade from an accepted signal.
    fn create_trade_from_signal(&self, signal: &Signal) -> SimulatedTrade;

    /// Feedback for a closed trade.
    fn update_performance(&mut self, trade: &SimulatedTrade, pnl: Decimal);
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn analyze(&mut self, point: &PricePoint) -> Result<Option<Signal>, StrategyError> {
        (**self).analyze(point)
    }

    fn should_exit(&mut self, trade: &SimulatedTrade, point: &PricePoint) -> Result<bool, StrategyError> {
        (**self).should_exit(trade, point)
    }

    fn validate_signal(&self, signal: &Signal) -> bool {
        (**self).validate_signal(signal)
    }

    fn create_trade_from_signal(&self, signal: &Signal) -> SimulatedTrade {
        (**self).create_trade_from_signal(signal)
    }

    fn update_performance(&mut self, trade: &SimulatedTrade, pnl: Decimal) {
        (**self).update_performance(trade, pnl)
    }
}

/// Running performance counters kept by a strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub signals_generated: u32,
    pub trades_executed: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub total_pnl: Decimal,
}

impl StrategyStats {
    pub fn record_signal(&mut self) {
        self.signals_generated += 1;
    }

    /// Record a closed trade. Break-even trades count as losses.
    pub fn record_trade(&mut self, pnl: Decimal) {
        self.trades_executed += 1;
        self.total_pnl += pnl;
        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades_executed == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / self.trades_executed as f64
    }

    pub fn average_pnl(&self) -> Decimal {
        if self.trades_executed == 0 {
            return Decimal::ZERO;
        }
        self.total_pnl / Decimal::from(self.trades_executed)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stats_record_trades() {
        let mut stats = StrategyStats::default();
        stats.record_trade(dec!(10));
        stats.record_trade(dec!(-4));
        stats.record_trade(Decimal::ZERO);

        assert_eq!(stats.trades_executed, 3);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 2);
        assert_eq!(stats.total_pnl, dec!(6));
        assert_eq!(stats.average_pnl(), dec!(2));
        assert!((stats.win_rate() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_stats_do_not_divide_by_zero() {
        let stats = StrategyStats::default();
        assert_eq!(stats.win_rate(), 0.0);
        assert_eq!(stats.average_pnl(), Decimal::ZERO);
    }
}
