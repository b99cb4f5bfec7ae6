//! Reduces a closed-trade ledger and return series to performance statistics.

use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::statistics::Statistics;

use crate::models::{PerformanceStats, SimulatedTrade};

/// Trading days per year used to annualize risk ratios.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calculator for run-level performance metrics.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Reduce closed trades, the tracked max drawdown and the per-event return
    /// series into [`PerformanceStats`].
    ///
    /// Degenerate input never fails: no trades yields zero win rate, zero
    /// profit factor and zero ratios.
    pub fn reduce(
        trades: &[SimulatedTrade],
        max_drawdown: f64,
        returns: &[f64],
        periods_per_year: f64,
    ) -> PerformanceStats {
        let mut stats = PerformanceStats {
            max_drawdown,
            ..PerformanceStats::default()
        };

        let pnls: Vec<Decimal> = trades.iter().filter_map(|t| t.pnl).collect();
        if !pnls.is_empty() {
            Self::calculate_pnl_metrics(&mut stats, &pnls);
        }
        stats.total_fees = trades.iter().filter_map(|t| t.fees_paid).sum();

        Self::calculate_sharpe_sortino(&mut stats, returns, periods_per_year);
        stats
    }

    /// Periods per year for a series sampled every `interval`.
    pub fn annualization_periods(interval: Duration) -> f64 {
        let seconds = interval.num_seconds();
        if seconds <= 0 {
            return TRADING_DAYS_PER_YEAR;
        }
        TRADING_DAYS_PER_YEAR * Duration::days(1).num_seconds() as f64 / seconds as f64
    }

    /// Win/loss counts, averages and profit factor. Break-even trades count
    /// as losses.
    fn calculate_pnl_metrics(stats: &mut PerformanceStats, pnls: &[Decimal]) {
        let (wins, losses): (Vec<Decimal>, Vec<Decimal>) = pnls.iter().partition(|&&p| p > Decimal::ZERO);

        stats.total_trades = pnls.len();
        stats.winning_trades = wins.len();
        stats.losing_trades = stats.total_trades - stats.winning_trades;
        stats.win_rate = wins.len() as f64 / pnls.len() as f64;

        stats.total_pnl = pnls.iter().copied().sum();
        stats.avg_pnl = stats.total_pnl / Decimal::from(pnls.len());

        let gross_profit: Decimal = wins.iter().copied().sum();
        let gross_loss: Decimal = losses.iter().map(|l| l.abs()).sum();

        if !wins.is_empty() {
            stats.avg_win = gross_profit / Decimal::from(wins.len());
        }
        if !losses.is_empty() {
            stats.avg_loss = losses.iter().copied().sum::<Decimal>() / Decimal::from(losses.len());
        }

        stats.profit_factor = if gross_loss > Decimal::ZERO {
            gross_profit.to_f64().unwrap_or(0.0) / gross_loss.to_f64().unwrap_or(1.0)
        } else if gross_profit > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        };
    }

    /// Annualized Sharpe and Sortino ratios (zero risk-free rate, population
    /// deviation).
    fn calculate_sharpe_sortino(stats: &mut PerformanceStats, returns: &[f64], periods_per_year: f64) {
        if returns.len() < 2 {
            return;
        }

        let annualization = periods_per_year.max(0.0).sqrt();
        let mean = returns.mean();
        let std_dev = returns.population_std_dev();

        if std_dev > 0.0 {
            stats.sharpe_ratio = mean / std_dev * annualization;
        }

        let negative_returns: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
        if !negative_returns.is_empty() {
            let downside_dev =
                (negative_returns.iter().map(|r| r.powi(2)).sum::<f64>() / negative_returns.len() as f64).sqrt();
            if downside_dev > 0.0 {
                stats.sortino_ratio = mean / downside_dev * annualization;
            }
        }
    }
}
