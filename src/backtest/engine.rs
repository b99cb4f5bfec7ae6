//! Backtesting engine: replays a strategy over a price series, manages the
//! simulated trade lifecycle and reduces the outcome to a [`RunResult`].
//!
//! Per sample, in order:
//! 1. ask the strategy for an entry signal and open a trade if it passes the
//!    strategy's own check, the concurrency cap, sizing and the risk manager
//! 2. evaluate exits for every open trade (strategy, stop-loss, take-profit,
//!    holding limit; first match wins)
//! 3. close flagged trades, book their P&L and feed it back to the strategy
//!
//! Trades still open after the last sample are closed at its price.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{generate_report, BacktestConfig, EquityTracker, TradeLedger};
use crate::data::{MarketDataSource, SyntheticSeries};
use crate::error::{BacktestError, Result, StrategyError};
use crate::metrics::MetricsCalculator;
use crate::models::{ExitReason, PricePoint, RunResult, Signal, SimulatedTrade};
use crate::trading::{LimitsRiskManager, RiskManager, Strategy};

/// Backtesting engine.
///
/// Holds configuration and a data source only; every run gets its own ledger,
/// equity tracker and capital, so one instance can serve many runs.
#[derive(Clone)]
pub struct Backtester {
    config: BacktestConfig,
    interval: Duration,
    max_holding_period: Duration,
    data_source: Arc<dyn MarketDataSource>,
    cancelled: Arc<AtomicBool>,
}

/// Mutable state of a single run.
struct RunState {
    ledger: TradeLedger,
    equity: EquityTracker,
    skipped_signals: usize,
    rejected_trades: usize,
    failed_steps: usize,
}

impl Backtester {
    /// Create a backtester fed by the synthetic series described in `config`.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        let data_source = Arc::new(SyntheticSeries::new(config.synthetic.clone()));

        Ok(Self {
            interval: config.interval()?,
            max_holding_period: config.max_holding_period()?,
            config,
            data_source,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the market data source.
    pub fn with_data_source(mut self, data_source: Arc<dyn MarketDataSource>) -> Self {
        self.data_source = data_source;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Flag checked before every sample; setting it aborts running backtests
    /// with [`BacktestError::Cancelled`].
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run `strategy` over `pair` for `[start, end]` with a fresh rule-based
    /// risk manager.
    pub fn run_backtest<S>(
        &self,
        strategy: &mut S,
        pair: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        initial_position_size: Decimal,
    ) -> Result<RunResult>
    where
        S: Strategy + ?Sized,
    {
        let mut risk = LimitsRiskManager::new(self.config.risk_limits.clone());
        self.run_with_risk(strategy, &mut risk, pair, start, end, initial_position_size)
    }

    /// Like [`run_backtest`](Self::run_backtest) with a caller-supplied risk manager.
    pub fn run_with_risk<S, R>(
        &self,
        strategy: &mut S,
        risk: &mut R,
        pair: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        initial_position_size: Decimal,
    ) -> Result<RunResult>
    where
        S: Strategy + ?Sized,
        R: RiskManager + ?Sized,
    {
        let points = self
            .data_source
            .price_series(pair, start, end, self.interval)?;
        self.replay(strategy, risk, pair, &points, initial_position_size)
    }

    /// Drive one run over an already generated series.
    pub fn replay<S, R>(
        &self,
        strategy: &mut S,
        risk: &mut R,
        pair: &str,
        points: &[PricePoint],
        initial_position_size: Decimal,
    ) -> Result<RunResult>
    where
        S: Strategy + ?Sized,
        R: RiskManager + ?Sized,
    {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Err(BacktestError::NoMarketData { pair: pair.to_string() });
        };

        info!(
            strategy = %strategy.name(),
            pair = %pair,
            points = points.len(),
            start = %first.timestamp,
            end = %last.timestamp,
            "Starting backtest"
        );

        let mut state = RunState {
            ledger: TradeLedger::new(self.config.default_fee_rate),
            equity: EquityTracker::new(self.config.initial_capital, first.timestamp),
            skipped_signals: 0,
            rejected_trades: 0,
            failed_steps: 0,
        };

        for point in points {
            if self.cancelled.load(Ordering::Relaxed) {
                warn!(strategy = %strategy.name(), at = %point.timestamp, "Backtest cancelled");
                return Err(BacktestError::Cancelled);
            }
            self.step(strategy, risk, &mut state, point, initial_position_size)?;
        }

        let remaining: Vec<Uuid> = state.ledger.open_trades().iter().map(|t| t.id).collect();
        if !remaining.is_empty() {
            debug!(count = remaining.len(), price = %last.price, "Closing remaining trades at end of backtest");
        }
        for id in remaining {
            Self::close_trade(strategy, risk, &mut state, id, last.price, ExitReason::BacktestEnd, last.timestamp);
        }

        Ok(self.finish(strategy.name(), pair, first.timestamp, last.timestamp, state))
    }

    /// Process one sample: entry, exit evaluation, closes.
    fn step<S, R>(
        &self,
        strategy: &mut S,
        risk: &mut R,
        state: &mut RunState,
        point: &PricePoint,
        initial_position_size: Decimal,
    ) -> Result<()>
    where
        S: Strategy + ?Sized,
        R: RiskManager + ?Sized,
    {
        let mut step_failed = false;

        match strategy.analyze(point) {
            Ok(Some(signal)) => self.try_open(strategy, risk, state, &signal, point, initial_position_size),
            Ok(None) => {}
            Err(err) => {
                Self::check_fatal(strategy.name(), &err)?;
                warn!(strategy = %strategy.name(), at = %point.timestamp, error = %err, "Analyze failed, no entry this step");
                step_failed = true;
            }
        }

        let mut exits = Vec::new();
        for trade in state.ledger.open_trades() {
            let strategy_exit = match strategy.should_exit(trade, point) {
                Ok(exit) => exit,
                Err(err) => {
                    Self::check_fatal(strategy.name(), &err)?;
                    warn!(trade_id = %trade.id, error = %err, "Exit check failed, applying mechanical rules only");
                    step_failed = true;
                    false
                }
            };
            if let Some(reason) = self.exit_reason(trade, point, strategy_exit) {
                exits.push((trade.id, reason));
            }
        }

        for (id, reason) in exits {
            Self::close_trade(strategy, risk, state, id, point.price, reason, point.timestamp);
        }

        if step_failed {
            state.failed_steps += 1;
        }
        Ok(())
    }

    fn check_fatal(strategy: &str, err: &StrategyError) -> Result<()> {
        match err {
            StrategyError::Fatal(reason) => Err(BacktestError::StrategyAborted {
                strategy: strategy.to_string(),
                reason: reason.clone(),
            }),
            StrategyError::Recoverable(_) => Ok(()),
        }
    }

    fn try_open<S, R>(
        &self,
        strategy: &mut S,
        risk: &mut R,
        state: &mut RunState,
        signal: &Signal,
        point: &PricePoint,
        initial_position_size: Decimal,
    ) where
        S: Strategy + ?Sized,
        R: RiskManager + ?Sized,
    {
        if !strategy.validate_signal(signal) {
            debug!(pair = %signal.pair, strength = signal.strength, "Signal failed strategy validation");
            return;
        }

        if state.ledger.open_count() >= self.config.max_concurrent_trades {
            debug!(
                open = state.ledger.open_count(),
                cap = self.config.max_concurrent_trades,
                "Concurrency cap reached, signal ignored"
            );
            state.skipped_signals += 1;
            return;
        }

        let size = initial_position_size.min(state.equity.capital() * self.config.max_capital_fraction);
        if size <= Decimal::ZERO {
            debug!(capital = %state.equity.capital(), "No capital to size position, signal ignored");
            state.skipped_signals += 1;
            return;
        }

        let mut trade = strategy.create_trade_from_signal(signal);
        trade.size = size;
        trade.opened_at = point.timestamp;

        let decision = risk.validate_trade(&trade, state.ledger.open_trades());
        if !decision.accepted {
            debug!(pair = %trade.pair, reason = %decision.reason, "Trade rejected by risk manager");
            state.rejected_trades += 1;
            return;
        }

        debug!(
            trade_id = %trade.id,
            pair = %trade.pair,
            direction = %trade.direction,
            price = %trade.entry_price,
            size = %trade.size,
            leverage = trade.leverage,
            "Opened trade"
        );
        state.ledger.open(trade);
    }

    /// First matching exit rule for `trade` at `point`, if any.
    fn exit_reason(&self, trade: &SimulatedTrade, point: &PricePoint, strategy_exit: bool) -> Option<ExitReason> {
        if strategy_exit {
            Some(ExitReason::StrategyExit)
        } else if trade.stop_loss_hit(point.price) {
            Some(ExitReason::StopLoss)
        } else if trade.take_profit_hit(point.price) {
            Some(ExitReason::TakeProfit)
        } else if point.timestamp - trade.opened_at > self.max_holding_period {
            Some(ExitReason::Timeout)
        } else {
            None
        }
    }

    fn close_trade<S, R>(
        strategy: &mut S,
        risk: &mut R,
        state: &mut RunState,
        id: Uuid,
        price: Decimal,
        reason: ExitReason,
        at: DateTime<Utc>,
    ) where
        S: Strategy + ?Sized,
        R: RiskManager + ?Sized,
    {
        let pnl = state.ledger.close(id, price, reason, at);
        state.equity.apply(pnl, at);

        if let Some(trade) = state.ledger.closed().last() {
            strategy.update_performance(trade, pnl);
            risk.record_close(trade, state.equity.capital());
        }
    }

    fn finish(
        &self,
        strategy_name: &str,
        pair: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        state: RunState,
    ) -> RunResult {
        let periods_per_year = self
            .config
            .periods_per_year
            .unwrap_or_else(|| MetricsCalculator::annualization_periods(self.interval));

        let max_drawdown = state.equity.max_drawdown();
        let final_capital = state.equity.capital();
        let trades = state.ledger.into_closed();
        let (equity_curve, returns) = state.equity.into_parts();
        let stats = MetricsCalculator::reduce(&trades, max_drawdown, &returns, periods_per_year);

        info!(
            strategy = %strategy_name,
            pair = %pair,
            trades = stats.total_trades,
            win_rate = stats.win_rate,
            total_pnl = %stats.total_pnl,
            max_drawdown = stats.max_drawdown,
            sharpe = stats.sharpe_ratio,
            skipped = state.skipped_signals,
            rejected = state.rejected_trades,
            failed_steps = state.failed_steps,
            "Backtest completed"
        );

        RunResult {
            strategy_name: strategy_name.to_string(),
            pair: pair.to_string(),
            start_time,
            end_time,
            initial_capital: self.config.initial_capital,
            final_capital,
            stats,
            trades,
            equity_curve,
            returns,
            skipped_signals: state.skipped_signals,
            rejected_trades: state.rejected_trades,
            failed_steps: state.failed_steps,
        }
    }

    /// Run every strategy over the same period and return results keyed by
    /// strategy name.
    ///
    /// The series is generated once and shared read-only; each run executes
    /// on the blocking pool with its own ledger, capital and risk manager.
    pub async fn compare_strategies(
        &self,
        strategies: Vec<Box<dyn Strategy>>,
        pair: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<String, RunResult>> {
        if strategies.is_empty() {
            return Err(BacktestError::EmptyStrategyList);
        }
        let mut names = HashSet::new();
        for strategy in &strategies {
            if !names.insert(strategy.name().to_string()) {
                return Err(BacktestError::DuplicateStrategy(strategy.name().to_string()));
            }
        }

        let points: Arc<[PricePoint]> = self
            .data_source
            .price_series(pair, start, end, self.interval)?
            .into();
        if points.is_empty() {
            return Err(BacktestError::NoMarketData { pair: pair.to_string() });
        }

        info!(strategies = strategies.len(), pair = %pair, points = points.len(), "Comparing strategies");

        let position_size = self.config.position_size;
        let runs = strategies.into_iter().map(|mut strategy| {
            let backtester = self.clone();
            let points = Arc::clone(&points);
            let pair = pair.to_string();
            tokio::task::spawn_blocking(move || {
                let mut risk = LimitsRiskManager::new(backtester.config.risk_limits.clone());
                backtester.replay(strategy.as_mut(), &mut risk, &pair, &points, position_size)
            })
        });

        let mut results = BTreeMap::new();
        for outcome in join_all(runs).await {
            let result = outcome.map_err(|e| BacktestError::TaskFailed(e.to_string()))??;
            info!("\n{}", generate_report(&result, &result.strategy_name));
            results.insert(result.strategy_name.clone(), result);
        }

        Ok(results)
    }
}

/// Backtest `strategy` over the last `days` days with default settings and
/// the given starting capital.
pub fn quick_backtest<S>(strategy: &mut S, pair: &str, days: i64, initial_capital: Decimal) -> Result<RunResult>
where
    S: Strategy + ?Sized,
{
    let backtester = Backtester::new(BacktestConfig {
        initial_capital,
        ..BacktestConfig::default()
    })?;
    let (start, end) = lookback_period(days)?;
    let position_size = backtester.config.position_size;

    backtester.run_backtest(strategy, pair, start, end, position_size)
}

/// Compare strategies over the last `days` days with default settings.
pub async fn compare_strategies_quick(
    strategies: Vec<Box<dyn Strategy>>,
    pair: &str,
    days: i64,
) -> Result<BTreeMap<String, RunResult>> {
    let backtester = Backtester::new(BacktestConfig::default())?;
    let (start, end) = lookback_period(days)?;

    backtester.compare_strategies(strategies, pair, start, end).await
}

/// The `days` days ending now.
pub fn lookback_period(days: i64) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let end = Utc::now();
    let start = Duration::try_days(days)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| BacktestError::InvalidConfig(format!("lookback of {} days is out of range", days)))?;
    Ok((start, end))
}
