//! Pre-trade risk validation.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::SimulatedTrade;

/// Outcome of a risk check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskDecision {
    pub accepted: bool,
    pub reason: String,
}

impl RiskDecision {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: "Trade validated".to_string(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// Gatekeeper consulted before a trade is opened. A rejection means
/// "do not open", never a failure of the run.
pub trait RiskManager: Send {
    fn validate_trade(&mut self, trade: &SimulatedTrade, open_trades: &[SimulatedTrade]) -> RiskDecision;

    /// Called after a trade closes with the capital that resulted.
    fn record_close(&mut self, _trade: &SimulatedTrade, _capital: Decimal) {}
}

/// Accepts every trade.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RiskManager for AcceptAll {
    fn validate_trade(&mut self, _trade: &SimulatedTrade, _open_trades: &[SimulatedTrade]) -> RiskDecision {
        RiskDecision::accept()
    }
}

/// Limits enforced by [`LimitsRiskManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Maximum collateral per position
    pub max_position_size: Decimal,

    /// Maximum leverage per position
    pub max_leverage: u32,

    /// Maximum number of open positions
    pub max_open_positions: usize,

    /// Maximum leveraged notional across open positions
    pub max_total_exposure: Decimal,

    /// Maximum collateral per pair, across open positions
    pub max_pair_exposure: Decimal,

    /// Realized loss per simulated day after which new trades are refused
    pub max_daily_loss: Decimal,

    /// Drawdown percentage (0-100) after which new trades are refused
    pub max_drawdown_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: dec!(100),
            max_leverage: 50,
            max_open_positions: 5,
            max_total_exposure: dec!(5000),
            max_pair_exposure: dec!(200),
            max_daily_loss: dec!(50),
            max_drawdown_pct: 20.0,
        }
    }
}

/// Rule-based risk manager with per-day loss and drawdown tracking.
///
/// State is kept per run; create a fresh instance for every backtest.
#[derive(Debug, Clone)]
pub struct LimitsRiskManager {
    limits: RiskLimits,
    current_day: Option<NaiveDate>,
    daily_pnl: Decimal,
    peak_capital: Option<Decimal>,
    current_drawdown: f64,
}

impl LimitsRiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            current_day: None,
            daily_pnl: Decimal::ZERO,
            peak_capital: None,
            current_drawdown: 0.0,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn daily_pnl(&self) -> Decimal {
        self.daily_pnl
    }

    /// Current drawdown percentage (0-100).
    pub fn current_drawdown(&self) -> f64 {
        self.current_drawdown
    }

    fn roll_day(&mut self, day: NaiveDate) {
        if self.current_day != Some(day) {
            if self.current_day.is_some() {
                debug!(day = %day, "Daily risk metrics reset");
            }
            self.current_day = Some(day);
            self.daily_pnl = Decimal::ZERO;
        }
    }
}

impl Default for LimitsRiskManager {
    fn default() -> Self {
        Self::new(RiskLimits::default())
    }
}

impl RiskManager for LimitsRiskManager {
    fn validate_trade(&mut self, trade: &SimulatedTrade, open_trades: &[SimulatedTrade]) -> RiskDecision {
        self.roll_day(trade.opened_at.date_naive());

        if self.daily_pnl <= -self.limits.max_daily_loss {
            return RiskDecision::reject(format!("Daily loss limit reached: {}", self.daily_pnl));
        }

        if self.current_drawdown >= self.limits.max_drawdown_pct {
            return RiskDecision::reject(format!(
                "Maximum drawdown reached: {:.2}%",
                self.current_drawdown
            ));
        }

        if trade.size > self.limits.max_position_size {
            return RiskDecision::reject(format!(
                "Position size too large: {} > {}",
                trade.size, self.limits.max_position_size
            ));
        }

        if trade.leverage > self.limits.max_leverage {
            return RiskDecision::reject(format!(
                "Leverage too high: {} > {}",
                trade.leverage, self.limits.max_leverage
            ));
        }

        let total_exposure: Decimal = open_trades.iter().map(|t| t.notional()).sum();
        if total_exposure + trade.notional() > self.limits.max_total_exposure {
            return RiskDecision::reject(format!(
                "Total exposure limit would be exceeded: {} + {} > {}",
                total_exposure,
                trade.notional(),
                self.limits.max_total_exposure
            ));
        }

        if open_trades.len() >= self.limits.max_open_positions {
            return RiskDecision::reject(format!(
                "Maximum open positions reached: {}",
                open_trades.len()
            ));
        }

        let pair_exposure: Decimal = open_trades
            .iter()
            .filter(|t| t.pair == trade.pair)
            .map(|t| t.size)
            .sum();
        if pair_exposure + trade.size > self.limits.max_pair_exposure {
            return RiskDecision::reject(format!(
                "Pair exposure limit would be exceeded for {}",
                trade.pair
            ));
        }

        RiskDecision::accept()
    }

    fn record_close(&mut self, trade: &SimulatedTrade, capital: Decimal) {
        if let Some(closed_at) = trade.closed_at {
            self.roll_day(closed_at.date_naive());
        }
        let pnl = trade.pnl.unwrap_or_default();
        self.daily_pnl += pnl;

        // The capital before the first close is the run's starting peak
        let peak = self.peak_capital.get_or_insert(capital - pnl);
        if capital > *peak {
            *peak = capital;
            self.current_drawdown = 0.0;
        } else if *peak > Decimal::ZERO {
            self.current_drawdown = ((*peak - capital) / *peak * dec!(100)).to_f64().unwrap_or(0.0);
        }

        if self.current_drawdown >= self.limits.max_drawdown_pct {
            warn!(
                drawdown = self.current_drawdown,
                limit = self.limits.max_drawdown_pct,
                "Drawdown limit reached, refusing new trades"
            );
        }
    }
}
