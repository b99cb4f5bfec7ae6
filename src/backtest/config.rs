//! Backtest run parameters.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::data::SyntheticConfig;
use crate::error::{BacktestError, Result};
use crate::trading::RiskLimits;

/// Backtesting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting capital
    pub initial_capital: Decimal,

    /// Requested collateral per position for comparison and quick runs
    pub position_size: Decimal,

    /// Maximum trades open at the same time; further signals are ignored
    pub max_concurrent_trades: usize,

    /// Largest share of current capital committed to one new position
    pub max_capital_fraction: Decimal,

    /// Fee rate on size, used when a trade carries no explicit fee
    pub default_fee_rate: Decimal,

    /// Positions held longer than this are closed with reason `timeout`
    pub max_holding_hours: i64,

    /// Sampling interval of the price series
    pub interval_minutes: i64,

    /// Sharpe/Sortino annualization override; derived from the interval when unset
    pub periods_per_year: Option<f64>,

    /// Limits for the per-run risk manager
    pub risk_limits: RiskLimits,

    /// Synthetic series parameters
    pub synthetic: SyntheticConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            position_size: dec!(100),
            max_concurrent_trades: 5,
            max_capital_fraction: dec!(0.10), // 10% of capital per position
            default_fee_rate: dec!(0.001),    // 0.1% fee
            max_holding_hours: 24 * 7,
            interval_minutes: 60,
            periods_per_year: None,
            risk_limits: RiskLimits::default(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Sampling interval; fails for non-positive or out-of-range minutes.
    pub fn interval(&self) -> Result<Duration> {
        Duration::try_minutes(self.interval_minutes)
            .filter(|interval| *interval > Duration::zero())
            .ok_or(BacktestError::InvalidInterval(self.interval_minutes.saturating_mul(60)))
    }

    pub fn max_holding_period(&self) -> Result<Duration> {
        Duration::try_hours(self.max_holding_hours)
            .filter(|period| *period > Duration::zero())
            .ok_or_else(|| {
                BacktestError::InvalidConfig(format!(
                    "max holding period must be positive and in range, got {}h",
                    self.max_holding_hours
                ))
            })
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::InvalidConfig(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.position_size <= Decimal::ZERO {
            return Err(BacktestError::InvalidConfig(format!(
                "position size must be positive, got {}",
                self.position_size
            )));
        }
        if self.max_concurrent_trades == 0 {
            return Err(BacktestError::InvalidConfig(
                "max concurrent trades must be at least 1".to_string(),
            ));
        }
        if self.max_capital_fraction <= Decimal::ZERO || self.max_capital_fraction > Decimal::ONE {
            return Err(BacktestError::InvalidConfig(format!(
                "max capital fraction must be in (0, 1], got {}",
                self.max_capital_fraction
            )));
        }
        if self.default_fee_rate < Decimal::ZERO {
            return Err(BacktestError::InvalidConfig(format!(
                "fee rate must not be negative, got {}",
                self.default_fee_rate
            )));
        }
        self.max_holding_period()?;
        self.interval()?;
        if let Some(periods) = self.periods_per_year {
            if !(periods.is_finite() && periods > 0.0) {
                return Err(BacktestError::InvalidConfig(format!(
                    "periods per year must be positive, got {}",
                    periods
                )));
            }
        }
        self.synthetic.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::Backtester;

    #[test]
    fn test_default_config_is_valid() {
        let config = BacktestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval().unwrap(), Duration::hours(1));
        assert_eq!(config.max_holding_period().unwrap(), Duration::days(7));
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = BacktestConfig {
            max_concurrent_trades: 0,
            ..BacktestConfig::default()
        };
        assert!(matches!(config.validate(), Err(BacktestError::InvalidConfig(_))));

        let config = BacktestConfig {
            interval_minutes: 0,
            ..BacktestConfig::default()
        };
        assert!(matches!(config.validate(), Err(BacktestError::InvalidInterval(0))));

        let config = BacktestConfig {
            max_capital_fraction: dec!(1.5),
            ..BacktestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_durations_are_errors() {
        let config: BacktestConfig =
            serde_json::from_str(r#"{"interval_minutes": 9000000000000000000}"#).unwrap();
        assert!(matches!(config.interval(), Err(BacktestError::InvalidInterval(_))));
        assert!(matches!(config.validate(), Err(BacktestError::InvalidInterval(_))));

        let config = BacktestConfig {
            max_holding_hours: i64::MAX,
            ..BacktestConfig::default()
        };
        assert!(matches!(config.max_holding_period(), Err(BacktestError::InvalidConfig(_))));
        assert!(config.validate().is_err());
        assert!(Backtester::new(config).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BacktestConfig = serde_json::from_str(r#"{"initial_capital": "500"}"#).unwrap();
        assert_eq!(config.initial_capital, dec!(500));
        assert_eq!(config.max_concurrent_trades, 5);
    }
}
