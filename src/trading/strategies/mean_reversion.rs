//! Fades stretched moves: enters when price sits far outside its rolling
//! distribution and exits once it reverts toward the mean.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StrategyError;
use crate::models::{PricePoint, Signal, SimulatedTrade, TradeDirection};
use crate::trading::indicators::{bollinger, z_score, PriceWindow};
use crate::trading::{Strategy, StrategyConfig, StrategyStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    /// Minimum samples before entries are considered
    pub lookback_period: usize,

    /// |z| at which to enter
    pub z_score_entry: f64,

    /// |z| under which to exit
    pub z_score_exit: f64,

    pub bollinger_period: usize,
    pub bollinger_std: f64,

    /// Minimum relative band width; narrower bands mean no edge
    pub min_band_width: f64,

    /// Samples kept per pair
    pub max_history: usize,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            lookback_period: 20,
            z_score_entry: 2.0,
            z_score_exit: 0.5,
            bollinger_period: 20,
            bollinger_std: 2.0,
            min_band_width: 0.02,
            max_history: 200,
        }
    }
}

pub struct MeanReversionStrategy {
    name: String,
    config: StrategyConfig,
    reversion: MeanReversionConfig,
    windows: HashMap<String, PriceWindow>,
    stats: StrategyStats,
}

impl MeanReversionStrategy {
    pub fn new(config: StrategyConfig, reversion: MeanReversionConfig) -> Self {
        Self {
            name: "Mean Reversion Strategy".to_string(),
            config,
            reversion,
            windows: HashMap::new(),
            stats: StrategyStats::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn stats(&self) -> &StrategyStats {
        &self.stats
    }

    fn required_history(&self) -> usize {
        self.reversion.lookback_period.max(self.reversion.bollinger_period)
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&mut self, point: &PricePoint) -> Result<Option<Signal>, StrategyError> {
        let price = point
            .price
            .to_f64()
            .ok_or_else(|| StrategyError::recoverable(format!("price {} not representable as f64", point.price)))?;

        let required = self.required_history();
        let capacity = self.reversion.max_history.max(required);
        let window = self
            .windows
            .entry(point.pair.clone())
            .or_insert_with(|| PriceWindow::new(capacity));
        window.push(price, 0.0);

        if window.len() < required {
            return Ok(None);
        }

        let r = &self.reversion;
        let z = z_score(window.prices(), price);
        let Some(bands) = bollinger(window.prices(), r.bollinger_period, r.bollinger_std) else {
            return Ok(None);
        };
        if bands.width() <= r.min_band_width {
            return Ok(None);
        }

        let direction = if z <= -r.z_score_entry && price <= bands.lower {
            TradeDirection::Long
        } else if z >= r.z_score_entry && price >= bands.upper {
            TradeDirection::Short
        } else {
            return Ok(None);
        };
        let strength = (z.abs() / r.z_score_entry).min(0.9);

        self.stats.record_signal();
        debug!(pair = %point.pair, direction = %direction, z_score = z, "Mean reversion signal");
        Ok(Some(Signal::new(point, direction, strength)))
    }

    fn should_exit(&mut self, trade: &SimulatedTrade, point: &PricePoint) -> Result<bool, StrategyError> {
        let Some(window) = self.windows.get(&point.pair) else {
            return Ok(false);
        };
        let Some(price) = window.last() else {
            return Ok(false);
        };
        let Some(bands) = bollinger(window.prices(), self.reversion.bollinger_period, self.reversion.bollinger_std)
        else {
            return Ok(false);
        };

        let z = z_score(window.prices(), price);
        let exit = self.reversion.z_score_exit;
        Ok(match trade.direction {
            TradeDirection::Long => z >= -exit || price >= bands.middle,
            TradeDirection::Short => z <= exit || price <= bands.middle,
        })
    }

    fn validate_signal(&self, signal: &Signal) -> bool {
        self.config.accepts(signal)
    }

    fn create_trade_from_signal(&self, signal: &Signal) -> SimulatedTrade {
        self.config.build_trade(signal)
    }

    fn update_performance(&mut self, _trade: &SimulatedTrade, pnl: Decimal) {
        self.stats.record_trade(pnl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn at(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i)
    }

    fn point(i: i64, price: Decimal) -> PricePoint {
        PricePoint::new("ETH/USD", price, dec!(1000), at(i))
    }

    fn oscillate(strategy: &mut MeanReversionStrategy) {
        for i in 0..20 {
            let price = if i % 2 == 0 { dec!(100) } else { dec!(104) };
            assert!(strategy.analyze(&point(i, price)).unwrap().is_none());
        }
    }

    #[test]
    fn test_sharp_drop_triggers_long() {
        let mut strategy = MeanReversionStrategy::new(StrategyConfig::default(), MeanReversionConfig::default());
        oscillate(&mut strategy);

        let signal = strategy.analyze(&point(20, dec!(80))).unwrap().expect("long signal");
        assert_eq!(signal.direction, TradeDirection::Long);
        assert_eq!(signal.strength, 0.9);
    }

    #[test]
    fn test_spike_triggers_short() {
        let mut strategy = MeanReversionStrategy::new(StrategyConfig::default(), MeanReversionConfig::default());
        oscillate(&mut strategy);

        let signal = strategy.analyze(&point(20, dec!(125))).unwrap().expect("short signal");
        assert_eq!(signal.direction, TradeDirection::Short);
    }

    #[test]
    fn test_exits_after_reversion() {
        let mut strategy = MeanReversionStrategy::new(StrategyConfig::default(), MeanReversionConfig::default());
        oscillate(&mut strategy);
        let signal = strategy.analyze(&point(20, dec!(80))).unwrap().unwrap();
        let trade = strategy.create_trade_from_signal(&signal);

        // Still stretched: hold
        assert!(!strategy.should_exit(&trade, &point(20, dec!(80))).unwrap());

        strategy.analyze(&point(21, dec!(101))).unwrap();
        assert!(strategy.should_exit(&trade, &point(21, dec!(101))).unwrap());
    }
}
