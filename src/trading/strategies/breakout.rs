//! Trades breakouts from a tight consolidation range on rising volume, and
//! exits when the move fails back through the broken level.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StrategyError;
use crate::models::{PricePoint, Signal, SimulatedTrade, TradeDirection};
use crate::trading::indicators::{price_range, sma, PriceWindow};
use crate::trading::{Strategy, StrategyConfig, StrategyStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    /// Samples forming the consolidation range
    pub lookback_period: usize,

    /// Relative distance beyond the range edge that counts as a breakout
    pub breakout_threshold: f64,

    /// Breakout volume must reach this multiple of the average volume
    pub volume_multiplier: f64,

    pub volume_lookback: usize,

    /// Largest relative range height still considered a consolidation
    pub min_range_size: f64,

    /// Relative distance back through the broken level that marks a failed breakout
    pub false_breakout_buffer: f64,

    /// Samples kept per pair
    pub max_history: usize,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            lookback_period: 20,
            breakout_threshold: 0.02,
            volume_multiplier: 1.5,
            volume_lookback: 20,
            min_range_size: 0.01,
            false_breakout_buffer: 0.02,
            max_history: 200,
        }
    }
}

pub struct BreakoutStrategy {
    name: String,
    config: StrategyConfig,
    breakout: BreakoutConfig,
    windows: HashMap<String, PriceWindow>,
    /// Last broken level per pair, with the side it was broken to
    levels: HashMap<String, (TradeDirection, f64)>,
    stats: StrategyStats,
}

impl BreakoutStrategy {
    pub fn new(config: StrategyConfig, breakout: BreakoutConfig) -> Self {
        Self {
            name: "Breakout Strategy".to_string(),
            config,
            breakout,
            windows: HashMap::new(),
            levels: HashMap::new(),
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

    /// Level last broken on `pair`.
    pub fn breakout_level(&self, pair: &str) -> Option<f64> {
        self.levels.get(pair).map(|(_, level)| *level)
    }

    fn is_consolidating(&self, prices: &[f64]) -> bool {
        price_range(prices, self.breakout.lookback_period)
            .is_some_and(|range| range.relative_size() < self.breakout.min_range_size)
    }
}

fn to_f64(value: Decimal, what: &str) -> Result<f64, StrategyError> {
    value
        .to_f64()
        .ok_or_else(|| StrategyError::recoverable(format!("{} {} not representable as f64", what, value)))
}

impl Strategy for BreakoutStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&mut self, point: &PricePoint) -> Result<Option<Signal>, StrategyError> {
        let b = &self.breakout;
        if !(b.breakout_threshold > 0.0) || b.lookback_period == 0 {
            return Err(StrategyError::fatal(
                "breakout threshold and lookback period must be positive",
            ));
        }
        let price = to_f64(point.price, "price")?;
        let volume = to_f64(point.volume, "volume")?;

        let capacity = b.max_history.max(b.lookback_period + 1);
        let window = self
            .windows
            .entry(point.pair.clone())
            .or_insert_with(|| PriceWindow::new(capacity));
        window.push(price, volume);

        // The range is the consolidation before the current sample
        let n = window.len();
        let prior = &window.prices()[..n - 1];
        let Some(range) = price_range(prior, b.lookback_period) else {
            return Ok(None);
        };
        if range.relative_size() >= b.min_range_size {
            return Ok(None);
        }

        let prior_volumes = &window.volumes()[..n - 1];
        let avg_volume = sma(prior_volumes, b.volume_lookback.min(prior_volumes.len())).unwrap_or(0.0);
        if volume < avg_volume * b.volume_multiplier {
            return Ok(None);
        }

        let (direction, level, excess) = if price > range.high * (1.0 + b.breakout_threshold) {
            (TradeDirection::Long, range.high, (price - range.high) / range.high)
        } else if price < range.low * (1.0 - b.breakout_threshold) {
            (TradeDirection::Short, range.low, (range.low - price) / range.low)
        } else {
            return Ok(None);
        };
        // 0.6 right at the threshold, capped at 0.9
        let strength = (0.6 * excess / b.breakout_threshold).min(0.9);

        self.levels.insert(point.pair.clone(), (direction, level));
        self.stats.record_signal();
        debug!(
            pair = %point.pair,
            direction = %direction,
            level = level,
            volume_ratio = volume / avg_volume.max(f64::EPSILON),
            "Breakout signal"
        );
        Ok(Some(Signal::new(point, direction, strength)))
    }

    fn should_exit(&mut self, trade: &SimulatedTrade, point: &PricePoint) -> Result<bool, StrategyError> {
        let price = to_f64(point.price, "price")?;
        let buffer = self.breakout.false_breakout_buffer;

        if let Some((direction, level)) = self.levels.get(&point.pair) {
            if *direction == trade.direction {
                let failed = match trade.direction {
                    TradeDirection::Long => price < level * (1.0 - buffer),
                    TradeDirection::Short => price > level * (1.0 + buffer),
                };
                if failed {
                    debug!(pair = %point.pair, level = *level, price = price, "False breakout");
                    return Ok(true);
                }
            }
        }

        // Momentum is gone once price settles back into a tight range
        Ok(self
            .windows
            .get(&point.pair)
            .is_some_and(|window| self.is_consolidating(window.prices())))
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

    fn point(i: i64, price: Decimal, volume: Decimal) -> PricePoint {
        PricePoint::new("ETH/USD", price, volume, at(i))
    }

    /// Twenty samples inside a 0.4% range on flat volume.
    fn consolidated() -> BreakoutStrategy {
        let mut strategy = BreakoutStrategy::new(StrategyConfig::default(), BreakoutConfig::default());
        for i in 0..20 {
            let price = if i % 2 == 0 { dec!(100) } else { dec!(100.4) };
            assert!(strategy.analyze(&point(i, price, dec!(1000))).unwrap().is_none());
        }
        strategy
    }

    #[test]
    fn test_upside_breakout_on_volume_goes_long() {
        let mut strategy = consolidated();

        let signal = strategy
            .analyze(&point(20, dec!(103), dec!(2000)))
            .unwrap()
            .expect("long signal");
        assert_eq!(signal.direction, TradeDirection::Long);
        assert!(signal.strength > 0.6 && signal.strength < 0.9);
        let level = strategy.breakout_level("ETH/USD").unwrap();
        assert!((level - 100.4).abs() < 1e-9);
    }

    #[test]
    fn test_downside_breakout_goes_short() {
        let mut strategy = consolidated();

        let signal = strategy
            .analyze(&point(20, dec!(97.5), dec!(2000)))
            .unwrap()
            .expect("short signal");
        assert_eq!(signal.direction, TradeDirection::Short);
        assert!((signal.strength - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_breakout_needs_volume_and_a_tight_range() {
        let mut strategy = consolidated();
        assert!(strategy.analyze(&point(20, dec!(103), dec!(1000))).unwrap().is_none());

        // The unconfirmed move widened the range, so no consolidation remains
        assert!(strategy.analyze(&point(21, dec!(106), dec!(5000))).unwrap().is_none());
    }

    #[test]
    fn test_exits_on_failed_breakout() {
        let mut strategy = consolidated();
        let signal = strategy.analyze(&point(20, dec!(103), dec!(2000))).unwrap().unwrap();
        let trade = strategy.create_trade_from_signal(&signal);

        let holding = point(21, dec!(104), dec!(1000));
        strategy.analyze(&holding).unwrap();
        assert!(!strategy.should_exit(&trade, &holding).unwrap());

        let failed = point(22, dec!(98), dec!(1000));
        strategy.analyze(&failed).unwrap();
        assert!(strategy.should_exit(&trade, &failed).unwrap());
    }
}
