//! Dollar-cost averaging: enter at fixed simulation-time intervals,
//! regardless of price.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StrategyError;
use crate::models::{PricePoint, Signal, SimulatedTrade, TradeDirection};
use crate::trading::{Strategy, StrategyConfig, StrategyStats};

/// Which side DCA entries take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DcaDirection {
    Long,
    Short,
    /// Alternate long and short entries
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaConfig {
    /// Minutes between entries on the same pair
    pub interval_minutes: i64,

    pub direction: DcaDirection,
}

impl Default for DcaConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            direction: DcaDirection::Long,
        }
    }
}

pub struct DcaStrategy {
    name: String,
    config: StrategyConfig,
    dca: DcaConfig,
    last_entry: HashMap<String, DateTime<Utc>>,
    entries: u64,
    stats: StrategyStats,
}

impl DcaStrategy {
    pub fn new(config: StrategyConfig, dca: DcaConfig) -> Self {
        Self {
            name: "DCA Strategy".to_string(),
            config,
            dca,
            last_entry: HashMap::new(),
            entries: 0,
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

    fn next_direction(&self) -> TradeDirection {
        match self.dca.direction {
            DcaDirection::Long => TradeDirection::Long,
            DcaDirection::Short => TradeDirection::Short,
            DcaDirection::Both if self.entries % 2 == 0 => TradeDirection::Long,
            DcaDirection::Both => TradeDirection::Short,
        }
    }
}

impl Strategy for DcaStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&mut self, point: &PricePoint) -> Result<Option<Signal>, StrategyError> {
        let Some(interval) = Duration::try_minutes(self.dca.interval_minutes).filter(|i| *i > Duration::zero())
        else {
            return Err(StrategyError::fatal(format!(
                "DCA interval must be positive and in range, got {} minutes",
                self.dca.interval_minutes
            )));
        };

        let strength = match self.last_entry.get(&point.pair) {
            Some(last) => {
                let elapsed = point.timestamp - *last;
                if elapsed < interval {
                    return Ok(None);
                }
                (elapsed.num_seconds() as f64 / interval.num_seconds() as f64).min(1.0)
            }
            None => 1.0,
        };

        let signal = Signal::new(point, self.next_direction(), strength);
        self.last_entry.insert(point.pair.clone(), point.timestamp);
        self.entries += 1;
        self.stats.record_signal();

        debug!(pair = %point.pair, direction = %signal.direction, price = %point.price, "DCA signal");
        Ok(Some(signal))
    }

    /// DCA has no exit rule of its own; stops and the holding limit apply.
    fn should_exit(&mut self, _trade: &SimulatedTrade, _point: &PricePoint) -> Result<bool, StrategyError> {
        Ok(false)
    }

    fn validate_signal(&self, signal: &Signal) -> bool {
        self.config.accepts(signal)
    }

    fn create_trade_from_signal(&self, signal: &Signal) -> SimulatedTrade {
        self.config.build_trade(signal)
    }

    fn update_performance(&mut self, _trade: &SimulatedTrade, pnl: Decimal) {
        self.stats.record_trade(pnl);
        debug!(strategy = %self.name, pnl = %pnl, total = %self.stats.total_pnl, "Performance updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn point(minutes: i64) -> PricePoint {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PricePoint::new("ETH/USD", dec!(2000), dec!(1000), start + Duration::minutes(minutes))
    }

    #[test]
    fn test_signals_respect_interval() {
        let mut dca = DcaStrategy::new(StrategyConfig::default(), DcaConfig::default());

        assert!(dca.analyze(&point(0)).unwrap().is_some());
        assert!(dca.analyze(&point(30)).unwrap().is_none());
        let signal = dca.analyze(&point(60)).unwrap().unwrap();
        assert_eq!(signal.strength, 1.0);
        assert_eq!(dca.stats().signals_generated, 2);
    }

    #[test]
    fn test_both_alternates_direction() {
        let mut dca = DcaStrategy::new(
            StrategyConfig::default(),
            DcaConfig {
                interval_minutes: 60,
                direction: DcaDirection::Both,
            },
        );

        let first = dca.analyze(&point(0)).unwrap().unwrap();
        let second = dca.analyze(&point(60)).unwrap().unwrap();
        assert_eq!(first.direction, TradeDirection::Long);
        assert_eq!(second.direction, TradeDirection::Short);
    }

    #[test]
    fn test_non_positive_interval_is_fatal() {
        let mut dca = DcaStrategy::new(
            StrategyConfig::default(),
            DcaConfig {
                interval_minutes: 0,
                direction: DcaDirection::Long,
            },
        );
        assert!(dca.analyze(&point(0)).unwrap_err().is_fatal());

        let mut dca = DcaStrategy::new(
            StrategyConfig::default(),
            DcaConfig {
                interval_minutes: i64::MAX,
                direction: DcaDirection::Long,
            },
        );
        assert!(dca.analyze(&point(0)).unwrap_err().is_fatal());
    }
}
