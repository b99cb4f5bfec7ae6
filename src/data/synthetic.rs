//! Seeded multiplicative random-walk price generator.
//!
//! `price[t+1] = price[t] * (1 + ε)` with `ε ~ Normal(0, volatility)`, and
//! volume drawn uniformly per step. Every call re-seeds its RNG, so the same
//! inputs always reproduce the same series.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use tracing::debug;

use super::{validate_period, MarketDataSource};
use crate::error::{BacktestError, Result};
use crate::models::PricePoint;

/// Decimal places kept for generated prices and volumes.
const SERIES_DP: u32 = 8;

/// Parameters of the synthetic series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// RNG seed
    pub seed: u64,

    /// Per-step standard deviation of the relative price change
    pub volatility: f64,

    /// Starting price for pairs without an explicit entry in `base_prices`
    pub base_price: Decimal,

    /// Per-pair starting prices
    #[serde(default)]
    pub base_prices: HashMap<String, Decimal>,

    /// Lower bound of the uniform volume draw
    pub volume_min: f64,

    /// Upper bound of the uniform volume draw
    pub volume_max: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            volatility: 0.02,       // 2% per step
            base_price: dec!(1000),
            base_prices: HashMap::new(),
            volume_min: 1000.0,
            volume_max: 5000.0,
        }
    }
}

impl SyntheticConfig {
    /// Starting price for `pair`.
    pub fn base_price_for(&self, pair: &str) -> Decimal {
        self.base_prices.get(pair).copied().unwrap_or(self.base_price)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_price <= Decimal::ZERO {
            return Err(BacktestError::InvalidConfig(format!(
                "base price must be positive, got {}",
                self.base_price
            )));
        }
        if let Some((pair, price)) = self.base_prices.iter().find(|(_, p)| **p <= Decimal::ZERO) {
            return Err(BacktestError::InvalidConfig(format!(
                "base price for {} must be positive, got {}",
                pair, price
            )));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(BacktestError::InvalidConfig(format!(
                "volatility must be a non-negative number, got {}",
                self.volatility
            )));
        }
        if !(self.volume_min >= 0.0 && self.volume_min <= self.volume_max && self.volume_max.is_finite()) {
            return Err(BacktestError::InvalidConfig(format!(
                "volume range must satisfy 0 <= min <= max, got {}..{}",
                self.volume_min, self.volume_max
            )));
        }
        Ok(())
    }
}

/// Synthetic market data source.
#[derive(Debug, Clone, Default)]
pub struct SyntheticSeries {
    config: SyntheticConfig,
}

impl SyntheticSeries {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    /// Replace the seed, e.g. for Monte-Carlo style repeated runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Register an explicit starting price for a pair.
    pub fn with_base_price(mut self, pair: impl Into<String>, price: Decimal) -> Self {
        self.config.base_prices.insert(pair.into(), price);
        self
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Generate the series for `pair` over `[start, end]` at `interval`.
    pub fn generate(
        &self,
        pair: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<PricePoint>> {
        validate_period(start, end, interval)?;
        self.config.validate()?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let noise = if self.config.volatility > 0.0 {
            let normal = Normal::new(0.0, self.config.volatility)
                .map_err(|e| BacktestError::InvalidConfig(format!("volatility: {}", e)))?;
            Some(normal)
        } else {
            None
        };

        let mut price = self
            .config
            .base_price_for(pair)
            .to_f64()
            .ok_or_else(|| BacktestError::InvalidConfig("base price out of range".to_string()))?;

        let mut points = Vec::new();
        let mut timestamp = start;

        while timestamp <= end {
            let epsilon = noise.as_ref().map(|n| n.sample(&mut rng)).unwrap_or(0.0);
            // Keep the multiplier positive so prices never cross zero.
            price *= (1.0 + epsilon).max(f64::EPSILON);

            let volume = if self.config.volume_max > self.config.volume_min {
                rng.gen_range(self.config.volume_min..self.config.volume_max)
            } else {
                self.config.volume_min
            };

            // Rounding must not collapse a tiny positive price to zero.
            let mark = to_decimal(price)?.max(Decimal::new(1, SERIES_DP));
            points.push(PricePoint::new(pair, mark, to_decimal(volume)?, timestamp));

            match timestamp.checked_add_signed(interval) {
                Some(next) => timestamp = next,
                None => break,
            }
        }

        debug!(pair = %pair, points = points.len(), seed = self.config.seed, "Generated synthetic series");
        Ok(points)
    }
}

impl MarketDataSource for SyntheticSeries {
    fn price_series(
        &self,
        pair: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<PricePoint>> {
        self.generate(pair, start, end, interval)
    }
}

fn to_decimal(value: f64) -> Result<Decimal> {
    Decimal::try_from(value)
        .map(|d| d.round_dp(SERIES_DP))
        .map_err(|e| BacktestError::InvalidConfig(format!("value {} not representable: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn period() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (start, start + Duration::days(2))
    }

    #[test]
    fn test_same_seed_reproduces_series() {
        let (start, end) = period();
        let series = SyntheticSeries::default();

        let a = series.generate("ETH/USD", start, end, Duration::hours(1)).unwrap();
        let b = series.generate("ETH/USD", start, end, Duration::hours(1)).unwrap();

        assert_eq!(a, b);
        // start..=end inclusive at hourly steps
        assert_eq!(a.len(), 49);
    }

    #[test]
    fn test_different_seed_changes_series() {
        let (start, end) = period();
        let a = SyntheticSeries::default()
            .generate("ETH/USD", start, end, Duration::hours(1))
            .unwrap();
        let b = SyntheticSeries::default()
            .with_seed(7)
            .generate("ETH/USD", start, end, Duration::hours(1))
            .unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_points_are_ordered_and_valid() {
        let (start, end) = period();
        let points = SyntheticSeries::default()
            .generate("BTC/USD", start, end, Duration::minutes(30))
            .unwrap();

        assert_eq!(points.first().unwrap().timestamp, start);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(points.iter().all(|p| p.price > Decimal::ZERO));
        assert!(points
            .iter()
            .all(|p| p.volume >= dec!(1000) && p.volume <= dec!(5000)));
    }

    #[test]
    fn test_explicit_base_price_per_pair() {
        let (start, end) = period();
        let series = SyntheticSeries::new(SyntheticConfig {
            volatility: 0.0,
            ..SyntheticConfig::default()
        })
        .with_base_price("BTC/USD", dec!(40000));

        let btc = series.generate("BTC/USD", start, end, Duration::hours(6)).unwrap();
        let other = series.generate("ETHBTC/USD", start, end, Duration::hours(6)).unwrap();

        assert!(btc.iter().all(|p| p.price == dec!(40000)));
        // No inference from the pair name
        assert!(other.iter().all(|p| p.price == dec!(1000)));
    }

    #[test]
    fn test_stops_at_the_last_representable_time() {
        let end = DateTime::<Utc>::MAX_UTC;
        let start = end - Duration::hours(2);

        let points = SyntheticSeries::default()
            .generate("ETH/USD", start, end, Duration::minutes(90))
            .unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (start, end) = period();
        let series = SyntheticSeries::default();

        assert!(matches!(
            series.generate("ETH/USD", end, start, Duration::hours(1)),
            Err(BacktestError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            series.generate("ETH/USD", start, end, Duration::zero()),
            Err(BacktestError::InvalidInterval(_))
        ));

        let negative = SyntheticSeries::new(SyntheticConfig {
            base_price: dec!(-1),
            ..SyntheticConfig::default()
        });
        assert!(matches!(
            negative.generate("ETH/USD", start, end, Duration::hours(1)),
            Err(BacktestError::InvalidConfig(_))
        ));
    }
}
