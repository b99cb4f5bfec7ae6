//! Replays a caller-supplied price series.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::{validate_period, MarketDataSource};
use crate::error::Result;
use crate::models::PricePoint;

/// A fixed, pre-built series. Useful for deterministic scenarios and for
/// feeding externally prepared data through the engine.
#[derive(Debug, Clone, Default)]
pub struct ReplaySeries {
    points: Vec<PricePoint>,
}

impl ReplaySeries {
    /// Wrap existing points. They are sorted by timestamp.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    /// Build a series for `pair` from bare prices spaced `interval` apart.
    pub fn from_prices(pair: &str, start: DateTime<Utc>, interval: Duration, prices: &[Decimal]) -> Self {
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, price)| PricePoint::new(pair, *price, Decimal::ZERO, start + interval * i as i32))
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl MarketDataSource for ReplaySeries {
    /// Points of `pair` inside `[start, end]`; `interval` only participates in
    /// validation since the series is already sampled.
    fn price_series(
        &self,
        pair: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<PricePoint>> {
        validate_period(start, end, interval)?;

        Ok(self
            .points
            .iter()
            .filter(|p| p.pair == pair && p.timestamp >= start && p.timestamp <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_replay_filters_pair_and_period() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let series = ReplaySeries::from_prices(
            "TEST/USD",
            start,
            Duration::hours(1),
            &[dec!(100), dec!(102), dec!(101), dec!(105), dec!(103)],
        );

        let all = series
            .price_series("TEST/USD", start, start + Duration::hours(4), Duration::hours(1))
            .unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[3].price, dec!(105));

        let tail = series
            .price_series("TEST/USD", start + Duration::hours(2), start + Duration::hours(10), Duration::hours(1))
            .unwrap();
        assert_eq!(tail.len(), 3);

        let other = series
            .price_series("ETH/USD", start, start + Duration::hours(4), Duration::hours(1))
            .unwrap();
        assert!(other.is_empty());
    }
}
