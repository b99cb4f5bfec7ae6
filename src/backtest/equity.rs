//! Capital curve with a high-water-mark drawdown tracker.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::EquitySample;

/// Tracks capital, peak capital and drawdown across realized P&L events.
///
/// Current drawdown resets only when capital makes a new peak; the maximum
/// drawdown never decreases.
#[derive(Debug, Clone)]
pub struct EquityTracker {
    capital: Decimal,
    peak: Decimal,
    current_drawdown: f64,
    max_drawdown: f64,
    curve: Vec<EquitySample>,
    returns: Vec<f64>,
}

impl EquityTracker {
    pub fn new(initial_capital: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            capital: initial_capital,
            peak: initial_capital,
            current_drawdown: 0.0,
            max_drawdown: 0.0,
            curve: vec![EquitySample {
                timestamp: at,
                capital: initial_capital,
            }],
            returns: Vec::new(),
        }
    }

    /// Apply a realized P&L and record the resulting equity sample.
    pub fn apply(&mut self, pnl: Decimal, at: DateTime<Utc>) {
        let previous = self.capital;
        self.capital += pnl;

        if self.capital > self.peak {
            self.peak = self.capital;
            self.current_drawdown = 0.0;
        } else if self.peak > Decimal::ZERO {
            self.current_drawdown = ((self.peak - self.capital) / self.peak)
                .to_f64()
                .unwrap_or(0.0)
                * 100.0;
            self.max_drawdown = self.max_drawdown.max(self.current_drawdown);
        }

        // Returns are undefined against a non-positive base
        if previous > Decimal::ZERO {
            self.returns.push((pnl / previous).to_f64().unwrap_or(0.0));
        }

        self.curve.push(EquitySample {
            timestamp: at,
            capital: self.capital,
        });
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    pub fn peak(&self) -> Decimal {
        self.peak
    }

    /// Drawdown from the peak after the latest event, in percent.
    pub fn current_drawdown(&self) -> f64 {
        self.current_drawdown
    }

    /// Largest drawdown seen so far, in percent.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn curve(&self) -> &[EquitySample] {
        &self.curve
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn into_parts(self) -> (Vec<EquitySample>, Vec<f64>) {
        (self.curve, self.returns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_drawdown_follows_high_water_mark() {
        let now = Utc::now();
        let mut equity = EquityTracker::new(dec!(1000), now);

        equity.apply(dec!(100), now); // 1100, new peak
        assert_eq!(equity.current_drawdown(), 0.0);

        equity.apply(dec!(-220), now); // 880, 20% below peak
        assert!((equity.current_drawdown() - 20.0).abs() < 1e-9);

        equity.apply(dec!(110), now); // 990, 10% below peak
        assert!((equity.current_drawdown() - 10.0).abs() < 1e-9);
        assert!((equity.max_drawdown() - 20.0).abs() < 1e-9);

        equity.apply(dec!(200), now); // 1190, new peak
        assert_eq!(equity.current_drawdown(), 0.0);
        assert!((equity.max_drawdown() - 20.0).abs() < 1e-9);
        assert_eq!(equity.peak(), dec!(1190));
    }

    #[test]
    fn test_curve_and_returns() {
        let now = Utc::now();
        let mut equity = EquityTracker::new(dec!(1000), now);
        equity.apply(dec!(50), now);
        equity.apply(dec!(-105), now);

        let capitals: Vec<_> = equity.curve().iter().map(|s| s.capital).collect();
        assert_eq!(capitals, vec![dec!(1000), dec!(1050), dec!(945)]);
        assert_eq!(equity.returns().len(), 2);
        assert!((equity.returns()[0] - 0.05).abs() < 1e-12);
        assert!((equity.returns()[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_no_return_from_non_positive_base() {
        let now = Utc::now();
        let mut equity = EquityTracker::new(dec!(10), now);
        equity.apply(dec!(-10), now);
        equity.apply(dec!(5), now);

        assert_eq!(equity.returns().len(), 1);
        assert_eq!(equity.curve().len(), 3);
        assert_eq!(equity.capital(), dec!(5));
    }

    proptest! {
        #[test]
        fn prop_final_capital_is_initial_plus_pnl(
            pnls in prop::collection::vec(-500i64..500, 0..50)
        ) {
            let now = Utc::now();
            let initial = dec!(10000);
            let mut equity = EquityTracker::new(initial, now);
            for cents in &pnls {
                equity.apply(Decimal::new(*cents, 2), now);
            }

            let total: Decimal = pnls.iter().map(|c| Decimal::new(*c, 2)).sum();
            prop_assert_eq!(equity.capital(), initial + total);
            prop_assert_eq!(equity.curve().len(), pnls.len() + 1);
        }

        #[test]
        fn prop_max_drawdown_never_decreases(
            pnls in prop::collection::vec(-2000i64..2000, 1..50)
        ) {
            let now = Utc::now();
            let mut equity = EquityTracker::new(dec!(10000), now);
            let mut previous_max = 0.0;
            let mut running_peak = dec!(10000);

            for cents in pnls {
                equity.apply(Decimal::new(cents, 2), now);
                prop_assert!(equity.max_drawdown() >= previous_max);
                if equity.capital() > running_peak {
                    running_peak = equity.capital();
                    prop_assert_eq!(equity.current_drawdown(), 0.0);
                }
                previous_max = equity.max_drawdown();
            }
        }
    }
}
