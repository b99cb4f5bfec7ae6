//! Shared strategy parameters.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{Signal, SimulatedTrade, TradeDirection};

/// Parameters common to every strategy: which pairs it trades, how it sizes
/// and leverages positions, and where it places stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Disabled strategies reject every signal
    pub enabled: bool,

    /// Pairs the strategy may trade (empty = any pair)
    #[serde(default)]
    pub pairs: Vec<String>,

    /// Leverage applied to new positions
    pub leverage: u32,

    /// Collateral requested per position
    pub position_size: Decimal,

    /// Minimum signal strength (0.0 to 1.0) to act on
    pub min_signal_strength: f64,

    /// Stop-loss distance from entry (e.g., 0.05 = 5%); zero disables
    pub stop_loss_pct: Decimal,

    /// Take-profit distance from entry (e.g., 0.10 = 10%); zero disables
    pub take_profit_pct: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pairs: Vec::new(),
            leverage: 10,
            position_size: dec!(10),
            min_signal_strength: 0.6,
            stop_loss_pct: dec!(0.05),   // 5% stop
            take_profit_pct: dec!(0.10), // 10% target
        }
    }
}

impl StrategyConfig {
    /// Restrict the strategy to the given pairs.
    pub fn for_pairs<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pairs = pairs.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the strategy trades `pair`.
    pub fn trades_pair(&self, pair: &str) -> bool {
        self.pairs.is_empty() || self.pairs.iter().any(|p| p == pair)
    }

    /// Generic signal checks shared by all strategies.
    pub fn accepts(&self, signal: &Signal) -> bool {
        self.enabled
            && self.trades_pair(&signal.pair)
            && signal.strength >= self.min_signal_strength
            && signal.price > Decimal::ZERO
    }

    pub fn stop_loss_for(&self, direction: TradeDirection, price: Decimal) -> Option<Decimal> {
        if self.stop_loss_pct <= Decimal::ZERO {
            return None;
        }
        Some(match direction {
            TradeDirection::Long => price * (Decimal::ONE - self.stop_loss_pct),
            TradeDirection::Short => price * (Decimal::ONE + self.stop_loss_pct),
        })
    }

    pub fn take_profit_for(&self, direction: TradeDirection, price: Decimal) -> Option<Decimal> {
        if self.take_profit_pct <= Decimal::ZERO {
            return None;
        }
        Some(match direction {
            TradeDirection::Long => price * (Decimal::ONE + self.take_profit_pct),
            TradeDirection::Short => price * (Decimal::ONE - self.take_profit_pct),
        })
    }

    /// Build an open trade for `signal` with this config's size, leverage and stops.
    pub fn build_trade(&self, signal: &Signal) -> SimulatedTrade {
        let mut trade = SimulatedTrade::new(
            signal.pair.clone(),
            signal.direction,
            signal.price,
            self.position_size,
            self.leverage,
            signal.timestamp,
        );
        trade.stop_loss = self.stop_loss_for(signal.direction, signal.price);
        trade.take_profit = self.take_profit_for(signal.direction, signal.price);
        trade
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn signal(direction: TradeDirection, strength: f64) -> Signal {
        Signal {
            pair: "ETH/USD".to_string(),
            direction,
            strength,
            price: dec!(2000),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_accepts_checks_pair_and_strength() {
        let config = StrategyConfig::default().for_pairs(["ETH/USD"]);

        assert!(config.accepts(&signal(TradeDirection::Long, 0.7)));
        assert!(!config.accepts(&signal(TradeDirection::Long, 0.5)));

        let other = StrategyConfig::default().for_pairs(["BTC/USD"]);
        assert!(!other.accepts(&signal(TradeDirection::Long, 0.9)));

        let disabled = StrategyConfig {
            enabled: false,
            ..StrategyConfig::default()
        };
        assert!(!disabled.accepts(&signal(TradeDirection::Long, 0.9)));
    }

    #[test]
    fn test_build_trade_places_stops_by_direction() {
        let config = StrategyConfig::default();

        let long = config.build_trade(&signal(TradeDirection::Long, 0.8));
        assert_eq!(long.stop_loss, Some(dec!(1900)));
        assert_eq!(long.take_profit, Some(dec!(2200)));
        assert_eq!(long.leverage, 10);
        assert_eq!(long.size, dec!(10));

        let short = config.build_trade(&signal(TradeDirection::Short, 0.8));
        assert_eq!(short.stop_loss, Some(dec!(2100)));
        assert_eq!(short.take_profit, Some(dec!(1800)));
    }

    #[test]
    fn test_zero_pct_disables_stops() {
        let config = StrategyConfig {
            stop_loss_pct: Decimal::ZERO,
            take_profit_pct: Decimal::ZERO,
            ..StrategyConfig::default()
        };
        let trade = config.build_trade(&signal(TradeDirection::Long, 0.8));
        assert!(trade.stop_loss.is_none());
        assert!(trade.take_profit.is_none());
    }
}
