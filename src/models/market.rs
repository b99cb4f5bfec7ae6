//! Market samples and strategy signals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TradeDirection;

/// A single price/volume observation for a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Traded pair
    pub pair: String,

    /// Mark price (> 0)
    pub price: Decimal,

    /// Traded volume (>= 0)
    pub volume: Decimal,

    /// Sample time
    pub timestamp: DateTime<Utc>,
}

impl PricePoint {
    pub fn new(pair: impl Into<String>, price: Decimal, volume: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            pair: pair.into(),
            price,
            volume,
            timestamp,
        }
    }
}

/// A strategy's recommendation to open a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Pair to trade
    pub pair: String,

    /// Suggested direction
    pub direction: TradeDirection,

    /// Confidence (0.0 to 1.0)
    pub strength: f64,

    /// Price at which the signal fired
    pub price: Decimal,

    /// When the signal fired
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(point: &PricePoint, direction: TradeDirection, strength: f64) -> Self {
        Self {
            pair: point.pair.clone(),
            direction,
            strength: strength.clamp(0.0, 1.0),
            price: point.price,
            timestamp: point.timestamp,
        }
    }
}
