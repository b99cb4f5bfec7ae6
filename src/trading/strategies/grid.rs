//! Grid trading: fixed price levels around an anchor, buying below it and
//! selling above it, each level filled at most once.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StrategyError;
use crate::models::{PricePoint, Signal, SimulatedTrade, TradeDirection};
use crate::trading::{Strategy, StrategyConfig, StrategyStats};

/// Confidence attached to every grid entry.
const GRID_SIGNAL_STRENGTH: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Total levels, split evenly below and above the anchor
    pub levels: u32,

    /// Relative distance between adjacent levels (0.01 = 1%)
    pub spacing: Decimal,

    /// Grid centre; the first price seen on a pair when unset
    pub anchor_price: Option<Decimal>,

    /// How close to a level price must come, relative to price, to fill it
    pub fill_tolerance: Decimal,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            levels: 10,
            spacing: dec!(0.01),
            anchor_price: None,
            fill_tolerance: dec!(0.001),
        }
    }
}

/// Grid of one pair.
#[derive(Debug, Clone)]
struct PairGrid {
    anchor: Decimal,
    /// Signed level index: negative below the anchor, positive above
    filled: HashSet<i64>,
}

pub struct GridStrategy {
    name: String,
    config: StrategyConfig,
    grid: GridConfig,
    pairs: HashMap<String, PairGrid>,
    stats: StrategyStats,
}

impl GridStrategy {
    pub fn new(config: StrategyConfig, grid: GridConfig) -> Self {
        Self {
            name: "Grid Strategy".to_string(),
            config,
            grid,
            pairs: HashMap::new(),
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

    /// Number of filled levels on `pair`.
    pub fn filled_levels(&self, pair: &str) -> usize {
        self.pairs.get(pair).map_or(0, |g| g.filled.len())
    }

    /// Forget the grid of `pair`; it is rebuilt around the next anchor.
    pub fn reset_grid(&mut self, pair: &str) {
        if self.pairs.remove(pair).is_some() {
            info!(pair = %pair, "Grid reset");
        }
    }

    /// Price of the signed level `index` around `anchor`.
    fn level_price(&self, anchor: Decimal, index: i64) -> Decimal {
        anchor * (Decimal::ONE + Decimal::from(index) * self.grid.spacing)
    }

    /// Nearest level to `price`; ties go to the buy side.
    fn nearest_level(&self, anchor: Decimal, price: Decimal) -> Option<(i64, Decimal)> {
        let half = i64::from(self.grid.levels / 2);
        (1..=half)
            .map(|i| -i)
            .chain(1..=half)
            .map(|index| (index, self.level_price(anchor, index)))
            .min_by_key(|(_, level)| (price - *level).abs())
    }
}

impl Strategy for GridStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&mut self, point: &PricePoint) -> Result<Option<Signal>, StrategyError> {
        if self.grid.spacing <= Decimal::ZERO {
            return Err(StrategyError::fatal(format!(
                "grid spacing must be positive, got {}",
                self.grid.spacing
            )));
        }

        let anchor = self.grid.anchor_price.unwrap_or(point.price);
        let anchor = self
            .pairs
            .entry(point.pair.clone())
            .or_insert_with(|| PairGrid {
                anchor,
                filled: HashSet::new(),
            })
            .anchor;

        let Some((index, level)) = self.nearest_level(anchor, point.price) else {
            return Ok(None);
        };
        if (point.price - level).abs() > point.price * self.grid.fill_tolerance {
            return Ok(None);
        }

        let Some(grid) = self.pairs.get_mut(&point.pair) else {
            return Ok(None);
        };
        if !grid.filled.insert(index) {
            return Ok(None);
        }

        let direction = if index < 0 {
            TradeDirection::Long
        } else {
            TradeDirection::Short
        };
        self.stats.record_signal();
        debug!(
            pair = %point.pair,
            direction = %direction,
            level = %level,
            filled = grid.filled.len(),
            "Grid signal"
        );
        Ok(Some(Signal::new(point, direction, GRID_SIGNAL_STRENGTH)))
    }

    /// Take profit one grid step away from entry.
    fn should_exit(&mut self, trade: &SimulatedTrade, point: &PricePoint) -> Result<bool, StrategyError> {
        Ok(match trade.direction {
            TradeDirection::Long => point.price >= trade.entry_price * (Decimal::ONE + self.grid.spacing),
            TradeDirection::Short => point.price <= trade.entry_price * (Decimal::ONE - self.grid.spacing),
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
