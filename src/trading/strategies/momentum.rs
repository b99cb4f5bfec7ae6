//! Trend-following entries confirmed by RSI, MACD, moving averages and volume.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StrategyError;
use crate::models::{PricePoint, Signal, SimulatedTrade, TradeDirection};
use crate::trading::indicators::{ema, rsi, sma, PriceWindow};
use crate::trading::{Strategy, StrategyConfig, StrategyStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub ma_short: usize,
    pub ma_long: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,

    /// Samples averaged for volume confirmation
    pub volume_lookback: usize,

    /// Current volume must exceed the recent average by this factor
    pub volume_threshold: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            ma_short: 10,
            ma_long: 50,
            macd_fast: 12,
            macd_slow: 26,
            volume_lookback: 19,
            volume_threshold: 1.5,
        }
    }
}

impl MomentumConfig {
    fn history_len(&self) -> usize {
        self.ma_long
            .max(self.macd_slow)
            .max(self.rsi_period + 1)
            .max(self.volume_lookback + 1)
    }
}

pub struct MomentumStrategy {
    name: String,
    config: StrategyConfig,
    momentum: MomentumConfig,
    windows: HashMap<String, PriceWindow>,
    stats: StrategyStats,
}

impl MomentumStrategy {
    pub fn new(config: StrategyConfig, momentum: MomentumConfig) -> Self {
        Self {
            name: "Momentum Strategy".to_string(),
            config,
            momentum,
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

    fn volume_confirmed(&self, volumes: &[f64]) -> bool {
        let lookback = self.momentum.volume_lookback;
        if lookback == 0 || volumes.len() < lookback + 1 {
            return false;
        }
        let (history, current) = volumes.split_at(volumes.len() - 1);
        let average = history[history.len() - lookback..].iter().sum::<f64>() / lookback as f64;
        current[0] >= average * self.momentum.volume_threshold
    }

    /// Direction and strength implied by the current window, if any.
    fn evaluate(&self, window: &PriceWindow) -> Option<(TradeDirection, f64)> {
        let m = &self.momentum;
        let prices = window.prices();
        let price = window.last()?;

        let ma_short = sma(prices, m.ma_short)?;
        let ma_long = sma(prices, m.ma_long)?;
        let macd = ema(prices, m.macd_fast)? - ema(prices, m.macd_slow)?;
        let rsi = rsi(prices, m.rsi_period);

        if !self.volume_confirmed(window.volumes()) {
            return None;
        }

        if rsi > 50.0 && rsi < m.rsi_overbought && macd > 0.0 && ma_short > ma_long && price > ma_short {
            return Some((TradeDirection::Long, ((rsi - 50.0) / 50.0 + 0.5).min(0.9)));
        }
        if rsi < 50.0 && rsi > m.rsi_oversold && macd < 0.0 && ma_short < ma_long && price < ma_short {
            return Some((TradeDirection::Short, ((50.0 - rsi) / 50.0 + 0.5).min(0.9)));
        }
        None
    }
}

fn to_f64(value: Decimal, what: &str) -> Result<f64, StrategyError> {
    value
        .to_f64()
        .ok_or_else(|| StrategyError::recoverable(format!("{} {} not representable as f64", what, value)))
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&mut self, point: &PricePoint) -> Result<Option<Signal>, StrategyError> {
        let price = to_f64(point.price, "price")?;
        let volume = to_f64(point.volume, "volume")?;

        let capacity = self.momentum.history_len();
        let window = self
            .windows
            .entry(point.pair.clone())
            .or_insert_with(|| PriceWindow::new(capacity));
        window.push(price, volume);

        let Some(window) = self.windows.get(&point.pair) else {
            return Ok(None);
        };
        let Some((direction, strength)) = self.evaluate(window) else {
            return Ok(None);
        };

        self.stats.record_signal();
        debug!(pair = %point.pair, direction = %direction, strength, "Momentum signal");
        Ok(Some(Signal::new(point, direction, strength)))
    }

    fn should_exit(&mut self, trade: &SimulatedTrade, point: &PricePoint) -> Result<bool, StrategyError> {
        let Some(window) = self.windows.get(&point.pair) else {
            return Ok(false);
        };
        if window.len() < self.momentum.rsi_period {
            return Ok(false);
        }

        let rsi = rsi(window.prices(), self.momentum.rsi_period);
        Ok(match trade.direction {
            TradeDirection::Long => rsi > self.momentum.rsi_overbought || rsi < 45.0,
            TradeDirection::Short => rsi < self.momentum.rsi_oversold || rsi > 55.0,
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
        debug!(strategy = %self.name, pnl = %pnl, win_rate = self.stats.win_rate(), "Performance updated");
    }
}
