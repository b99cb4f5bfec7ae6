//! Rolling price history and the technical indicators the bundled
//! strategies use.

use statrs::statistics::Statistics;

/// Bounded history of recent prices and volumes for one pair.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    capacity: usize,
    prices: Vec<f64>,
    volumes: Vec<f64>,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            prices: Vec::with_capacity(capacity),
            volumes: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, price: f64, volume: f64) {
        self.prices.push(price);
        self.volumes.push(volume);
        if self.prices.len() > self.capacity {
            let excess = self.prices.len() - self.capacity;
            self.prices.drain(..excess);
            self.volumes.drain(..excess);
        }
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.last().copied()
    }
}

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(values[values.len() - period..].iter().sum::<f64>() / period as f64)
}

/// Exponential moving average over the last `period` values, seeded with the
/// first value of the window.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let k = 2.0 / (period as f64 + 1.0);
    Some(window[1..].iter().fold(window[0], |acc, v| v * k + acc * (1.0 - k)))
}

/// Relative strength index over the last `period` changes. Neutral (50)
/// until enough history exists.
pub fn rsi(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period + 1 {
        return 50.0;
    }
    let window = &values[values.len() - period - 1..];
    let (gains, losses) = window.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let delta = w[1] - w[0];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Standard score of `current` against `values` (population deviation).
pub fn z_score(values: &[f64], current: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.mean();
    let std_dev = values.population_std_dev();
    if !(std_dev > 0.0) {
        return 0.0;
    }
    (current - mean) / std_dev
}

/// Bollinger bands over the last `period` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Band width relative to the middle band.
    pub fn width(&self) -> f64 {
        if self.middle == 0.0 {
            return 0.0;
        }
        (self.upper - self.lower) / self.middle
    }
}

pub fn bollinger(values: &[f64], period: usize, num_std: f64) -> Option<Bands> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let middle = window.mean();
    let std_dev = window.population_std_dev();
    Some(Bands {
        upper: middle + num_std * std_dev,
        middle,
        lower: middle - num_std * std_dev,
    })
}

/// High/low range of the last `period` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub low: f64,
    pub high: f64,
    pub mean: f64,
}

impl Range {
    /// Range height relative to its mean.
    pub fn relative_size(&self) -> f64 {
        if self.mean == 0.0 {
            return 0.0;
        }
        (self.high - self.low) / self.mean
    }
}

pub fn price_range(values: &[f64], period: usize) -> Option<Range> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(Range {
        low: window.min(),
        high: window.max(),
        mean: window.mean(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_bounded() {
        let mut window = PriceWindow::new(3);
        for i in 0..5 {
            window.push(i as f64, 1.0);
        }
        assert_eq!(window.prices(), &[2.0, 3.0, 4.0]);
        assert_eq!(window.volumes().len(), 3);
        assert_eq!(window.last(), Some(4.0));
    }

    #[test]
    fn test_sma_and_ema() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(sma(&values, 2), Some(3.5));
        assert_eq!(sma(&values, 5), None);
        // Constant input yields the constant
        assert_eq!(ema(&[5.0; 10], 4), Some(5.0));
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(rsi(&rising, 14), 100.0);

        let falling: Vec<f64> = (0..20).rev().map(|i| i as f64).collect();
        assert!(rsi(&falling, 14) < 1e-9);

        assert_eq!(rsi(&[1.0, 2.0], 14), 50.0);
    }

    #[test]
    fn test_z_score() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(z_score(&values, 3.0), 0.0);
        assert!(z_score(&values, 6.0) > 2.0);
        assert_eq!(z_score(&[2.0, 2.0, 2.0], 5.0), 0.0);
    }

    #[test]
    fn test_bollinger_bands() {
        let bands = bollinger(&[10.0, 10.0, 10.0], 3, 2.0).unwrap();
        assert_eq!(bands.middle, 10.0);
        assert_eq!(bands.width(), 0.0);
        assert!(bollinger(&[1.0], 3, 2.0).is_none());
    }

    #[test]
    fn test_price_range() {
        let range = price_range(&[50.0, 99.0, 101.0, 100.0], 3).unwrap();
        assert_eq!(range.low, 99.0);
        assert_eq!(range.high, 101.0);
        assert!((range.relative_size() - 0.02).abs() < 1e-12);
        assert!(price_range(&[1.0], 2).is_none());
    }
}
