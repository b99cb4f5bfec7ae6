//! Market data sources feeding the backtester.

mod replay;
mod synthetic;

use chrono::{DateTime, Duration, Utc};

use crate::error::{BacktestError, Result};
use crate::models::PricePoint;

pub use replay::ReplaySeries;
pub use synthetic::{SyntheticConfig, SyntheticSeries};

/// Anything that can produce an ordered price series for a pair and period.
///
/// Implementations must return points in strictly increasing timestamp order.
pub trait MarketDataSource: Send + Sync {
    fn price_series(
        &self,
        pair: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<PricePoint>>;
}

/// Reject empty/inverted periods and non-positive intervals.
pub fn validate_period(start: DateTime<Utc>, end: DateTime<Utc>, interval: Duration) -> Result<()> {
    if end <= start {
        return Err(BacktestError::InvalidDateRange { start, end });
    }
    if interval <= Duration::zero() {
        return Err(BacktestError::InvalidInterval(interval.num_seconds()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_period() {
        let start = Utc::now();
        assert!(validate_period(start, start + Duration::days(1), Duration::hours(1)).is_ok());
        assert!(matches!(
            validate_period(start, start, Duration::hours(1)),
            Err(BacktestError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            validate_period(start, start + Duration::days(1), Duration::zero()),
            Err(BacktestError::InvalidInterval(0))
        ));
        assert!(matches!(
            validate_period(start, start + Duration::days(1), Duration::minutes(-5)),
            Err(BacktestError::InvalidInterval(-300))
        ));
    }
}
