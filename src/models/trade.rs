//! Simulated trade model for leveraged perpetual positions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a perpetual position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }

    /// +1 for longs, -1 for shorts.
    pub fn sign(&self) -> Decimal {
        match self {
            TradeDirection::Long => Decimal::ONE,
            TradeDirection::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a simulated trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Why a simulated trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StrategyExit,
    StopLoss,
    TakeProfit,
    Timeout,
    BacktestEnd,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StrategyExit => "strategy_exit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Timeout => "timeout",
            ExitReason::BacktestEnd => "backtest_end",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single simulated position, owned by the trade ledger of one run.
///
/// `closed_at`, `pnl`, `exit_price` and `exit_reason` are either all `None`
/// (open) or all `Some` (closed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    /// Unique trade identifier
    pub id: Uuid,

    /// Traded pair (e.g., "ETH/USD")
    pub pair: String,

    /// Position direction
    pub direction: TradeDirection,

    /// Entry price
    pub entry_price: Decimal,

    /// Collateral committed to the position
    pub size: Decimal,

    /// Leverage multiplier
    pub leverage: u32,

    /// Stop-loss trigger price
    #[serde(default)]
    pub stop_loss: Option<Decimal>,

    /// Take-profit trigger price
    #[serde(default)]
    pub take_profit: Option<Decimal>,

    /// Lifecycle state
    pub status: TradeStatus,

    /// When the position was opened (simulation time)
    pub opened_at: DateTime<Utc>,

    /// When the position was closed (simulation time)
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,

    /// Realized P&L net of fees
    #[serde(default)]
    pub pnl: Option<Decimal>,

    /// Price the position was closed at
    #[serde(default)]
    pub exit_price: Option<Decimal>,

    /// Why the position was closed
    #[serde(default)]
    pub exit_reason: Option<ExitReason>,

    /// Fees charged; an explicit value overrides the default fee rate
    #[serde(default)]
    pub fees_paid: Option<Decimal>,
}

impl SimulatedTrade {
    /// Create a new open trade without stops.
    pub fn new(
        pair: impl Into<String>,
        direction: TradeDirection,
        entry_price: Decimal,
        size: Decimal,
        leverage: u32,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pair: pair.into(),
            direction,
            entry_price,
            size,
            leverage,
            stop_loss: None,
            take_profit: None,
            status: TradeStatus::Open,
            opened_at,
            closed_at: None,
            pnl: None,
            exit_price: None,
            exit_reason: None,
            fees_paid: None,
        }
    }

    pub fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }

    pub fn with_take_profit(mut self, price: Decimal) -> Self {
        self.take_profit = Some(price);
        self
    }

    pub fn with_fees(mut self, fees: Decimal) -> Self {
        self.fees_paid = Some(fees);
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Leveraged notional exposure.
    pub fn notional(&self) -> Decimal {
        self.size * Decimal::from(self.leverage)
    }

    /// Gross P&L (before fees) if the position were closed at `price`.
    pub fn gross_pnl_at(&self, price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        self.direction.sign() * (price - self.entry_price) / self.entry_price * self.notional()
    }

    /// Whether `price` has crossed the stop-loss.
    pub fn stop_loss_hit(&self, price: Decimal) -> bool {
        match (self.stop_loss, self.direction) {
            (Some(stop), TradeDirection::Long) => price <= stop,
            (Some(stop), TradeDirection::Short) => price >= stop,
            (None, _) => false,
        }
    }

    /// Whether `price` has reached the take-profit.
    pub fn take_profit_hit(&self, price: Decimal) -> bool {
        match (self.take_profit, self.direction) {
            (Some(target), TradeDirection::Long) => price >= target,
            (Some(target), TradeDirection::Short) => price <= target,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gross_pnl_is_direction_aware() {
        let now = Utc::now();
        let long = SimulatedTrade::new("ETH/USD", TradeDirection::Long, dec!(100), dec!(100), 10, now);
        let short = SimulatedTrade::new("ETH/USD", TradeDirection::Short, dec!(100), dec!(100), 10, now);

        assert_eq!(long.gross_pnl_at(dec!(110)), dec!(100));
        assert_eq!(short.gross_pnl_at(dec!(110)), dec!(-100));
        assert_eq!(short.gross_pnl_at(dec!(95)), dec!(50));
    }

    #[test]
    fn test_stops_for_short_positions() {
        let trade = SimulatedTrade::new("BTC/USD", TradeDirection::Short, dec!(100), dec!(10), 5, Utc::now())
            .with_stop_loss(dec!(105))
            .with_take_profit(dec!(90));

        assert!(!trade.stop_loss_hit(dec!(104)));
        assert!(trade.stop_loss_hit(dec!(105)));
        assert!(!trade.take_profit_hit(dec!(91)));
        assert!(trade.take_profit_hit(dec!(89)));
    }

    #[test]
    fn test_exit_reason_labels() {
        assert_eq!(ExitReason::BacktestEnd.to_string(), "backtest_end");
        assert_eq!(ExitReason::StopLoss.as_str(), "stop_loss");
    }
}
