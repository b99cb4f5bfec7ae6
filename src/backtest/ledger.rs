//! Open and closed simulated trades for a single run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::models::{ExitReason, SimulatedTrade, TradeStatus};

/// Decimal places kept on realized P&L.
const PNL_DP: u32 = 8;

/// Owns every trade of one run. A trade lives in exactly one of the open
/// and closed sets at any time.
#[derive(Debug, Clone)]
pub struct TradeLedger {
    open: Vec<SimulatedTrade>,
    closed: Vec<SimulatedTrade>,
    default_fee_rate: Decimal,
}

impl TradeLedger {
    pub fn new(default_fee_rate: Decimal) -> Self {
        Self {
            open: Vec::new(),
            closed: Vec::new(),
            default_fee_rate,
        }
    }

    /// Add a validated trade to the open set.
    ///
    /// # Panics
    ///
    /// If the trade is not open or its size is not positive.
    pub fn open(&mut self, trade: SimulatedTrade) -> Uuid {
        assert!(
            trade.size > Decimal::ZERO,
            "trade {} reached the ledger with non-positive size {}",
            trade.id,
            trade.size
        );
        assert!(trade.is_open(), "trade {} reached the ledger already closed", trade.id);

        let id = trade.id;
        self.open.push(trade);
        id
    }

    /// Fee charged when `trade` closes: its explicit fee, else the default rate on size.
    pub fn fee_for(&self, trade: &SimulatedTrade) -> Decimal {
        trade.fees_paid.unwrap_or(trade.size * self.default_fee_rate)
    }

    /// Close an open trade and return its realized P&L net of fees.
    ///
    /// # Panics
    ///
    /// If `id` is not in the open set (unknown or already closed).
    pub fn close(&mut self, id: Uuid, exit_price: Decimal, reason: ExitReason, at: DateTime<Utc>) -> Decimal {
        let Some(index) = self.open.iter().position(|t| t.id == id) else {
            panic!("trade {} is not open and cannot be closed", id);
        };

        let mut trade = self.open.remove(index);
        let fee = self.fee_for(&trade);
        let pnl = (trade.gross_pnl_at(exit_price) - fee).round_dp(PNL_DP);

        trade.status = TradeStatus::Closed;
        trade.closed_at = Some(at);
        trade.pnl = Some(pnl);
        trade.exit_price = Some(exit_price);
        trade.exit_reason = Some(reason);
        trade.fees_paid = Some(fee);

        debug!(
            trade_id = %id,
            pair = %trade.pair,
            direction = %trade.direction,
            exit_price = %exit_price,
            reason = %reason,
            pnl = %pnl,
            "Closed trade"
        );

        self.closed.push(trade);
        pnl
    }

    pub fn open_trades(&self) -> &[SimulatedTrade] {
        &self.open
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Closed trades in close order.
    pub fn closed(&self) -> &[SimulatedTrade] {
        &self.closed
    }

    pub fn into_closed(self) -> Vec<SimulatedTrade> {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeDirection;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn long(size: Decimal) -> SimulatedTrade {
        SimulatedTrade::new("TEST/USD", TradeDirection::Long, dec!(100), size, 5, Utc::now())
    }

    #[test]
    fn test_close_computes_leveraged_pnl_net_of_default_fee() {
        let mut ledger = TradeLedger::new(dec!(0.001));
        let id = ledger.open(long(dec!(100)));

        // 3% move on 500 notional = 15, minus 0.1% of 100 size
        let pnl = ledger.close(id, dec!(103), ExitReason::BacktestEnd, Utc::now());
        assert_eq!(pnl, dec!(14.9));

        let closed = &ledger.closed()[0];
        assert_eq!(closed.status, TradeStatus::Closed);
        assert_eq!(closed.pnl, Some(dec!(14.9)));
        assert_eq!(closed.fees_paid, Some(dec!(0.1)));
        assert_eq!(closed.exit_reason, Some(ExitReason::BacktestEnd));
        assert!(closed.closed_at.is_some());
    }

    #[test]
    fn test_short_and_explicit_fee() {
        let mut ledger = TradeLedger::new(dec!(0.001));
        let trade = SimulatedTrade::new("TEST/USD", TradeDirection::Short, dec!(100), dec!(10), 10, Utc::now())
            .with_fees(dec!(0.5));
        let id = ledger.open(trade);

        let pnl = ledger.close(id, dec!(95), ExitReason::TakeProfit, Utc::now() + Duration::hours(1));
        assert_eq!(pnl, dec!(4.5));

        let id = ledger.open(long(dec!(10)).with_fees(Decimal::ZERO));
        assert_eq!(ledger.close(id, dec!(100), ExitReason::Timeout, Utc::now()), Decimal::ZERO);
    }

    #[test]
    fn test_trade_is_never_open_and_closed() {
        let mut ledger = TradeLedger::new(dec!(0.001));
        let first = ledger.open(long(dec!(10)));
        ledger.open(long(dec!(10)));
        assert_eq!(ledger.open_count(), 2);

        ledger.close(first, dec!(101), ExitReason::StrategyExit, Utc::now());
        assert_eq!(ledger.open_count(), 1);
        assert!(ledger.open_trades().iter().all(|t| t.id != first));
        assert!(ledger.closed().iter().all(|t| t.pnl.is_some() && t.closed_at.is_some()));
    }

    #[test]
    #[should_panic(expected = "not open")]
    fn test_double_close_panics() {
        let mut ledger = TradeLedger::new(dec!(0.001));
        let id = ledger.open(long(dec!(10)));
        ledger.close(id, dec!(101), ExitReason::StopLoss, Utc::now());
        ledger.close(id, dec!(101), ExitReason::StopLoss, Utc::now());
    }

    #[test]
    #[should_panic(expected = "non-positive size")]
    fn test_non_positive_size_panics() {
        let mut ledger = TradeLedger::new(dec!(0.001));
        ledger.open(long(dec!(-1)));
    }
}
