//! Markdown summary of a run.

use std::fmt;

use rust_decimal::Decimal;

use crate::models::RunResult;

/// Render a human-readable report. Pure: the same result always renders to
/// the same text.
pub fn generate_report(result: &RunResult, strategy_name: &str) -> String {
    Report { result, strategy_name }.to_string()
}

/// Markdown view over a [`RunResult`].
pub struct Report<'a> {
    pub result: &'a RunResult,
    pub strategy_name: &'a str,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let stats = &result.stats;

        writeln!(f, "# Backtest Report: {}", self.strategy_name)?;
        writeln!(f)?;
        writeln!(
            f,
            "Pair: {} | Period: {} to {}",
            result.pair,
            result.start_time.format("%Y-%m-%d %H:%M"),
            result.end_time.format("%Y-%m-%d %H:%M")
        )?;
        writeln!(f)?;

        writeln!(f, "## Performance Summary")?;
        writeln!(f, "- **Total Trades**: {}", stats.total_trades)?;
        writeln!(f, "- **Winning Trades**: {}", stats.winning_trades)?;
        writeln!(f, "- **Losing Trades**: {}", stats.losing_trades)?;
        writeln!(f, "- **Win Rate**: {:.1}%", stats.win_rate * 100.0)?;
        writeln!(f, "- **Total PnL**: ${:.2}", stats.total_pnl.round_dp(2))?;
        writeln!(f, "- **Max Drawdown**: {:.2}%", stats.max_drawdown)?;
        writeln!(f, "- **Sharpe Ratio**: {:.2}", stats.sharpe_ratio)?;
        writeln!(f, "- **Sortino Ratio**: {:.2}", stats.sortino_ratio)?;
        writeln!(f, "- **Profit Factor**: {:.2}", stats.profit_factor)?;
        writeln!(f)?;

        writeln!(f, "## Capital Performance")?;
        writeln!(f, "- **Initial Capital**: ${}", money(result.initial_capital))?;
        writeln!(f, "- **Final Capital**: ${}", money(result.final_capital))?;
        writeln!(
            f,
            "- **Total Return**: {:.2}%",
            (result.total_return() * Decimal::ONE_HUNDRED).round_dp(2)
        )?;
        writeln!(f, "- **Fees Paid**: ${:.2}", stats.total_fees.round_dp(2))?;
        writeln!(f)?;

        writeln!(f, "## Trade Analysis")?;
        if stats.total_trades > 0 {
            writeln!(f, "- **Average PnL**: ${:.2}", stats.avg_pnl.round_dp(2))?;
            writeln!(f, "- **Average Win**: ${:.2}", stats.avg_win.round_dp(2))?;
            writeln!(f, "- **Average Loss**: ${:.2}", stats.avg_loss.round_dp(2))?;
        } else {
            writeln!(f, "- No closed trades")?;
        }
        if result.skipped_signals + result.rejected_trades + result.failed_steps > 0 {
            writeln!(
                f,
                "- **Skipped Signals**: {} | **Rejected Trades**: {} | **Failed Steps**: {}",
                result.skipped_signals, result.rejected_trades, result.failed_steps
            )?;
        }
        Ok(())
    }
}

/// Two decimals with thousands separators, e.g. `10,029.90`.
fn money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PerformanceStats;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn result(stats: PerformanceStats, final_capital: Decimal) -> RunResult {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RunResult {
            strategy_name: "Test".to_string(),
            pair: "ETH/USD".to_string(),
            start_time: start,
            end_time: start + chrono::Duration::days(30),
            initial_capital: dec!(10000),
            final_capital,
            stats,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            returns: Vec::new(),
            skipped_signals: 0,
            rejected_trades: 0,
            failed_steps: 0,
        }
    }

    #[test]
    fn test_report_is_idempotent() {
        let stats = PerformanceStats {
            total_trades: 4,
            winning_trades: 3,
            losing_trades: 1,
            win_rate: 0.75,
            total_pnl: dec!(125.5),
            profit_factor: f64::INFINITY,
            ..PerformanceStats::default()
        };
        let result = result(stats, dec!(10125));

        let first = generate_report(&result, "Momentum");
        let second = generate_report(&result, "Momentum");
        assert_eq!(first, second);

        assert!(first.starts_with("# Backtest Report: Momentum\n"));
        assert!(first.contains("- **Win Rate**: 75.0%"));
        assert!(first.contains("- **Total PnL**: $125.50"));
        assert!(first.contains("- **Profit Factor**: inf"));
        assert!(first.contains("- **Final Capital**: $10,125.00"));
        assert!(first.contains("- **Total Return**: 1.25%"));
    }

    #[test]
    fn test_report_for_empty_run() {
        let report = generate_report(&result(PerformanceStats::default(), dec!(10000)), "Idle");
        assert!(report.contains("- **Total Trades**: 0"));
        assert!(report.contains("- No closed trades"));
        assert!(report.contains("- **Total Return**: 0.00%"));
    }

    #[test]
    fn test_money_grouping() {
        assert_eq!(money(dec!(0)), "0.00");
        assert_eq!(money(dec!(999.999)), "1,000.00");
        assert_eq!(money(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(money(dec!(-12500)), "-12,500.00");
        assert_eq!(money(dec!(-0.004)), "0.00");
        assert_eq!(money(dec!(-0.006)), "-0.01");
    }
}
