use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::{DateTime, Utc};
use core_types::Trade;
use rust_decimal::Decimal;

/// A stateless calculator for deriving performance metrics from trading
/// activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduces a window's completed trades and equity curve to a report.
    ///
    /// With no trades the report stays zeroed and `win_rate_pct` stays
    /// `None` — the distinction between "never traded" and "traded and won
    /// nothing" matters to the scoring layer.
    pub fn calculate(
        &self,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
    ) -> Result<PerformanceReport, AnalyticsError> {
        if initial_capital <= Decimal::ZERO {
            return Err(AnalyticsError::Calculation(
                "initial capital must be positive".to_string(),
            ));
        }

        let mut report = PerformanceReport::new();
        self.calculate_profitability(trades, initial_capital, &mut report);
        self.calculate_drawdown(equity_curve, &mut report);
        Ok(report)
    }

    fn calculate_profitability(
        &self,
        trades: &[Trade],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) {
        report.total_trades = trades.len();

        for trade in trades {
            let pnl = trade.net_pnl();
            report.total_net_profit += pnl;

            if pnl.is_sign_positive() && !pnl.is_zero() {
                report.gross_profit += pnl;
                report.winning_trades += 1;
            } else {
                report.gross_loss += pnl.abs();
                report.losing_trades += 1;
            }
        }

        if report.gross_loss > Decimal::ZERO {
            report.profit_factor = Some(report.gross_profit / report.gross_loss);
        }

        if report.total_trades > 0 {
            report.win_rate_pct = Some(
                (Decimal::from(report.winning_trades) / Decimal::from(report.total_trades))
                    * Decimal::from(100),
            );
        }

        report.total_return_pct = (report.total_net_profit / initial_capital) * Decimal::from(100);
    }

    fn calculate_drawdown(
        &self,
        equity_curve: &[(DateTime<Utc>, Decimal)],
        report: &mut PerformanceReport,
    ) {
        if equity_curve.is_empty() {
            return;
        }

        let mut max_drawdown = Decimal::ZERO;
        let mut peak_equity = equity_curve[0].1;

        for &(_timestamp, equity) in equity_curve {
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = peak_equity - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        report.max_drawdown = max_drawdown;
        if peak_equity > Decimal::ZERO {
            report.max_drawdown_pct = (max_drawdown / peak_equity) * Decimal::from(100);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::{Execution, OrderSide};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn execution(side: OrderSide, price: Decimal, quantity: Decimal) -> Execution {
        Execution {
            execution_id: Uuid::new_v4(),
            client_order_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side,
            price,
            quantity,
            fee: Decimal::ZERO,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn trade(side: OrderSide, entry: Decimal, exit: Decimal) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side,
            entry_execution: execution(side, entry, dec!(1)),
            exit_execution: execution(side.opposite(), exit, dec!(1)),
        }
    }

    #[test]
    fn win_rate_counts_both_directions() {
        let trades = vec![
            trade(OrderSide::Buy, dec!(100), dec!(110)),  // +10
            trade(OrderSide::Sell, dec!(100), dec!(90)),  // +10
            trade(OrderSide::Buy, dec!(100), dec!(95)),   // -5
            trade(OrderSide::Sell, dec!(100), dec!(108)), // -8
        ];
        let report = AnalyticsEngine::new().calculate(&trades, &[], dec!(1000)).unwrap();

        assert_eq!(report.total_trades, 4);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.win_rate_pct, Some(dec!(50)));
        assert_eq!(report.total_net_profit, dec!(7));
        assert_eq!(report.total_return_pct, dec!(0.7));
    }

    #[test]
    fn no_trades_leaves_win_rate_unset() {
        let report = AnalyticsEngine::new().calculate(&[], &[], dec!(1000)).unwrap();
        assert_eq!(report.win_rate_pct, None);
        assert_eq!(report.total_trades, 0);
    }

    #[test]
    fn drawdown_tracks_the_deepest_trough() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let curve: Vec<_> = [dec!(1000), dec!(1200), dec!(900), dec!(1100), dec!(1050)]
            .into_iter()
            .enumerate()
            .map(|(i, equity)| (t0 + chrono::Duration::hours(i as i64), equity))
            .collect();

        let report = AnalyticsEngine::new().calculate(&[], &curve, dec!(1000)).unwrap();
        assert_eq!(report.max_drawdown, dec!(300));
        assert_eq!(report.max_drawdown_pct, dec!(25));
    }

    #[test]
    fn rejects_nonpositive_capital() {
        assert!(AnalyticsEngine::new().calculate(&[], &[], dec!(0)).is_err());
    }
}
