use crate::error::ExecutorError;
use configuration::Simulation;
use core_types::{Execution, Kline, OrderRequest, OrderSide};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A generic trait for an execution engine.
///
/// This function calculates the costs of the trade (fees, slippage) but
/// crucially **does not modify the portfolio state itself**. The caller is
/// responsible for using the returned `Execution` to update the portfolio.
pub trait Executor: Send + Sync {
    fn execute(&self, order: &OrderRequest, kline: &Kline) -> Result<Execution, ExecutorError>;
}

/// The "virtual exchange" for backtesting.
///
/// It holds the simulation parameters and implements the `Executor` trait to
/// create trade executions with realistic costs. An order that names a price
/// (a bracket exit) fills exactly there; a market order fills at the bar's
/// close shifted by slippage.
pub struct SimulatedExecutor {
    params: Simulation,
}

impl SimulatedExecutor {
    pub fn new(params: Simulation) -> Self {
        Self { params }
    }

    /// Calculates the execution price, modeling for slippage.
    ///
    /// Slippage moves the price against us by a fraction of the bar's
    /// high-low range.
    fn calculate_slippage_price(&self, order_side: OrderSide, kline: &Kline) -> Decimal {
        let bar_range = kline.high - kline.low;
        if bar_range.is_zero() {
            return kline.close;
        }

        let slippage_amount = bar_range * self.params.slippage_pct;
        match order_side {
            // For a buy, slippage makes the price HIGHER (worse).
            OrderSide::Buy => kline.close + slippage_amount,
            // For a sell, slippage makes the price LOWER (worse).
            OrderSide::Sell => kline.close - slippage_amount,
        }
    }
}

impl Executor for SimulatedExecutor {
    fn execute(&self, order: &OrderRequest, kline: &Kline) -> Result<Execution, ExecutorError> {
        let execution_price = match order.price {
            Some(price) => price,
            None => self.calculate_slippage_price(order.side, kline),
        };

        let fee = execution_price * order.quantity * self.params.taker_fee_pct;

        let execution = Execution {
            execution_id: Uuid::new_v4(),
            client_order_id: order.client_order_id,
            symbol: order.symbol.clone(),
            side: order.side,
            price: execution_price,
            quantity: order.quantity,
            fee,
            // Fills land when the bar closes; wall-clock time would break
            // run-to-run determinism.
            timestamp: kline.close_time,
        };

        tracing::trace!(price = %execution.price, qty = %execution.quantity, "simulated fill");
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::OrderType;
    use rust_decimal_macros::dec;

    fn kline() -> Kline {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Kline {
            open_time,
            open: dec!(100),
            high: dec!(110),
            low: dec!(90),
            close: dec!(100),
            volume: dec!(1),
            close_time: open_time + chrono::Duration::hours(1),
            interval: "1h".to_string(),
        }
    }

    fn order(side: OrderSide, price: Option<Decimal>) -> OrderRequest {
        OrderRequest {
            client_order_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side,
            order_type: OrderType::Market,
            quantity: dec!(2),
            price,
        }
    }

    fn executor() -> SimulatedExecutor {
        SimulatedExecutor::new(Simulation {
            taker_fee_pct: dec!(0.0005),
            slippage_pct: dec!(0.1),
            margin_factor: dec!(0.2),
        })
    }

    #[test]
    fn market_buy_slips_against_the_order() {
        let execution = executor().execute(&order(OrderSide::Buy, None), &kline()).unwrap();
        // range 20, slippage 10% of range = 2 above close
        assert_eq!(execution.price, dec!(102));
        assert_eq!(execution.fee, dec!(102) * dec!(2) * dec!(0.0005));
    }

    #[test]
    fn market_sell_slips_the_other_way() {
        let execution = executor().execute(&order(OrderSide::Sell, None), &kline()).unwrap();
        assert_eq!(execution.price, dec!(98));
    }

    #[test]
    fn priced_order_fills_exactly_at_its_level() {
        let execution =
            executor().execute(&order(OrderSide::Sell, Some(dec!(99))), &kline()).unwrap();
        assert_eq!(execution.price, dec!(99));
    }

    #[test]
    fn fill_timestamp_is_the_bar_close() {
        let bar = kline();
        let execution = executor().execute(&order(OrderSide::Buy, None), &bar).unwrap();
        assert_eq!(execution.timestamp, bar.close_time);
    }
}
