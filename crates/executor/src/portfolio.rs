use crate::error::ExecutorError;
use core_types::{Execution, OrderSide, Position};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Manages the state of a trading account, including cash, positions, and equity.
/// Its sole responsibility is to accurately reflect the current state based on
/// trade executions.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: Decimal,
    pub positions: HashMap<String, Position>,
}

impl Portfolio {
    /// Creates a new `Portfolio` with a given amount of starting capital.
    pub fn new(initial_capital: Decimal) -> Self {
        Self { cash: initial_capital, positions: HashMap::new() }
    }

    /// Updates the portfolio state based on a trade execution.
    /// This is the core state transition logic. It does not calculate P&L, it
    /// only mutates state.
    pub fn update_with_execution(&mut self, execution: &Execution) -> Result<(), ExecutorError> {
        let cost = execution.price * execution.quantity;
        let symbol = &execution.symbol;

        let is_closing_trade = self
            .positions
            .get(symbol)
            .is_some_and(|p| p.quantity.is_sign_positive() && p.side != execution.side);

        // --- Cash Update ---
        // For a Buy, cash decreases. For a Sell, cash increases (a short
        // entry banks the sale proceeds, which the closing buy pays back).
        // The fee is subtracted regardless of direction.
        match execution.side {
            OrderSide::Buy => self.cash -= cost,
            OrderSide::Sell => self.cash += cost,
        }
        self.cash -= execution.fee;

        // Opening trades must be funded; a closing trade may legitimately
        // leave the account briefly negative after a losing short.
        if !is_closing_trade && self.cash.is_sign_negative() {
            return Err(ExecutorError::InsufficientCash {
                required: cost.to_string(),
                available: (self.cash + cost + execution.fee).to_string(),
            });
        }

        // --- Position Update ---
        let position = self.positions.entry(symbol.clone()).or_insert_with(|| Position {
            position_id: Uuid::new_v4(),
            symbol: symbol.clone(),
            side: execution.side,
            quantity: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            last_updated: execution.timestamp,
        });

        if is_closing_trade {
            if execution.quantity > position.quantity {
                return Err(ExecutorError::InvalidClosingQuantity {
                    requested: execution.quantity.to_string(),
                    available: position.quantity.to_string(),
                });
            }
            position.quantity -= execution.quantity;
        } else {
            // Opening or increasing: recompute the average entry price.
            let existing_value = position.entry_price * position.quantity;
            let new_value = execution.price * execution.quantity;
            let total_quantity = position.quantity + execution.quantity;

            position.side = execution.side;
            if !total_quantity.is_zero() {
                position.entry_price = (existing_value + new_value) / total_quantity;
            }
            position.quantity += execution.quantity;
        }

        position.last_updated = execution.timestamp;

        // If position quantity is zero after an update, remove it from the map.
        if position.quantity.is_zero() {
            self.positions.remove(symbol);
        }

        Ok(())
    }

    /// Calculates the total equity of the portfolio at a given set of market
    /// prices. A long position contributes its market value; a short is a
    /// liability to buy back, so it contributes negatively (its sale
    /// proceeds already sit in `cash`).
    pub fn calculate_total_equity(
        &self,
        market_prices: &HashMap<String, Decimal>,
    ) -> Result<Decimal, ExecutorError> {
        let mut positions_value = Decimal::ZERO;

        for (symbol, position) in &self.positions {
            let current_price = market_prices.get(symbol).ok_or_else(|| {
                ExecutorError::PortfolioError(format!("Missing market price for symbol: {symbol}"))
            })?;

            let market_value = *current_price * position.quantity;
            match position.side {
                OrderSide::Buy => positions_value += market_value,
                OrderSide::Sell => positions_value -= market_value,
            }
        }

        Ok(self.cash + positions_value)
    }

    /// A simple utility to get a snapshot of a single position.
    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn execution(side: OrderSide, price: Decimal, quantity: Decimal, fee: Decimal) -> Execution {
        Execution {
            execution_id: Uuid::new_v4(),
            client_order_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side,
            price,
            quantity,
            fee,
            timestamp: Utc::now(),
        }
    }

    fn prices(price: Decimal) -> HashMap<String, Decimal> {
        HashMap::from([("BTCUSDT".to_string(), price)])
    }

    #[test]
    fn long_round_trip_books_the_profit() {
        let mut portfolio = Portfolio::new(dec!(1000));
        portfolio
            .update_with_execution(&execution(OrderSide::Buy, dec!(100), dec!(5), dec!(1)))
            .unwrap();
        portfolio
            .update_with_execution(&execution(OrderSide::Sell, dec!(110), dec!(5), dec!(1)))
            .unwrap();

        assert!(portfolio.positions.is_empty());
        assert_eq!(portfolio.cash, dec!(1048));
    }

    #[test]
    fn short_equity_reflects_buyback_liability() {
        let mut portfolio = Portfolio::new(dec!(1000));
        portfolio
            .update_with_execution(&execution(OrderSide::Sell, dec!(100), dec!(5), dec!(0)))
            .unwrap();

        // Proceeds banked, liability marked at the current price.
        assert_eq!(portfolio.cash, dec!(1500));
        let equity = portfolio.calculate_total_equity(&prices(dec!(90))).unwrap();
        assert_eq!(equity, dec!(1050));
    }

    #[test]
    fn overdrawn_opening_buy_is_rejected() {
        let mut portfolio = Portfolio::new(dec!(100));
        let result =
            portfolio.update_with_execution(&execution(OrderSide::Buy, dec!(100), dec!(5), dec!(0)));
        assert!(matches!(result, Err(ExecutorError::InsufficientCash { .. })));
    }

    #[test]
    fn averaged_entry_price_on_increase() {
        let mut portfolio = Portfolio::new(dec!(10000));
        portfolio
            .update_with_execution(&execution(OrderSide::Buy, dec!(100), dec!(10), dec!(0)))
            .unwrap();
        portfolio
            .update_with_execution(&execution(OrderSide::Buy, dec!(200), dec!(10), dec!(0)))
            .unwrap();

        let position = portfolio.get_position("BTCUSDT").unwrap();
        assert_eq!(position.entry_price, dec!(150));
        assert_eq!(position.quantity, dec!(20));
    }
}
