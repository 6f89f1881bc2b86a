use crate::enums::{OrderSide, OrderType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: DateTime<Utc>,
    pub interval: String,
}

/// A trade intention produced by a strategy.
///
/// Bracket prices are set by the strategy at signal time: the backtester
/// monitors them bar-by-bar and exits the position when either is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// How strongly the strategy believes in this signal, 0..=1.
    pub confidence: Decimal,
    pub order_request: OrderRequest,
    /// Exit the position with a profit when price reaches this level.
    pub take_profit: Option<Decimal>,
    /// Exit the position with a loss when price reaches this level.
    pub stop_loss: Option<Decimal>,
}

/// A concrete order to be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Zero means "let the risk manager size it".
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

/// The receipt for a filled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: Uuid,
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// An open holding in a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// A completed round trip: one entry execution matched with one exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub symbol: String,
    /// The direction of the entry; a winning Sell trade exits lower.
    pub side: OrderSide,
    pub entry_execution: Execution,
    pub exit_execution: Execution,
}

impl Trade {
    /// Net profit of the round trip, fees included.
    pub fn net_pnl(&self) -> Decimal {
        let gross = match self.side {
            OrderSide::Buy => {
                (self.exit_execution.price - self.entry_execution.price)
                    * self.exit_execution.quantity
            }
            OrderSide::Sell => {
                (self.entry_execution.price - self.exit_execution.price)
                    * self.exit_execution.quantity
            }
        };
        gross - self.entry_execution.fee - self.exit_execution.fee
    }
}
