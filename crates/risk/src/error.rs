use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Risk manager received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Entry price {0} is not positive")]
    InvalidEntryPrice(Decimal),

    #[error("Portfolio equity {0} is not positive")]
    InsufficientEquity(Decimal),
}
