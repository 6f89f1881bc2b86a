use core_types::{OrderRequest, Signal};
use rust_decimal::Decimal;

pub mod error;
pub mod margin_sizer;

pub use error::RiskError;
pub use margin_sizer::MarginSizer;

/// Turns a strategy's unsized `Signal` into a sized `OrderRequest`.
///
/// The manager sees only value-level portfolio facts (current equity and
/// free cash), so implementations stay reentrant and usable from parallel
/// simulations.
pub trait RiskManager: Send + Sync {
    fn size_order(
        &self,
        signal: &Signal,
        equity: Decimal,
        cash: Decimal,
        entry_price: Decimal,
    ) -> Result<OrderRequest, RiskError>;
}
