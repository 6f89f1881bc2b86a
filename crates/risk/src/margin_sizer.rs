use crate::RiskManager;
use crate::error::RiskError;
use configuration::RiskManagement;
use core_types::{OrderRequest, Signal};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fraction of free cash that may back a single position. The remainder is
/// a buffer for fees and slippage.
const CASH_UTILIZATION_CAP: Decimal = dec!(0.95);

/// A fixed-fractional position sizer with margin.
///
/// The target exposure is `equity * risk_per_trade_pct / margin_factor`:
/// a margin factor of 0.2 turns a 5% equity commitment into 25% exposure
/// (5x leverage on the committed slice), bounded by the cash actually
/// available in the simulated account.
#[derive(Debug, Clone)]
pub struct MarginSizer {
    params: RiskManagement,
    margin_factor: Decimal,
}

impl MarginSizer {
    pub fn new(params: RiskManagement, margin_factor: Decimal) -> Result<Self, RiskError> {
        if params.risk_per_trade_pct <= dec!(0) || params.risk_per_trade_pct > dec!(1) {
            return Err(RiskError::InvalidParameters(
                "risk_per_trade_pct must be in (0, 1]".to_string(),
            ));
        }
        if margin_factor <= dec!(0) || margin_factor > dec!(1) {
            return Err(RiskError::InvalidParameters(
                "margin_factor must be in (0, 1]".to_string(),
            ));
        }
        Ok(Self { params, margin_factor })
    }
}

impl RiskManager for MarginSizer {
    fn size_order(
        &self,
        signal: &Signal,
        equity: Decimal,
        cash: Decimal,
        entry_price: Decimal,
    ) -> Result<OrderRequest, RiskError> {
        if entry_price <= dec!(0) {
            return Err(RiskError::InvalidEntryPrice(entry_price));
        }
        if equity <= dec!(0) {
            return Err(RiskError::InsufficientEquity(equity));
        }

        // Committed capital, leveraged through the margin factor and scaled
        // by the strategy's confidence in the signal.
        let committed = equity * self.params.risk_per_trade_pct * signal.confidence;
        let target_value = committed / self.margin_factor;

        let max_value = cash.max(Decimal::ZERO) * CASH_UTILIZATION_CAP;
        let position_value = target_value.min(max_value);

        // Round to 6 decimal places to avoid precision issues with very
        // small quantities.
        let quantity = (position_value / entry_price).round_dp(6);

        let mut order = signal.order_request.clone();
        order.quantity = quantity;
        Ok(order)
    }
}
