use crate::Strategy;
use crate::error::StrategyError;
use configuration::StrategyParams;
use core_types::{Kline, OrderRequest, OrderSide, OrderType, Signal};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use ta::Next;
use ta::indicators::{
    BollingerBands, MovingAverageConvergenceDivergence as Macd, RelativeStrengthIndex as Rsi,
    SimpleMovingAverage as Sma,
};
use uuid::Uuid;

/// Bracket distances attached to every entry, as fractions of the entry
/// close. Longs take profit 5% up and stop out 1% down; shorts mirror.
const LONG_TAKE_PROFIT: Decimal = dec!(1.05);
const LONG_STOP_LOSS: Decimal = dec!(0.99);
const SHORT_TAKE_PROFIT: Decimal = dec!(0.95);
const SHORT_STOP_LOSS: Decimal = dec!(1.01);

/// The MACD/SMA crossover rule gated by RSI and Bollinger Bands.
///
/// A long entry requires either crossover confirmed by the other trend
/// measure — MACD crossing above its signal line while the fast SMA sits
/// above the slow one, or the fast SMA crossing above the slow one while
/// the MACD line sits above its signal — and passes only when momentum is
/// not exhausted (RSI above the oversold floor) or price has dropped
/// through the lower Bollinger band. Short entries mirror every condition.
pub struct CrossoverGate {
    symbol: String,
    params: StrategyParams,
    macd: Macd,
    sma_fast: Sma,
    sma_slow: Sma,
    rsi: Rsi,
    bb: BollingerBands,
    // State: previous values of both crossover pairs.
    prev_macd: Option<(f64, f64)>,
    prev_smas: Option<(f64, f64)>,
    // Bars consumed so far; no signal is emitted until every indicator has
    // a full lookback behind it.
    bars_seen: u32,
}

impl CrossoverGate {
    /// Creates a new `CrossoverGate` for the given parameter vector.
    ///
    /// The pairwise invariants of the vector are checked here; the search
    /// layer repairs its vectors before they ever reach this constructor,
    /// so a failure indicates a hand-written configuration mistake.
    pub fn new(params: StrategyParams, symbol: String) -> Result<Self, StrategyError> {
        params.validate().map_err(StrategyError::InvalidParameters)?;

        let indicator = |e: ta::errors::TaError| StrategyError::IndicatorError(e.to_string());
        Ok(Self {
            macd: Macd::new(
                params.macd_short_period as usize,
                params.macd_long_period as usize,
                params.macd_signal_period as usize,
            )
            .map_err(indicator)?,
            sma_fast: Sma::new(params.sma_fast_period as usize).map_err(indicator)?,
            sma_slow: Sma::new(params.sma_slow_period() as usize).map_err(indicator)?,
            rsi: Rsi::new(params.rsi_period as usize).map_err(indicator)?,
            bb: BollingerBands::new(params.bb_period as usize, 2.0).map_err(indicator)?,
            symbol,
            params,
            prev_macd: None,
            prev_smas: None,
            bars_seen: 0,
        })
    }

    fn entry_signal(&self, kline: &Kline, side: OrderSide) -> Signal {
        let (take_profit, stop_loss) = match side {
            OrderSide::Buy => (kline.close * LONG_TAKE_PROFIT, kline.close * LONG_STOP_LOSS),
            OrderSide::Sell => (kline.close * SHORT_TAKE_PROFIT, kline.close * SHORT_STOP_LOSS),
        };
        Signal {
            signal_id: Uuid::new_v4(),
            timestamp: kline.close_time,
            confidence: dec!(1.0),
            order_request: OrderRequest {
                client_order_id: Uuid::new_v4(),
                symbol: self.symbol.clone(),
                side,
                order_type: OrderType::Market,
                quantity: Decimal::ZERO, // Let the risk manager determine the size
                price: None,
            },
            take_profit: Some(take_profit),
            stop_loss: Some(stop_loss),
        }
    }
}

impl Strategy for CrossoverGate {
    fn evaluate(&mut self, kline: &Kline) -> Result<Option<Signal>, StrategyError> {
        // The `ta` crate uses `f64`. We must convert from our high-precision
        // `Decimal`. This is a controlled and accepted precision trade-off
        // for using the library.
        let close_f64 = kline.close.to_f64().ok_or_else(|| {
            StrategyError::IndicatorError(format!("close {} not representable", kline.close))
        })?;

        let macd_out = self.macd.next(close_f64);
        let fast_ma = self.sma_fast.next(close_f64);
        let slow_ma = self.sma_slow.next(close_f64);
        let rsi_val = self.rsi.next(close_f64);
        let bands = self.bb.next(close_f64);

        let mut signal = None;

        if let (Some((prev_macd, prev_sig)), Some((prev_fast, prev_slow))) =
            (self.prev_macd, self.prev_smas)
        {
            // Mirror the warm-up behavior of series-based indicator math:
            // the rule stays silent until its longest lookback is filled.
            let warmed_up = self.bars_seen >= self.params.max_lookback();

            let macd_cross_up = prev_macd <= prev_sig && macd_out.macd > macd_out.signal;
            let macd_cross_down = prev_macd >= prev_sig && macd_out.macd < macd_out.signal;
            let sma_cross_up = prev_fast <= prev_slow && fast_ma > slow_ma;
            let sma_cross_down = prev_fast >= prev_slow && fast_ma < slow_ma;

            let bullish_trend = (macd_cross_up && fast_ma > slow_ma)
                || (sma_cross_up && macd_out.macd > macd_out.signal);
            let bearish_trend = (macd_cross_down && fast_ma < slow_ma)
                || (sma_cross_down && macd_out.macd < macd_out.signal);

            let long_gate = rsi_val > self.params.rsi_oversold as f64
                || kline.close < Decimal::from_f64(bands.lower).unwrap_or(Decimal::ZERO);
            let short_gate = rsi_val < self.params.rsi_overbought as f64
                || kline.close > Decimal::from_f64(bands.upper).unwrap_or(Decimal::MAX);

            if warmed_up && bullish_trend && long_gate {
                tracing::debug!(symbol = %self.symbol, close = %kline.close, "long entry");
                signal = Some(self.entry_signal(kline, OrderSide::Buy));
            } else if warmed_up && bearish_trend && short_gate {
                tracing::debug!(symbol = %self.symbol, close = %kline.close, "short entry");
                signal = Some(self.entry_signal(kline, OrderSide::Sell));
            }
        }

        // Update state for the next evaluation.
        self.prev_macd = Some((macd_out.macd, macd_out.signal));
        self.prev_smas = Some((fast_ma, slow_ma));
        self.bars_seen = self.bars_seen.saturating_add(1);

        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn params() -> StrategyParams {
        StrategyParams {
            macd_short_period: 3,
            macd_long_period: 6,
            macd_signal_period: 3,
            sma_fast_period: 3,
            sma_slow_offset: 3,
            rsi_period: 3,
            rsi_oversold: 30,
            rsi_overbought: 70,
            bb_period: 4,
        }
    }

    fn kline(i: i64, close: Decimal) -> Kline {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i);
        Kline {
            open_time,
            open: close,
            high: close + dec!(1),
            low: close - dec!(1),
            close,
            volume: dec!(10),
            close_time: open_time + Duration::hours(1),
            interval: "1h".to_string(),
        }
    }

    #[test]
    fn rejects_inverted_rsi_thresholds() {
        let mut bad = params();
        bad.rsi_oversold = 80;
        bad.rsi_overbought = 70;
        assert!(CrossoverGate::new(bad, "BTCUSDT".to_string()).is_err());
    }

    #[test]
    fn stays_silent_during_warm_up() {
        let mut strategy = CrossoverGate::new(params(), "BTCUSDT".to_string()).unwrap();
        let lookback = params().max_lookback() as i64;
        for i in 0..lookback {
            let signal = strategy.evaluate(&kline(i, dec!(100) + Decimal::from(i))).unwrap();
            assert!(signal.is_none(), "signal emitted during warm-up at bar {i}");
        }
    }

    #[test]
    fn long_entry_carries_bracket_prices() {
        let mut strategy = CrossoverGate::new(params(), "BTCUSDT".to_string()).unwrap();

        // Decline long enough to pin the fast SMA below the slow one, then a
        // sharp rally to force a bullish crossover after warm-up.
        let mut signals = Vec::new();
        for i in 0..40 {
            let close = dec!(200) - Decimal::from(i * 2);
            if let Some(s) = strategy.evaluate(&kline(i, close)).unwrap() {
                signals.push(s);
            }
        }
        for i in 40..60 {
            let close = dec!(120) + Decimal::from((i - 40) * 5);
            if let Some(s) = strategy.evaluate(&kline(i, close)).unwrap() {
                signals.push(s);
            }
        }

        let long = signals
            .iter()
            .find(|s| s.order_request.side == OrderSide::Buy)
            .expect("rally should produce a long entry");
        let entry = long.take_profit.unwrap() / LONG_TAKE_PROFIT;
        assert_eq!(long.stop_loss.unwrap(), entry * LONG_STOP_LOSS);
        assert_eq!(long.order_request.quantity, Decimal::ZERO);
    }
}
