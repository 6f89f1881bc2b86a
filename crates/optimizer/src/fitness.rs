use crate::error::OptimizerError;
use backtester::Backtester;
use backtester::error::BacktestError;
use configuration::StrategyParams;
use core_types::Window;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// The win-rate percentage at which a window contributes nothing to the
/// score. Below it a window drags the product negative.
pub const WIN_RATE_CENTER: f64 = 45.0;

#[derive(Error, Debug)]
pub enum FitnessError {
    #[error("Backtest failed on window {window}: {source}")]
    Collaborator {
        window: String,
        #[source]
        source: BacktestError,
    },
}

/// The objective seam between the genetic search and whatever scores a
/// candidate. Implementations must be pure: the same vector always earns
/// the same score.
pub trait FitnessFn: Sync {
    fn evaluate(&self, params: &StrategyParams) -> Result<f64, FitnessError>;
}

/// Scores a candidate across the fixed walk-forward window set.
///
/// Each window's contribution is its win rate minus [`WIN_RATE_CENTER`],
/// and the contributions are **multiplied**, not summed. Two consequences
/// follow and both are part of the scoring contract, preserved from the
/// system this one replaces:
///
/// - an odd number of sub-45 windows flips the sign of the whole score;
/// - a single window at exactly 45 zeroes the score outright.
///
/// Whether that was a deliberate penalty design or an accident of reaching
/// for `*=` is an open product question; do not quietly switch this to a
/// mean.
///
/// A window with no closed trades counts as a 0% win rate, as does a window
/// too short for the candidate's indicators to warm up. Any other backtest
/// failure aborts the candidate (not the search) as a collaborator failure.
pub struct WalkForwardFitness {
    backtester: Backtester,
    windows: Vec<Window>,
}

impl WalkForwardFitness {
    pub fn new(backtester: Backtester, windows: Vec<Window>) -> Result<Self, OptimizerError> {
        if windows.is_empty() {
            return Err(OptimizerError::EmptyWindowSet);
        }
        Ok(Self { backtester, windows })
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }
}

impl FitnessFn for WalkForwardFitness {
    fn evaluate(&self, params: &StrategyParams) -> Result<f64, FitnessError> {
        let mut win_rates = Vec::with_capacity(self.windows.len());

        for window in &self.windows {
            let win_rate = match self.backtester.run(window, params) {
                Ok(report) => {
                    report.win_rate_pct.and_then(|rate| rate.to_f64()).unwrap_or(0.0)
                }
                Err(BacktestError::InsufficientData { required, actual }) => {
                    tracing::debug!(
                        window = %window.label(),
                        required,
                        actual,
                        "window too short for candidate; scoring as zero-trade"
                    );
                    0.0
                }
                Err(source) => {
                    return Err(FitnessError::Collaborator {
                        window: window.label(),
                        source,
                    });
                }
            };
            win_rates.push(win_rate);
        }

        Ok(aggregate(win_rates))
    }
}

/// Folds per-window win rates into the final score:
/// `Π(win_rate_i − WIN_RATE_CENTER)`.
pub fn aggregate(win_rates: impl IntoIterator<Item = f64>) -> f64 {
    win_rates.into_iter().map(|rate| rate - WIN_RATE_CENTER).product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_scenario_multiplies_contributions() {
        // [50, 40, 60] -> [5, -5, 15] -> -375
        assert_eq!(aggregate([50.0, 40.0, 60.0]), -375.0);
    }

    #[test]
    fn window_at_exactly_center_zeroes_the_score() {
        assert_eq!(aggregate([80.0, 45.0, 90.0]), 0.0);
        assert_eq!(aggregate([45.0]), 0.0);
    }

    #[test]
    fn even_count_of_losing_windows_scores_positive() {
        // Two sub-45 windows, one above: the negatives cancel.
        assert!(aggregate([40.0, 30.0, 60.0]) > 0.0);
    }

    #[test]
    fn odd_count_of_losing_windows_scores_negative() {
        assert!(aggregate([40.0, 60.0, 60.0]) < 0.0);
        assert!(aggregate([40.0, 30.0, 20.0, 60.0]) < 0.0);
    }

    #[test]
    fn zero_trade_windows_drag_the_score_by_the_full_center() {
        // Each tradeless window multiplies by -45.
        assert_eq!(aggregate([0.0, 0.0]), 2025.0);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let rates = [51.3, 44.2, 61.7, 48.0];
        assert_eq!(aggregate(rates), aggregate(rates));
    }

    mod walk_forward {
        use super::super::*;
        use analytics::AnalyticsEngine;
        use chrono::{Duration, TimeZone, Utc};
        use configuration::{RiskManagement, Simulation};
        use core_types::Kline;
        use executor::SimulatedExecutor;
        use risk::MarginSizer;
        use rust_decimal::Decimal;
        use rust_decimal::prelude::FromPrimitive;
        use rust_decimal_macros::dec;

        fn params() -> StrategyParams {
            StrategyParams {
                macd_short_period: 12,
                macd_long_period: 26,
                macd_signal_period: 9,
                sma_fast_period: 10,
                sma_slow_offset: 10,
                rsi_period: 14,
                rsi_oversold: 30,
                rsi_overbought: 70,
                bb_period: 20,
            }
        }

        fn backtester() -> Backtester {
            let simulation = Simulation {
                taker_fee_pct: dec!(0.0005),
                slippage_pct: dec!(0.1),
                margin_factor: dec!(0.2),
            };
            Backtester::new(
                dec!(100000),
                Box::new(SimulatedExecutor::new(simulation)),
                Box::new(
                    MarginSizer::new(RiskManagement { risk_per_trade_pct: dec!(0.05) }, dec!(0.2))
                        .unwrap(),
                ),
                AnalyticsEngine::new(),
            )
        }

        fn synthetic_window(bars: usize, phase: f64) -> Window {
            let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let klines: Vec<Kline> = (0..bars)
                .map(|i| {
                    let price = 100.0 + 15.0 * ((i as f64 + phase) / 9.0).sin();
                    let close = Decimal::from_f64(price).unwrap();
                    let open_time = t0 + Duration::hours(i as i64);
                    Kline {
                        open_time,
                        open: close,
                        high: close + dec!(0.5),
                        low: close - dec!(0.5),
                        close,
                        volume: dec!(10),
                        close_time: open_time + Duration::hours(1),
                        interval: "1h".to_string(),
                    }
                })
                .collect();
            Window::new(
                "BTCUSDT".to_string(),
                "1h".to_string(),
                t0,
                t0 + Duration::hours(bars as i64),
                klines,
            )
            .unwrap()
        }

        #[test]
        fn evaluation_is_deterministic_for_identical_inputs() {
            let windows = vec![synthetic_window(300, 0.0), synthetic_window(300, 40.0)];
            let fitness = WalkForwardFitness::new(backtester(), windows).unwrap();

            let first = fitness.evaluate(&params()).unwrap();
            let second = fitness.evaluate(&params()).unwrap();
            assert_eq!(first, second);
        }

        #[test]
        fn degenerate_window_counts_as_a_zero_trade_window() {
            // One window far too short for the rule's lookback; it must be
            // absorbed as a -45 contribution, not abort the evaluation.
            let windows = vec![synthetic_window(300, 0.0), synthetic_window(10, 0.0)];
            let fitness = WalkForwardFitness::new(backtester(), windows.clone()).unwrap();
            let score = fitness.evaluate(&params()).unwrap();

            let healthy = WalkForwardFitness::new(backtester(), windows[..1].to_vec()).unwrap();
            let healthy_score = healthy.evaluate(&params()).unwrap();
            assert_eq!(score, healthy_score * -WIN_RATE_CENTER);
        }

        #[test]
        fn empty_window_set_is_rejected() {
            assert!(matches!(
                WalkForwardFitness::new(backtester(), vec![]),
                Err(OptimizerError::EmptyWindowSet)
            ));
        }
    }
}
