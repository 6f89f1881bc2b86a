use crate::error::BacktestError;
use analytics::{AnalyticsEngine, PerformanceReport};
use configuration::StrategyParams;
use core_types::{Execution, Kline, OrderRequest, OrderSide, OrderType, Trade, Window};
use executor::{Executor, Portfolio};
use risk::RiskManager;
use rust_decimal::Decimal;
use std::collections::HashMap;
use strategies::{CrossoverGate, Strategy};
use uuid::Uuid;

pub mod error;

/// The bracket levels guarding the currently open position.
#[derive(Debug, Clone, Copy)]
struct Brackets {
    take_profit: Decimal,
    stop_loss: Decimal,
}

/// The windowed backtesting engine.
///
/// One instance is shared by every evaluation in a search: `run` borrows it
/// immutably, builds a fresh strategy from the explicit parameter vector,
/// and keeps all per-run state (portfolio, open brackets, trade log) on its
/// own stack. That makes concurrent runs over different candidates safe by
/// construction, and identical `(window, params)` inputs deterministic.
pub struct Backtester {
    initial_capital: Decimal,
    executor: Box<dyn Executor>,
    risk_manager: Box<dyn RiskManager>,
    analytics_engine: AnalyticsEngine,
}

impl Backtester {
    pub fn new(
        initial_capital: Decimal,
        executor: Box<dyn Executor>,
        risk_manager: Box<dyn RiskManager>,
        analytics_engine: AnalyticsEngine,
    ) -> Self {
        Self { initial_capital, executor, risk_manager, analytics_engine }
    }

    /// Runs the simulation of one parameter vector over one window.
    pub fn run(
        &self,
        window: &Window,
        params: &StrategyParams,
    ) -> Result<PerformanceReport, BacktestError> {
        let required = params.max_lookback() as usize + 1;
        if window.len() < required {
            return Err(BacktestError::InsufficientData { required, actual: window.len() });
        }

        let symbol = window.symbol().to_string();
        let mut strategy: Box<dyn Strategy> =
            Box::new(CrossoverGate::new(*params, symbol.clone())?);

        let mut portfolio = Portfolio::new(self.initial_capital);
        let mut equity_curve = Vec::with_capacity(window.len());
        let mut completed_trades: Vec<Trade> = Vec::new();
        let mut pending_entry: Option<Execution> = None;
        let mut brackets: Option<Brackets> = None;

        for kline in window.klines() {
            // --- 1. BRACKET CHECK ---
            // Exits are monitored before the strategy sees the bar; a touched
            // stop or target closes the position at its exact level.
            let open_position =
                portfolio.get_position(&symbol).map(|p| (p.side, p.quantity));
            if let Some((entry_side, open_quantity)) = open_position {
                if let Some(active) = brackets {
                    if let Some(exit_price) = bracket_exit(entry_side, &active, kline) {
                        let close_order = OrderRequest {
                            client_order_id: Uuid::new_v4(),
                            symbol: symbol.clone(),
                            side: entry_side.opposite(),
                            order_type: OrderType::Market,
                            quantity: open_quantity,
                            price: Some(exit_price),
                        };
                        let execution = self.executor.execute(&close_order, kline)?;
                        portfolio.update_with_execution(&execution)?;

                        if let Some(entry_execution) = pending_entry.take() {
                            completed_trades.push(Trade {
                                trade_id: Uuid::new_v4(),
                                symbol: symbol.clone(),
                                side: entry_side,
                                entry_execution,
                                exit_execution: execution,
                            });
                        }
                        brackets = None;

                        record_equity(&portfolio, &symbol, kline, &mut equity_curve)?;
                        continue; // We were taken out; skip strategy evaluation for this bar.
                    }
                }
            } else {
                // No position, no brackets.
                brackets = None;
            }

            // --- 2. STRATEGY EVALUATION ---
            let signal = strategy.evaluate(kline)?;

            // --- 3. SIGNAL PROCESSING ---
            if let Some(signal) = signal {
                let current = portfolio.get_position(&symbol).cloned();
                match current {
                    // Already positioned in the signal's direction; nothing to do.
                    Some(position) if position.side == signal.order_request.side => {}
                    // Opposite signal: close, then fall through to re-enter.
                    Some(position) => {
                        let close_order = OrderRequest {
                            client_order_id: Uuid::new_v4(),
                            symbol: symbol.clone(),
                            side: position.side.opposite(),
                            order_type: OrderType::Market,
                            quantity: position.quantity,
                            price: None,
                        };
                        let execution = self.executor.execute(&close_order, kline)?;
                        portfolio.update_with_execution(&execution)?;
                        if let Some(entry_execution) = pending_entry.take() {
                            completed_trades.push(Trade {
                                trade_id: Uuid::new_v4(),
                                symbol: symbol.clone(),
                                side: position.side,
                                entry_execution,
                                exit_execution: execution,
                            });
                        }
                        brackets = None;
                    }
                    None => {}
                }

                if portfolio.get_position(&symbol).is_none() {
                    let market_prices = HashMap::from([(symbol.clone(), kline.close)]);
                    let equity = portfolio.calculate_total_equity(&market_prices)?;
                    let order = self.risk_manager.size_order(
                        &signal,
                        equity,
                        portfolio.cash,
                        kline.close,
                    )?;

                    if order.quantity > Decimal::ZERO {
                        let execution = self.executor.execute(&order, kline)?;
                        portfolio.update_with_execution(&execution)?;
                        pending_entry = Some(execution);
                        brackets = match (signal.take_profit, signal.stop_loss) {
                            (Some(take_profit), Some(stop_loss)) => {
                                Some(Brackets { take_profit, stop_loss })
                            }
                            _ => None,
                        };
                    }
                }
            }

            // --- 4. RECORD EQUITY ---
            record_equity(&portfolio, &symbol, kline, &mut equity_curve)?;
        }

        let report = self.analytics_engine.calculate(
            &completed_trades,
            &equity_curve,
            self.initial_capital,
        )?;

        tracing::debug!(
            window = %window.label(),
            trades = report.total_trades,
            win_rate = ?report.win_rate_pct,
            "window simulated"
        );
        Ok(report)
    }
}

/// Returns the price a bracket exit fills at on this bar, if one is touched.
/// The stop is checked first: when a bar straddles both levels we take the
/// pessimistic fill.
fn bracket_exit(side: OrderSide, brackets: &Brackets, kline: &Kline) -> Option<Decimal> {
    match side {
        OrderSide::Buy => {
            if kline.low <= brackets.stop_loss {
                Some(brackets.stop_loss)
            } else if kline.high >= brackets.take_profit {
                Some(brackets.take_profit)
            } else {
                None
            }
        }
        OrderSide::Sell => {
            if kline.high >= brackets.stop_loss {
                Some(brackets.stop_loss)
            } else if kline.low <= brackets.take_profit {
                Some(brackets.take_profit)
            } else {
                None
            }
        }
    }
}

fn record_equity(
    portfolio: &Portfolio,
    symbol: &str,
    kline: &Kline,
    equity_curve: &mut Vec<(chrono::DateTime<chrono::Utc>, Decimal)>,
) -> Result<(), BacktestError> {
    let market_prices = HashMap::from([(symbol.to_string(), kline.close)]);
    let equity = portfolio.calculate_total_equity(&market_prices)?;
    equity_curve.push((kline.close_time, equity));
    Ok(())
}
