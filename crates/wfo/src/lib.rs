use crate::error::WfoError;
use analytics::{AnalyticsEngine, PerformanceReport};
use api_client::MarketDataSource;
use backtester::Backtester;
use chrono::{DateTime, Duration, Utc};
use configuration::{Config, Simulation, StrategyParams, WalkForwardConfig};
use core_types::Window;
use executor::SimulatedExecutor;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use optimizer::{PopulationSearch, WalkForwardFitness};
use risk::MarginSizer;
use rust_decimal::Decimal;
use std::sync::Arc;

pub mod error;

/// One out-of-sample run of the winning parameters.
#[derive(Debug, Clone)]
pub struct ValidationRun {
    pub label: String,
    pub report: PerformanceReport,
}

/// Everything a caller needs to present a finished optimization.
#[derive(Debug, Clone)]
pub struct WalkForwardOutcome {
    pub best_params: StrategyParams,
    pub best_fitness: f64,
    pub generations_run: usize,
    pub validations: Vec<ValidationRun>,
}

/// The master engine for a walk-forward optimization run.
///
/// It builds the in-sample window set (stepping month-long slices back from
/// the anchor, leaving the most recent slice untouched), fetches every
/// window exactly once, hands them to the genetic search, and finally
/// re-runs the winning vector on held-out data with the harsher validation
/// fee.
pub struct WalkForwardEngine {
    config: Config,
    data_source: Arc<dyn MarketDataSource>,
}

impl WalkForwardEngine {
    pub fn new(config: Config, data_source: Arc<dyn MarketDataSource>) -> Self {
        Self { config, data_source }
    }

    /// The main entry point: runs the entire optimize-then-validate process.
    pub async fn run(&self, anchor: DateTime<Utc>) -> Result<WalkForwardOutcome, WfoError> {
        // 1. Build and fetch the in-sample window set, once. Every candidate
        // evaluated in this run shares these immutable windows.
        let ranges = walk_forward_ranges(anchor, &self.config.walk_forward);
        if let (Some(first), Some(last)) = (ranges.first(), ranges.last()) {
            tracing::info!(
                windows = ranges.len(),
                from = %first.0.date_naive(),
                to = %last.1.date_naive(),
                "fetching walk-forward window set"
            );
        }
        let windows = self.fetch_windows(&ranges).await?;

        // 2. Run the genetic search against the optimization fee schedule.
        let fitness = WalkForwardFitness::new(
            self.build_backtester(self.config.simulation.taker_fee_pct)?,
            windows,
        )?;
        let search = PopulationSearch::new(self.config.search.clone(), fitness)?;
        let outcome = search.run()?;
        tracing::info!(
            fitness = outcome.best_fitness,
            generations = outcome.generations_run,
            "search complete"
        );

        // 3. Re-run the winner on held-out data: the long validation period
        // and the most recent window the search never saw.
        let validation_backtester =
            self.build_backtester(self.config.backtest.validation_fee_pct)?;
        let holdout_days = self.config.walk_forward.holdout_days;
        let recent_days = self.config.walk_forward.window_days;
        let mut validations = Vec::new();
        for (days, label) in [
            (holdout_days, format!("last {holdout_days} days")),
            (recent_days, format!("last {recent_days} days")),
        ] {
            let window = self
                .fetch_window(anchor - Duration::days(days), anchor)
                .await?;
            let report = validation_backtester.run(&window, &outcome.best_params)?;
            validations.push(ValidationRun { label, report });
        }

        Ok(WalkForwardOutcome {
            best_params: outcome.best_params,
            best_fitness: outcome.best_fitness,
            generations_run: outcome.generations_run,
            validations,
        })
    }

    /// Assembles a backtester with the given fee; everything else comes from
    /// the shared configuration.
    fn build_backtester(&self, taker_fee_pct: Decimal) -> Result<Backtester, WfoError> {
        let simulation = Simulation { taker_fee_pct, ..self.config.simulation.clone() };
        let risk_manager = MarginSizer::new(
            self.config.risk_management.clone(),
            self.config.simulation.margin_factor,
        )?;
        Ok(Backtester::new(
            self.config.backtest.initial_capital,
            Box::new(SimulatedExecutor::new(simulation)),
            Box::new(risk_manager),
            AnalyticsEngine::new(),
        ))
    }

    /// Fetches every range concurrently, preserving order.
    async fn fetch_windows(
        &self,
        ranges: &[(DateTime<Utc>, DateTime<Utc>)],
    ) -> Result<Vec<Window>, WfoError> {
        let progress_bar = ProgressBar::new(ranges.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );

        let tasks = ranges.iter().map(|&(start, end)| {
            let progress_bar = progress_bar.clone();
            async move {
                let window = self.fetch_window(start, end).await?;
                progress_bar.inc(1);
                Ok::<Window, WfoError>(window)
            }
        });

        let windows = join_all(tasks).await.into_iter().collect::<Result<Vec<_>, _>>()?;
        progress_bar.finish_with_message("window set ready");
        Ok(windows)
    }

    async fn fetch_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Window, WfoError> {
        let symbol = &self.config.backtest.symbol;
        let interval = &self.config.backtest.interval;
        let klines = self.data_source.fetch_klines(symbol, interval, start, end).await?;
        Ok(Window::new(symbol.clone(), interval.clone(), start, end, klines)?)
    }
}

/// Generates the in-sample window boundaries, oldest first.
///
/// With a window length of one month and a count of seven this reproduces
/// the original evaluation set: seven consecutive month-long slices ending
/// one month before the anchor. The slice closest to the anchor is left
/// out-of-sample for validation.
pub fn walk_forward_ranges(
    anchor: DateTime<Utc>,
    config: &WalkForwardConfig,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    (0..config.window_count)
        .rev()
        .map(|i| {
            let end = anchor - Duration::days(config.window_days * (i as i64 + 1));
            let start = anchor - Duration::days(config.window_days * (i as i64 + 2));
            (start, end)
        })
        .collect()
}
