use analytics::{AnalyticsEngine, PerformanceReport};
use api_client::{BinanceClient, MarketDataSource};
use backtester::Backtester;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{Config, StrategyParams};
use core_types::Window;
use executor::SimulatedExecutor;
use risk::MarginSizer;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wfo::WalkForwardEngine;

/// The main entry point for the Helix parameter-search application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from a .env file, if one exists.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = configuration::load_config()?;

    match cli.command {
        Commands::Optimize(args) => handle_optimize(args, config).await,
        Commands::Backtest(args) => handle_backtest(args, config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Walk-forward genetic parameter search for a crossover trading rule.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the rule's parameter space and validate the winner on
    /// held-out data.
    Optimize(OptimizeArgs),
    /// Run a single backtest with the configured parameters.
    Backtest(BacktestArgs),
}

#[derive(Parser)]
struct OptimizeArgs {
    /// The anchor date the walk-forward windows step back from
    /// (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    anchor: Option<NaiveDate>,
}

#[derive(Parser)]
struct BacktestArgs {
    /// The start date of the backtest period (format: YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// The end date of the backtest period (format: YYYY-MM-DD).
    #[arg(long)]
    to: NaiveDate,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_optimize(args: OptimizeArgs, config: Config) -> anyhow::Result<()> {
    let anchor = match args.anchor {
        Some(date) => date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc(),
        None => Utc::now(),
    };

    println!(
        "Optimizing {} {} over {} windows of {} days (anchor {})",
        config.backtest.symbol,
        config.backtest.interval,
        config.walk_forward.window_count,
        config.walk_forward.window_days,
        anchor.date_naive(),
    );

    let engine = WalkForwardEngine::new(config, Arc::new(BinanceClient::new()));
    let outcome = engine.run(anchor).await?;

    println!("\nBest vector after {} generations:", outcome.generations_run);
    print_params(&outcome.best_params);
    println!("Fitness: {:.4}", outcome.best_fitness);

    for validation in &outcome.validations {
        println!("\nOut-of-sample validation — {}:", validation.label);
        print_report(&validation.report);
    }

    Ok(())
}

async fn handle_backtest(args: BacktestArgs, config: Config) -> anyhow::Result<()> {
    let start = args.from.and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc();
    let end = args.to.and_hms_opt(23, 59, 59).expect("valid time").and_utc();

    let client = BinanceClient::new();
    let klines = client
        .fetch_klines(&config.backtest.symbol, &config.backtest.interval, start, end)
        .await?;
    let window = Window::new(
        config.backtest.symbol.clone(),
        config.backtest.interval.clone(),
        start,
        end,
        klines,
    )?;

    let backtester = build_backtester(&config, config.backtest.validation_fee_pct)?;
    let report = backtester.run(&window, &config.strategy)?;

    println!("Backtest of {} bars with the configured parameters:", window.len());
    print_params(&config.strategy);
    print_report(&report);

    Ok(())
}

fn build_backtester(config: &Config, taker_fee_pct: Decimal) -> anyhow::Result<Backtester> {
    let simulation =
        configuration::Simulation { taker_fee_pct, ..config.simulation.clone() };
    let risk_manager = MarginSizer::new(
        config.risk_management.clone(),
        config.simulation.margin_factor,
    )?;
    Ok(Backtester::new(
        config.backtest.initial_capital,
        Box::new(SimulatedExecutor::new(simulation)),
        Box::new(risk_manager),
        AnalyticsEngine::new(),
    ))
}

// ==============================================================================
// Rendering
// ==============================================================================

fn print_params(params: &StrategyParams) {
    let mut table = Table::new();
    table.set_header(vec!["Parameter", "Value"]);
    table
        .add_row(vec!["MACD short period".to_string(), params.macd_short_period.to_string()])
        .add_row(vec!["MACD long period".to_string(), params.macd_long_period.to_string()])
        .add_row(vec!["MACD signal period".to_string(), params.macd_signal_period.to_string()])
        .add_row(vec!["SMA fast period".to_string(), params.sma_fast_period.to_string()])
        .add_row(vec!["SMA slow period".to_string(), params.sma_slow_period().to_string()])
        .add_row(vec!["RSI period".to_string(), params.rsi_period.to_string()])
        .add_row(vec!["RSI oversold".to_string(), params.rsi_oversold.to_string()])
        .add_row(vec!["RSI overbought".to_string(), params.rsi_overbought.to_string()])
        .add_row(vec!["Bollinger period".to_string(), params.bb_period.to_string()]);
    println!("{table}");
}

fn print_report(report: &PerformanceReport) {
    let win_rate = report
        .win_rate_pct
        .map(|rate| format!("{rate:.2}%"))
        .unwrap_or_else(|| "n/a (no trades)".to_string());
    let profit_factor = report
        .profit_factor
        .map(|factor| format!("{factor:.2}"))
        .unwrap_or_else(|| "n/a".to_string());

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table
        .add_row(vec!["Total trades".to_string(), report.total_trades.to_string()])
        .add_row(vec!["Win rate".to_string(), win_rate])
        .add_row(vec!["Net profit".to_string(), format!("{:.2}", report.total_net_profit)])
        .add_row(vec!["Return".to_string(), format!("{:.2}%", report.total_return_pct)])
        .add_row(vec!["Max drawdown".to_string(), format!("{:.2}%", report.max_drawdown_pct)])
        .add_row(vec!["Profit factor".to_string(), profit_factor]);
    println!("{table}");
}
