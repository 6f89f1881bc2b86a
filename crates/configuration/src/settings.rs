use crate::error::ConfigError;
use crate::search_config::{SearchConfig, WalkForwardConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backtest: Backtest,
    pub simulation: Simulation,
    pub risk_management: RiskManagement,
    /// Default rule parameters, used by the plain `backtest` command when no
    /// optimized vector is available.
    pub strategy: StrategyParams,
    pub search: SearchConfig,
    pub walk_forward: WalkForwardConfig,
}

impl Config {
    /// Validates every section. Called once at load time; any failure aborts
    /// startup before a search can begin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backtest.validate()?;
        self.simulation.validate()?;
        self.risk_management.validate()?;
        self.strategy
            .validate()
            .map_err(|reason| ConfigError::invalid("strategy", reason))?;
        self.search.validate()?;
        self.walk_forward.validate()?;
        Ok(())
    }
}

/// Contains parameters shared by every simulated run.
#[derive(Debug, Clone, Deserialize)]
pub struct Backtest {
    /// The symbol to trade (e.g., "BTCUSDT").
    pub symbol: String,
    /// The timeframe interval to use (e.g., "1h").
    pub interval: String,
    /// The starting capital for each simulation.
    pub initial_capital: Decimal,
    /// Commission applied to the held-out validation runs. The original
    /// system validated with a higher fee than it optimized with.
    pub validation_fee_pct: Decimal,
}

impl Backtest {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.is_empty() {
            return Err(ConfigError::invalid("backtest.symbol", "must not be empty"));
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::invalid("backtest.initial_capital", "must be positive"));
        }
        Ok(())
    }
}

/// Contains parameters for the order simulation engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    /// The trading fee charged for a "taker" order during optimization.
    /// 0.0005 corresponds to 0.05%.
    pub taker_fee_pct: Decimal,
    /// Assumed price slippage for market orders, as a fraction of the bar's
    /// high-low range.
    pub slippage_pct: Decimal,
    /// Initial margin requirement. 0.2 means positions are sized with 5x
    /// leverage; 1.0 means fully funded positions.
    pub margin_factor: Decimal,
}

impl Simulation {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.taker_fee_pct < Decimal::ZERO {
            return Err(ConfigError::invalid("simulation.taker_fee_pct", "must not be negative"));
        }
        if self.margin_factor <= Decimal::ZERO || self.margin_factor > Decimal::ONE {
            return Err(ConfigError::invalid(
                "simulation.margin_factor",
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Contains parameters for trade-level risk management.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskManagement {
    /// The fraction of total portfolio equity committed to a single trade
    /// before leverage (e.g., 0.05 for 5%).
    pub risk_per_trade_pct: Decimal,
}

impl RiskManagement {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.risk_per_trade_pct <= Decimal::ZERO || self.risk_per_trade_pct > Decimal::ONE {
            return Err(ConfigError::invalid(
                "risk_management.risk_per_trade_pct",
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// The tunable parameters of the trading rule — the gene vector of the
/// search. All nine fields are integers; the search treats them uniformly
/// (see `as_genes`/`from_genes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub macd_short_period: u32,
    pub macd_long_period: u32,
    pub macd_signal_period: u32,
    pub sma_fast_period: u32,
    /// The slow SMA period is expressed as an offset on top of the fast
    /// period, which guarantees slow >= fast + 1 by construction.
    pub sma_slow_offset: u32,
    pub rsi_period: u32,
    pub rsi_oversold: u32,
    pub rsi_overbought: u32,
    pub bb_period: u32,
}

/// The number of genes in a [`StrategyParams`] vector.
pub const GENE_COUNT: usize = 9;

impl StrategyParams {
    /// The effective slow SMA period.
    pub fn sma_slow_period(&self) -> u32 {
        self.sma_fast_period + self.sma_slow_offset
    }

    /// The longest lookback any indicator in the rule needs. A window with
    /// fewer bars than this cannot produce a single post-warm-up decision.
    pub fn max_lookback(&self) -> u32 {
        let macd = self.macd_long_period + self.macd_signal_period;
        macd.max(self.sma_slow_period())
            .max(self.rsi_period)
            .max(self.bb_period)
    }

    /// Checks the pairwise invariants of the rule. Range membership is the
    /// search's responsibility; this guards the relationships between genes.
    pub fn validate(&self) -> Result<(), String> {
        if self.macd_short_period == 0
            || self.macd_long_period == 0
            || self.macd_signal_period == 0
            || self.sma_fast_period == 0
            || self.sma_slow_offset == 0
            || self.rsi_period == 0
            || self.bb_period == 0
        {
            return Err("indicator periods must be positive".to_string());
        }
        if self.macd_short_period >= self.macd_long_period {
            return Err(format!(
                "macd_short_period ({}) must be less than macd_long_period ({})",
                self.macd_short_period, self.macd_long_period
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(format!(
                "rsi_oversold ({}) must be less than rsi_overbought ({})",
                self.rsi_oversold, self.rsi_overbought
            ));
        }
        if self.rsi_overbought > 100 {
            return Err("rsi_overbought must be at most 100".to_string());
        }
        Ok(())
    }

    /// Flattens the vector into gene order. The order is part of the search
    /// contract: crossover and mutation index into it.
    pub fn as_genes(&self) -> [u32; GENE_COUNT] {
        [
            self.macd_short_period,
            self.macd_long_period,
            self.macd_signal_period,
            self.sma_fast_period,
            self.sma_slow_offset,
            self.rsi_period,
            self.rsi_oversold,
            self.rsi_overbought,
            self.bb_period,
        ]
    }

    pub fn from_genes(genes: [u32; GENE_COUNT]) -> Self {
        Self {
            macd_short_period: genes[0],
            macd_long_period: genes[1],
            macd_signal_period: genes[2],
            sma_fast_period: genes[3],
            sma_slow_offset: genes[4],
            rsi_period: genes[5],
            rsi_oversold: genes[6],
            rsi_overbought: genes[7],
            bb_period: genes[8],
        }
    }
}
