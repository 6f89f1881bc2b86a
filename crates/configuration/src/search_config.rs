use crate::error::ConfigError;
use crate::settings::{GENE_COUNT, StrategyParams};
use serde::Deserialize;

/// Defines the genetic search: how large the population is, how long it
/// runs, how parents are chosen, and the box the gene vector lives in.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub population_size: usize,
    pub generations: usize,
    /// How many of the fittest members are eligible as parents (and carried
    /// over unchanged as elites).
    pub num_parents: usize,
    /// How many genes are perturbed in each offspring.
    pub mutation_num_genes: usize,
    #[serde(default)]
    pub selection: SelectionKind,
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Stop early when the best score has not improved for this many
    /// generations. Absent means "run the full generation budget".
    #[serde(default)]
    pub stagnation_generations: Option<usize>,
    /// Seed for the search RNG. Absent means a fresh entropy seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
    pub bounds: GeneBounds,
}

fn default_tournament_size() -> usize {
    3
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::invalid("search.population_size", "must be at least 1"));
        }
        if self.generations == 0 {
            return Err(ConfigError::invalid("search.generations", "must be at least 1"));
        }
        if self.num_parents == 0 || self.num_parents > self.population_size {
            return Err(ConfigError::invalid(
                "search.num_parents",
                format!("must be in 1..={}", self.population_size),
            ));
        }
        if self.mutation_num_genes > GENE_COUNT {
            return Err(ConfigError::invalid(
                "search.mutation_num_genes",
                format!("must be at most {GENE_COUNT}"),
            ));
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::invalid("search.tournament_size", "must be at least 1"));
        }
        self.bounds.validate()
    }
}

/// The parent-selection policy for reproduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    /// Rank selection among the `num_parents` fittest members.
    #[default]
    TopK,
    /// Repeated k-way tournaments over the whole population.
    Tournament,
}

/// An inclusive integer range for one gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GeneRange {
    pub min: u32,
    pub max: u32,
}

impl GeneRange {
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }
}

/// The declared range of every gene. The search must never evaluate a
/// vector outside this box.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneBounds {
    pub macd_short_period: GeneRange,
    pub macd_long_period: GeneRange,
    pub macd_signal_period: GeneRange,
    pub sma_fast_period: GeneRange,
    pub sma_slow_offset: GeneRange,
    pub rsi_period: GeneRange,
    pub rsi_oversold: GeneRange,
    pub rsi_overbought: GeneRange,
    pub bb_period: GeneRange,
}

impl GeneBounds {
    /// The ranges in gene order, matching `StrategyParams::as_genes`.
    pub fn as_ranges(&self) -> [GeneRange; GENE_COUNT] {
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

    pub fn contains(&self, params: &StrategyParams) -> bool {
        self.as_ranges()
            .iter()
            .zip(params.as_genes())
            .all(|(range, gene)| range.contains(gene))
    }

    /// Checks that the box is well-formed and that the pairwise invariants
    /// of the rule can always be restored by clamping:
    /// - MACD ranges must not overlap, so short < long holds for any pick.
    /// - Any in-range `rsi_overbought` must leave room below it for an
    ///   in-range `rsi_oversold`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            "macd_short_period",
            "macd_long_period",
            "macd_signal_period",
            "sma_fast_period",
            "sma_slow_offset",
            "rsi_period",
            "rsi_oversold",
            "rsi_overbought",
            "bb_period",
        ];
        for (range, name) in self.as_ranges().iter().zip(names) {
            if range.min > range.max {
                return Err(ConfigError::invalid(
                    "search.bounds",
                    format!("{name}: min {} exceeds max {}", range.min, range.max),
                ));
            }
            if range.min == 0 && name != "rsi_oversold" {
                return Err(ConfigError::invalid(
                    "search.bounds",
                    format!("{name}: must be positive"),
                ));
            }
        }
        if self.macd_short_period.max >= self.macd_long_period.min {
            return Err(ConfigError::invalid(
                "search.bounds",
                "macd_short_period range must lie entirely below macd_long_period range",
            ));
        }
        if self.rsi_oversold.min >= self.rsi_overbought.min {
            return Err(ConfigError::invalid(
                "search.bounds",
                "rsi_oversold.min must be below rsi_overbought.min so the \
                 oversold < overbought invariant is always repairable",
            ));
        }
        if self.rsi_overbought.max > 100 {
            return Err(ConfigError::invalid(
                "search.bounds",
                "rsi_overbought.max must be at most 100",
            ));
        }
        Ok(())
    }
}

/// Defines the walk-forward evaluation set and the held-out validation
/// periods.
#[derive(Debug, Clone, Deserialize)]
pub struct WalkForwardConfig {
    /// How many consecutive windows to evaluate each candidate against.
    pub window_count: usize,
    /// The length of each window, in days.
    pub window_days: i64,
    /// The length of the held-out validation period, in days.
    pub holdout_days: i64,
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_count == 0 {
            return Err(ConfigError::invalid("walk_forward.window_count", "must be at least 1"));
        }
        if self.window_days <= 0 {
            return Err(ConfigError::invalid("walk_forward.window_days", "must be positive"));
        }
        if self.holdout_days <= 0 {
            return Err(ConfigError::invalid("walk_forward.holdout_days", "must be positive"));
        }
        Ok(())
    }
}
