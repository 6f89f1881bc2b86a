use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod search_config;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use search_config::{
    GeneBounds, GeneRange, SearchConfig, SelectionKind, WalkForwardConfig,
};
pub use settings::{Backtest, Config, GENE_COUNT, RiskManagement, Simulation, StrategyParams};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, deserializes it into our strongly-typed `Config`
/// struct, validates it, and returns it. Validation failures here are fatal:
/// a search must never start from an inconsistent parameter space.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

pub const DEFAULT_CONFIG_FILE: &str = "config";

/// Loads configuration from a specific file name (without extension).
pub fn load_config_from(name: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(name))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
