//! The genetic parameter search.
//!
//! This crate owns the two pieces of real algorithmic machinery in the
//! system: [`fitness::WalkForwardFitness`], which reduces a candidate's
//! multi-window backtest results to one scalar, and
//! [`search::PopulationSearch`], the generational loop that breeds
//! candidates against that objective.

pub mod error;
pub mod fitness;
pub mod genome;
pub mod search;

pub use error::OptimizerError;
pub use fitness::{FitnessError, FitnessFn, WalkForwardFitness};
pub use search::{Individual, PopulationSearch, SearchOutcome, SelectionPolicy};
