//! # Helix Strategy Library
//!
//! This crate contains the trading logic of the system. It defines a
//! universal `Strategy` trait and the concrete crossover rule whose
//! parameters the optimizer searches.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   data sources, simulation, or execution. It depends only on `core-types`
//!   and `configuration`.
//! - **Explicit parameters:** A strategy instance is built from an explicit
//!   [`configuration::StrategyParams`] value. There is no shared or global
//!   parameter state, so any number of instances can be evaluated in
//!   parallel with different gene vectors.

pub mod crossover_gate;
pub mod error;

pub use crossover_gate::CrossoverGate;
pub use error::StrategyError;

use core_types::{Kline, Signal};

/// The core trait that all trading strategies must implement.
///
/// The `&mut self` in `evaluate` is crucial, as strategies maintain their
/// own internal state (previous indicator values). The `Send + Sync` bounds
/// are required to allow strategies to be used across multiple threads in
/// the parallel optimizer.
pub trait Strategy: Send + Sync {
    /// Evaluates the strategy based on a new Kline bar.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Signal))` - if the strategy's conditions are met to generate a trade signal.
    /// * `Ok(None)` - if the strategy's conditions are not met, and no action should be taken.
    /// * `Err(StrategyError)` - if an error occurs during evaluation.
    fn evaluate(&mut self, kline: &Kline) -> Result<Option<Signal>, StrategyError>;
}
