//! # Helix Executor Crate
//!
//! This crate provides the components for simulated trade execution and
//! portfolio state management.
//!
//! ## Architectural Principles
//!
//! - **State vs. Logic Decoupling:** The `Executor` trait is a pure
//!   calculator that determines the effects of a trade (fees, slippage)
//!   without mutating state. The `Portfolio` struct is the state machine
//!   that applies the results of an execution to the account balance and
//!   positions. This separation is key for testability and clarity.
//! - **Determinism:** Given the same order and bar, an executor produces an
//!   identical fill (ids aside). The parallel optimizer relies on this.

// Declare the modules that constitute this crate.
pub mod error;
pub mod exchange;
pub mod portfolio;

// Re-export the key components to provide a clean, public-facing API.
pub use error::ExecutorError;
pub use exchange::{Executor, SimulatedExecutor};
pub use portfolio::Portfolio;
