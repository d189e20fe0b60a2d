//! Post-persistence consequence handling.
//!
//! - [`Scenario`]: classification of the `Consecuencia` column
//! - [`ScenarioHandler`]: pluggable per-scenario handler
//! - [`ScenarioDispatcher`]: routes a stored event to its handler

pub mod dispatcher;
pub mod traits;

pub use dispatcher::{LoggingHandler, ScenarioDispatcher};
pub use traits::{Scenario, ScenarioError, ScenarioHandler};
