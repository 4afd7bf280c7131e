//! Simulation state, configuration, evaluation stack and variants.
pub mod config;
pub mod scenario;
#[allow(clippy::module_inception)]
pub mod simulation;
pub mod traceback;

pub use config::{ConfigError, SimulationConfig};
pub use scenario::run_variants;
pub use simulation::Simulation;
pub use traceback::{Origin, StepKey, TraceLog, TraceStep};
