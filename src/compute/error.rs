use crate::periods::PeriodError;
use crate::store::Granularity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("Wrong period unit for variable {variable}: {period} is not a {expected} period")]
    PeriodUnitMismatch { variable: String, period: String, expected: Granularity },
    #[error("Computation requested for complex period {period} for variable {variable}")]
    ComplexPeriodRequested { variable: String, period: String },
    #[error("Aggregation over {period} impossible for variable {variable}: {reason}")]
    GranularityMismatch { variable: String, period: String, reason: &'static str },
    #[error("Impossible to modify the array of {variable} for {period}; use Holder::put_in_cache")]
    ImmutableArrayWrite { variable: String, period: String },
    #[error("Array for variable {variable} has {found} cells, expected {expected}")]
    ArrayLengthMismatch { variable: String, expected: usize, found: usize },
    #[error("Circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
    #[error("Inconsistent input for variable {variable} over {period}: {message}")]
    InconsistentInput { variable: String, period: String, message: String },
    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },
    #[error("Variable {variable} belongs to unknown entity {entity}")]
    UnknownEntity { variable: String, entity: String },
    #[error("Formula of {variable} failed: {message}")]
    FormulaFailed { variable: String, message: String },
    #[error(transparent)]
    Period(#[from] PeriodError),
}
