//! Error types for the period algebra.
use super::unit::DateUnit;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Expected a period (eg. '2017', '2017-01', '2017-01-01', 'month:2017-01:3', ...); got: '{value}'")]
    MalformedPeriodString { value: String },
    #[error("'{value}' is not a valid instant. Instants are described using the 'YYYY-MM-DD' format, for instance '2015-06-15'")]
    MalformedInstant { value: String },
    #[error("Ambiguous period '{value}': a '{base_unit}' base cannot start a '{unit}' period")]
    AmbiguousPeriod { value: String, unit: DateUnit, base_unit: DateUnit },
    #[error("Cannot decompose period '{period}' into '{unit}' periods")]
    InvalidDecomposition { period: String, unit: DateUnit },
    #[error("Operation '{operation}' is undefined for the unbounded period")]
    UnboundedPeriod { operation: &'static str },
}

impl PeriodError {
    pub(crate) fn malformed(value: impl Into<String>) -> Self {
        Self::MalformedPeriodString { value: value.into() }
    }

    pub(crate) fn malformed_instant(value: impl Into<String>) -> Self {
        Self::MalformedInstant { value: value.into() }
    }
}
