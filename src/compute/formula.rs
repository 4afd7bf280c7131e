//! The contract a holder calls on a cache miss.
use super::error::ComputationError;
use crate::periods::Period;
use crate::simulation::Simulation;
use crate::store::ParamValue;
use std::fmt;

/// Produces the array of one variable for one period.
///
/// Formulas are immutable and hold no reference to a holder, so cloned
/// simulations share them. Other variables are requested through `simulation`.
pub trait Formula: Send + Sync + fmt::Debug {
    fn compute(
        &self,
        simulation: &Simulation,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<Vec<f64>, ComputationError>;

    /// Names labelling the extra-parameter tuple, in order.
    fn parameter_names(&self) -> &[String] {
        &[]
    }

    /// Variables this formula may request.
    fn dependencies(&self) -> &[String] {
        &[]
    }
}

type FormulaFn =
    dyn Fn(&Simulation, &Period, &[ParamValue]) -> Result<Vec<f64>, ComputationError> + Send + Sync;

/// A [`Formula`] backed by a closure.
pub struct FnFormula {
    func: Box<FormulaFn>,
    parameter_names: Vec<String>,
    dependencies: Vec<String>,
}

impl FnFormula {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Simulation, &Period, &[ParamValue]) -> Result<Vec<f64>, ComputationError> + Send + Sync + 'static,
    {
        Self { func: Box::new(func), parameter_names: Vec::new(), dependencies: Vec::new() }
    }

    pub fn with_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for FnFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFormula")
            .field("parameter_names", &self.parameter_names)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl Formula for FnFormula {
    fn compute(
        &self,
        simulation: &Simulation,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<Vec<f64>, ComputationError> {
        (self.func)(simulation, period, extra_params)
    }

    fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}
