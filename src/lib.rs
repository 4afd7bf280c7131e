//! Temporal caching engine for a legislative microsimulation.
//!
//! Variables are computed per calendar period and cached by holders; the
//! `periods` module provides the instant/period algebra they are keyed on.
pub mod analysis;
pub mod compute;
pub mod display;
pub mod holders;
pub mod periods;
pub mod simulation;
pub mod store;

#[cfg(feature = "python")]
pub mod bindings;

pub use compute::{ComputationError, FnFormula, Formula};
pub use holders::{DatedHolder, Holder};
pub use periods::{instant, period, DateUnit, Instant, Period, PeriodError};
pub use simulation::{run_variants, Simulation, SimulationConfig};
pub use store::{Granularity, ParamValue, Registry, Variable};

// FFI facade: the `_core` Python module.
#[cfg(feature = "python")]
mod python_module {
    use crate::bindings::python;
    use pyo3::prelude::*;

    /// The name `_core` marks the module as the compiled half of the package.
    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<python::PyPeriod>()?;
        m.add_function(wrap_pyfunction!(python::period, m)?)?;
        m.add_function(wrap_pyfunction!(python::instant, m)?)?;
        m.add_function(wrap_pyfunction!(python::key_period_size, m)?)?;
        Ok(())
    }
}
