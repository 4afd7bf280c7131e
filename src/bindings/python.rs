use crate::periods::{self, DateUnit, Period};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn value_error(e: impl ToString) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_unit(unit: &str) -> PyResult<DateUnit> {
    unit.parse().map_err(|_| PyValueError::new_err(format!("Unknown date unit '{}'", unit)))
}

#[pyclass(name = "Period", frozen, eq, hash)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PyPeriod {
    pub inner: Period,
}

#[pymethods]
impl PyPeriod {
    #[new]
    pub fn new(value: &str) -> PyResult<Self> {
        periods::parse_period(value).map(|inner| Self { inner }).map_err(value_error)
    }

    #[getter]
    pub fn unit(&self) -> &'static str { self.inner.unit().as_str() }

    /// `None` for eternity.
    #[getter]
    pub fn size(&self) -> Option<u32> { self.inner.size().units() }

    #[getter]
    pub fn start(&self) -> String { self.inner.start().to_string() }

    #[getter]
    pub fn stop(&self) -> String { self.inner.stop().to_string() }

    #[pyo3(signature = (amount, unit=None))]
    pub fn offset(&self, amount: i64, unit: Option<&str>) -> PyResult<Self> {
        let unit = unit.map(parse_unit).transpose()?;
        self.inner.offset(amount, unit).map(|inner| Self { inner }).map_err(value_error)
    }

    pub fn decompose(&self, unit: &str) -> PyResult<Vec<Self>> {
        let periods = self.inner.decompose(parse_unit(unit)?).map_err(value_error)?;
        Ok(periods.into_iter().map(|inner| Self { inner }).collect())
    }

    pub fn contains(&self, other: &Self) -> bool { self.inner.contains(&other.inner) }

    pub fn __str__(&self) -> String { self.inner.to_string() }

    pub fn __repr__(&self) -> String { format!("Period('{}')", self.inner) }
}

/// Parses a period string into a `Period`.
#[pyfunction]
pub fn period(value: &str) -> PyResult<PyPeriod> {
    PyPeriod::new(value)
}

/// Normalizes an instant string to `YYYY-MM-DD`.
#[pyfunction]
pub fn instant(value: &str) -> PyResult<String> {
    periods::parse_instant(value).map(|i| i.to_string()).map_err(value_error)
}

#[pyfunction]
pub fn key_period_size(value: &str) -> PyResult<String> {
    let period = periods::parse_period(value).map_err(value_error)?;
    Ok(periods::key_period_size(&period))
}
