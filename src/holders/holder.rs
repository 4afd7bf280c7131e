//! The per-variable temporal cache.
use super::dated::DatedHolder;
use super::ledger::{Array, CacheKey, Ledger, MemoryUsage};
use crate::compute::{kernel, ComputationError, Formula};
use crate::periods::{DateUnit, Period};
use crate::simulation::{Origin, Simulation};
use crate::store::{Granularity, InputBehavior, ParamValue, Variable};
use std::cell::RefCell;
use std::sync::Arc;

/// Tolerance when checking a divided input against already known parts.
const INPUT_TOLERANCE: f64 = 1e-6;

/// Caches the arrays of one variable for one population.
///
/// All methods take `&self`: formulas recursively request other variables of
/// the same simulation, so the ledger sits behind a `RefCell` and no borrow of
/// it outlives a single read or write.
#[derive(Debug)]
pub struct Holder {
    variable: Arc<Variable>,
    count: usize,
    formula: Option<Arc<dyn Formula>>,
    opt_out: bool,
    ledger: RefCell<Ledger>,
}

impl Holder {
    /// `opt_out` skips persistent caching of periodic entries.
    pub fn new(variable: Arc<Variable>, count: usize, formula: Option<Arc<dyn Formula>>, opt_out: bool) -> Self {
        Self { variable, count, formula, opt_out, ledger: RefCell::new(Ledger::new()) }
    }

    #[inline]
    pub fn variable(&self) -> &Arc<Variable> { &self.variable }
    #[inline]
    pub fn name(&self) -> &str { &self.variable.name }
    #[inline]
    pub fn count(&self) -> usize { self.count }
    pub fn formula(&self) -> Option<&Arc<dyn Formula>> { self.formula.as_ref() }
    pub fn is_opted_out(&self) -> bool { self.opt_out }

    /// Names of the extra parameters, as declared by the formula.
    pub fn parameter_names(&self) -> &[String] {
        match self.formula.as_deref() {
            Some(formula) => formula.parameter_names(),
            None => &[],
        }
    }

    /// Key used in traces and evaluation frames. Permanent variables have no period.
    pub(crate) fn trace_key(&self, period: &Period) -> (String, Option<Period>) {
        let period = if self.variable.is_permanent() { None } else { Some(*period) };
        (self.variable.name.clone(), period)
    }

    /// Pure read of the stored array; never calls the formula.
    pub fn get_array(&self, period: &Period, extra_params: &[ParamValue]) -> Option<Array> {
        let ledger = self.ledger.borrow();
        if self.variable.is_permanent() {
            return ledger.permanent().cloned();
        }
        ledger.get(period, extra_params).cloned()
    }

    fn check_period(&self, period: &Period) -> Result<(), ComputationError> {
        let granularity = self.variable.definition_period;
        let Some(unit) = granularity.unit() else { return Ok(()) };
        if period.unit() != unit {
            return Err(ComputationError::PeriodUnitMismatch {
                variable: self.variable.name.clone(),
                period: period.to_string(),
                expected: granularity,
            });
        }
        if !period.is_atomic() {
            return Err(ComputationError::ComplexPeriodRequested {
                variable: self.variable.name.clone(),
                period: period.to_string(),
            });
        }
        Ok(())
    }

    fn check_length(&self, array: &[f64]) -> Result<(), ComputationError> {
        if array.len() != self.count {
            return Err(ComputationError::ArrayLengthMismatch {
                variable: self.variable.name.clone(),
                expected: self.count,
                found: array.len(),
            });
        }
        Ok(())
    }

    fn granularity_error(&self, period: &Period, reason: &'static str) -> ComputationError {
        ComputationError::GranularityMismatch {
            variable: self.variable.name.clone(),
            period: period.to_string(),
            reason,
        }
    }

    /// Returns the array for `period`, computing and caching it on a miss.
    ///
    /// The result is always dated with the requested period. Outside the
    /// variable's validity window, or without a formula, the default array
    /// is stored instead.
    pub fn compute(
        &self,
        simulation: &Simulation,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<DatedHolder<'_>, ComputationError> {
        self.check_period(period)?;
        let key = self.trace_key(period);
        simulation.note_dependency(&key);

        if let Some(array) = self.get_array(period, extra_params) {
            tracing::trace!(variable = %self.variable.name, %period, "cache hit");
            simulation.record_step(key, Origin::Cache, extra_params, Vec::new());
            return Ok(DatedHolder::new(self, *period, extra_params, array));
        }

        let (values, origin, dependencies) = match &self.formula {
            Some(formula) if self.variable.in_window(period) => {
                tracing::debug!(variable = %self.variable.name, %period, "evaluating formula");
                let frame = simulation.enter(key.clone())?;
                let values = formula.compute(simulation, period, extra_params)?;
                (values, Origin::Formula, frame.finish())
            }
            _ => (self.default_array(), Origin::Default, Vec::new()),
        };
        simulation.record_step(key, origin, extra_params, dependencies);
        self.put_in_cache(values, period, extra_params)
    }

    /// Sums the unit sub-periods of `period` on a private buffer.
    ///
    /// The sum is not cached under the composite period; each sub-period is
    /// computed (and cached) through [`Holder::compute`].
    pub fn compute_add(
        &self,
        simulation: &Simulation,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<DatedHolder<'_>, ComputationError> {
        let Some(unit) = self.variable.definition_period.unit() else {
            return Err(self.granularity_error(period, "addition requires a monthly or yearly variable"));
        };
        if unit == DateUnit::Year && period.unit() == DateUnit::Month {
            return Err(self.granularity_error(period, "a yearly variable cannot be summed over months"));
        }
        if period.is_eternity() || period.unit().weight() < unit.weight() {
            return Err(self.granularity_error(period, "the period is finer than the variable"));
        }

        let mut total: Option<Vec<f64>> = None;
        for sub_period in period.decompose(unit)? {
            let dated = self.compute(simulation, &sub_period, extra_params)?;
            total = Some(match total.take() {
                Some(mut acc) => {
                    kernel::add_assign(&mut acc, dated.array());
                    acc
                }
                None => dated.array().to_vec(),
            });
        }
        let array = total.unwrap_or_else(|| self.default_array());
        Ok(DatedHolder::new(self, *period, extra_params, Arc::new(array)))
    }

    /// One twelfth of the enclosing calendar year, not cached.
    pub fn compute_divide(
        &self,
        simulation: &Simulation,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<DatedHolder<'_>, ComputationError> {
        if self.variable.definition_period != Granularity::Year {
            return Err(self.granularity_error(period, "division requires a yearly variable"));
        }
        if period.unit() != DateUnit::Month {
            return Err(self.granularity_error(period, "division only produces months"));
        }
        let year = period.this_year()?;
        let dated = self.compute(simulation, &year, extra_params)?;
        let mut array = dated.array().to_vec();
        kernel::div_assign_scalar(&mut array, 12.0);
        Ok(DatedHolder::new(self, *period, extra_params, Arc::new(array)))
    }

    /// Stores `array` for `(period, extra_params)` and returns a fresh read.
    ///
    /// Permanent variables overwrite their single slot whatever the period.
    /// Opted-out periodic variables get a transient view and the ledger is
    /// left untouched.
    pub fn put_in_cache(
        &self,
        array: impl Into<Array>,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<DatedHolder<'_>, ComputationError> {
        let array = array.into();
        self.check_period(period)?;
        self.check_length(&array)?;

        let permanent = self.variable.is_permanent();
        if self.opt_out && !permanent {
            tracing::trace!(variable = %self.variable.name, %period, "cache opt-out, write skipped");
            return Ok(DatedHolder::new(self, *period, extra_params, array));
        }
        let stored = {
            let mut ledger = self.ledger.borrow_mut();
            if permanent {
                Arc::clone(ledger.set_permanent(array))
            } else {
                Arc::clone(ledger.insert(*period, extra_params, array))
            }
        };
        Ok(DatedHolder::new(self, *period, extra_params, stored))
    }

    /// Records an input, spreading it over unit sub-periods when the variable
    /// declares a dispatch or divide behaviour.
    pub fn set_input(&self, period: &Period, array: Vec<f64>) -> Result<(), ComputationError> {
        self.check_length(&array)?;
        let unit = match self.variable.definition_period.unit() {
            Some(unit) if self.variable.set_input != InputBehavior::Direct => unit,
            _ => return self.put_in_cache(array, period, &[]).map(|_| ()),
        };
        if period.unit() == unit && period.is_atomic() {
            return self.put_in_cache(array, period, &[]).map(|_| ());
        }
        if period.is_eternity() || period.unit().weight() < unit.weight() {
            return Err(self.granularity_error(period, "an input cannot be spread over finer periods"));
        }

        let sub_periods = period.decompose(unit)?;
        let (known, unknown): (Vec<Period>, Vec<Period>) = sub_periods
            .into_iter()
            .partition(|p| self.get_array(p, &[]).is_some());

        match self.variable.set_input {
            InputBehavior::DispatchByPeriod => {
                let shared: Array = Arc::new(array);
                for sub_period in &unknown {
                    self.put_in_cache(Arc::clone(&shared), sub_period, &[])?;
                }
            }
            _ => {
                let mut remaining = array;
                for sub_period in &known {
                    if let Some(existing) = self.get_array(sub_period, &[]) {
                        kernel::sub_assign(&mut remaining, &existing);
                    }
                }
                if unknown.is_empty() {
                    if !kernel::approx_eq(&remaining, &vec![0.0; self.count], INPUT_TOLERANCE) {
                        return Err(ComputationError::InconsistentInput {
                            variable: self.variable.name.clone(),
                            period: period.to_string(),
                            message: "the total does not match the values already known for its sub-periods"
                                .to_string(),
                        });
                    }
                    return Ok(());
                }
                kernel::div_assign_scalar(&mut remaining, unknown.len() as f64);
                let shared: Array = Arc::new(remaining);
                for sub_period in &unknown {
                    self.put_in_cache(Arc::clone(&shared), sub_period, &[])?;
                }
            }
        }
        tracing::debug!(variable = %self.variable.name, %period, filled = unknown.len(), "input spread over sub-periods");
        Ok(())
    }

    pub fn default_array(&self) -> Vec<f64> {
        vec![self.variable.default_value; self.count]
    }

    /// Cached keys, in period order.
    pub fn known_periods(&self) -> Vec<CacheKey> {
        self.ledger.borrow().keys().cloned().collect()
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        self.ledger.borrow().usage()
    }

    pub fn delete_arrays(&self) {
        self.ledger.borrow_mut().clear();
    }

    pub(crate) fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.ledger.borrow())
    }
}

impl Clone for Holder {
    /// Duplicates the ledger map; arrays and formula are shared.
    fn clone(&self) -> Self {
        Self {
            variable: Arc::clone(&self.variable),
            count: self.count,
            formula: self.formula.clone(),
            opt_out: self.opt_out,
            ledger: RefCell::new(self.ledger.borrow().clone()),
        }
    }
}
