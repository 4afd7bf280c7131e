//! Read-only view of one cached (or derived) array.
use super::holder::Holder;
use super::ledger::Array;
use crate::compute::ComputationError;
use crate::periods::Period;
use crate::store::{ExtraParams, ParamValue, Variable};
use std::sync::Arc;

/// Binds an array to the `(period, extra_params)` it was produced for.
///
/// The holder is the only writer; [`DatedHolder::set_array`] always fails.
#[derive(Debug, Clone)]
pub struct DatedHolder<'h> {
    holder: &'h Holder,
    period: Period,
    extra_params: ExtraParams,
    array: Array,
}

impl<'h> DatedHolder<'h> {
    pub(crate) fn new(holder: &'h Holder, period: Period, extra_params: &[ParamValue], array: Array) -> Self {
        Self { holder, period, extra_params: ExtraParams::from(extra_params), array }
    }

    pub fn holder(&self) -> &'h Holder { self.holder }
    pub fn variable(&self) -> &'h Arc<Variable> { self.holder.variable() }
    pub fn period(&self) -> &Period { &self.period }
    pub fn extra_params(&self) -> &[ParamValue] { &self.extra_params }

    #[inline]
    pub fn array(&self) -> &[f64] { &self.array }

    /// The shared buffer, without copying.
    pub fn shared_array(&self) -> Array { Arc::clone(&self.array) }

    pub fn into_array(self) -> Array { self.array }

    /// Writes go through [`Holder::put_in_cache`].
    pub fn set_array(&self, _array: Vec<f64>) -> Result<(), ComputationError> {
        Err(ComputationError::ImmutableArrayWrite {
            variable: self.holder.name().to_string(),
            period: self.period.to_string(),
        })
    }

    /// Cells rendered by the variable's value type.
    pub fn to_value_json(&self, use_label: bool) -> serde_json::Value {
        let variable = self.holder.variable();
        serde_json::Value::Array(self.array.iter().map(|&cell| variable.cell_to_json(cell, use_label)).collect())
    }
}
