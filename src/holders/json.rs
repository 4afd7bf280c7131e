//! JSON projection of a holder's cache.
use super::holder::Holder;
use super::ledger::Array;
use crate::periods::Period;
use crate::store::ExtraParams;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

impl Holder {
    /// Permanent variables give their single array (or `null`). Periodic
    /// variables give an object keyed by canonical period strings; periods
    /// carrying extra parameters nest one more object keyed by
    /// `"{name: value, ...}"`.
    pub fn to_value_json(&self, use_label: bool) -> Value {
        let variable = self.variable();
        let render = |array: &Array| -> Value {
            Value::Array(array.iter().map(|&cell| variable.cell_to_json(cell, use_label)).collect())
        };

        self.with_ledger(|ledger| {
            if variable.is_permanent() {
                return ledger.permanent().map_or(Value::Null, &render);
            }

            let mut by_period: BTreeMap<Period, Vec<(&ExtraParams, &Array)>> = BTreeMap::new();
            for ((period, extra_params), array) in ledger.entries() {
                by_period.entry(*period).or_default().push((extra_params, array));
            }

            let mut out = Map::new();
            for (period, entries) in by_period {
                let parameterised = entries.iter().any(|(extra, _)| !extra.is_empty());
                let value = if parameterised {
                    let nested: Map<String, Value> = entries
                        .into_iter()
                        .map(|(extra, array)| (self.extra_params_key(extra), render(array)))
                        .collect();
                    Value::Object(nested)
                } else {
                    entries.first().map_or(Value::Null, |(_, array)| render(array))
                };
                out.insert(period.to_string(), value);
            }
            Value::Object(out)
        })
    }

    /// `"{name: value, ...}"`, names taken from the formula's declaration.
    /// Positions the formula leaves unnamed are written `arg{i}`.
    fn extra_params_key(&self, extra_params: &ExtraParams) -> String {
        let names = self.parameter_names();
        let pairs: Vec<String> = extra_params
            .iter()
            .enumerate()
            .map(|(i, value)| match names.get(i) {
                Some(name) => format!("{}: {}", name, value),
                None => format!("arg{}: {}", i, value),
            })
            .collect();
        format!("{{{}}}", pairs.join(", "))
    }
}
