use crate::compute::ComputationError;
use crate::periods::Period;
use crate::simulation::traceback::{format_key, StepKey, TraceLog};
use crate::simulation::{Origin, Simulation};
use crate::store::ParamValue;
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the recorded computation of `name` for `period` as an indented tree.
///
/// Requires a simulation created with `trace` or `debug`; steps that were not
/// recorded print as `(untraced)`.
pub fn format_trace(simulation: &Simulation, name: &str, period: &Period) -> Result<String, ComputationError> {
    let root = simulation.holder(name)?.trace_key(period);
    let log = simulation.trace_log();
    let mut tracer = Tracer {
        simulation,
        log: &log,
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    let _ = writeln!(tracer.output, "AUDIT TRACE for variable '{}':", format_key(&root));
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    tracer.trace_step(&root, 1, "");
    Ok(tracer.output)
}

struct Tracer<'a> {
    simulation: &'a Simulation,
    log: &'a TraceLog,
    visited_at_level: HashMap<StepKey, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_step(&mut self, key: &StepKey, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(key) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(key.clone(), level);

        let Some(step) = self.log.step(key) else {
            let value = self.format_value(key, &[]);
            let _ = writeln!(self.output, "{}[L{}] {}{} (untraced)", prefix, level, format_key(key), value);
            return;
        };
        let value = self.format_value(key, &step.extra_params);
        let _ = writeln!(
            self.output,
            "{}[L{}] {}{} ({})",
            prefix,
            level,
            format_key(key),
            value,
            origin_label(step.origin)
        );

        let stem = self.build_child_stem(prefix);
        let children = step.dependencies.clone();
        for (i, child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            self.trace_step(child, level + 1, &format!("{}{}", stem, connector));
        }
    }

    /// Reads the cached array under the extra parameters the step was
    /// evaluated with.
    fn format_value(&self, key: &StepKey, extra_params: &[ParamValue]) -> String {
        let Ok(holder) = self.simulation.holder(&key.0) else { return "[?]".to_string() };
        let period = key.1.unwrap_or(*self.simulation.period());
        match holder.get_array(&period, extra_params) {
            Some(array) => match array.len() {
                0 => "[]".to_string(),
                1 => format!("[{:.3}]", array[0]),
                _ => format!("[{:.3}, ...]", array[0]),
            },
            None => "[?]".to_string(),
        }
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        current_prefix.replace("`--", "   ").replace("|--", "|  ")
    }
}

fn origin_label(origin: Origin) -> &'static str {
    match origin {
        Origin::Formula => "formula",
        Origin::Default => "default",
        Origin::Cache => "cache",
        Origin::Input => "input",
    }
}
