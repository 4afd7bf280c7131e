//! Evaluation stack (cycle guard) and the trace log of a simulation.
use crate::compute::ComputationError;
use crate::periods::Period;
use crate::store::{ExtraParams, ParamValue};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// `(variable, period)`; permanent variables carry no period.
pub type StepKey = (String, Option<Period>);

pub fn format_key(key: &StepKey) -> String {
    match &key.1 {
        Some(period) => format!("{}<{}>", key.0, period),
        None => key.0.clone(),
    }
}

/// Where a traced value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Formula,
    Default,
    Cache,
    Input,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub origin: Origin,
    /// Extra parameters of the recorded evaluation.
    pub extra_params: ExtraParams,
    pub dependencies: Vec<StepKey>,
}

/// First record per key wins, so a value computed by a formula keeps that
/// origin when later served from cache.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    steps: BTreeMap<StepKey, TraceStep>,
}

impl TraceLog {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, key: StepKey, origin: Origin, extra_params: &[ParamValue], dependencies: Vec<StepKey>) {
        self.steps
            .entry(key)
            .or_insert_with(|| TraceStep { origin, extra_params: ExtraParams::from(extra_params), dependencies });
    }

    pub fn get(&self, variable: &str, period: Option<&Period>) -> Option<&TraceStep> {
        self.steps.get(&(variable.to_string(), period.copied()))
    }

    pub fn step(&self, key: &StepKey) -> Option<&TraceStep> {
        self.steps.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StepKey, &TraceStep)> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize { self.steps.len() }
    pub fn is_empty(&self) -> bool { self.steps.is_empty() }
    pub fn clear(&mut self) { self.steps.clear(); }
}

#[derive(Debug)]
struct Frame {
    key: StepKey,
    dependencies: Vec<StepKey>,
}

/// Formula evaluations currently in progress, innermost last.
#[derive(Debug, Default)]
pub struct EvaluationStack {
    frames: RefCell<Vec<Frame>>,
}

impl EvaluationStack {
    pub fn new() -> Self { Self::default() }

    /// Pushes a frame, failing if `key` is already being evaluated.
    pub fn enter(&self, key: StepKey) -> Result<FrameGuard<'_>, ComputationError> {
        let mut frames = self.frames.borrow_mut();
        if let Some(pos) = frames.iter().position(|f| f.key == key) {
            let mut cycle: Vec<String> = frames[pos..].iter().map(|f| format_key(&f.key)).collect();
            cycle.push(format_key(&key));
            tracing::warn!(cycle = %cycle.join(" -> "), "circular dependency");
            return Err(ComputationError::CircularDependency { cycle });
        }
        frames.push(Frame { key, dependencies: Vec::new() });
        Ok(FrameGuard { stack: self, finished: false })
    }

    /// Attributes `key` to the innermost evaluation.
    pub fn note_dependency(&self, key: &StepKey) {
        if let Some(frame) = self.frames.borrow_mut().last_mut() {
            if !frame.dependencies.contains(key) {
                frame.dependencies.push(key.clone());
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    fn pop(&self) -> Vec<StepKey> {
        self.frames.borrow_mut().pop().map(|f| f.dependencies).unwrap_or_default()
    }
}

/// Pops its frame when finished or dropped (including on error paths).
#[must_use]
pub struct FrameGuard<'a> {
    stack: &'a EvaluationStack,
    finished: bool,
}

impl FrameGuard<'_> {
    /// Pops the frame and returns the dependencies noted under it.
    pub fn finish(mut self) -> Vec<StepKey> {
        self.finished = true;
        self.stack.pop()
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, year: i32) -> StepKey {
        (name.to_string(), Some(Period::year(year).unwrap()))
    }

    #[test]
    fn test_reentry_is_a_cycle() {
        let stack = EvaluationStack::new();
        let _a = stack.enter(key("a", 2021)).unwrap();
        let _b = stack.enter(key("b", 2021)).unwrap();
        let err = stack.enter(key("a", 2021)).err().unwrap();
        match err {
            ComputationError::CircularDependency { cycle } => {
                assert_eq!(cycle, vec!["a<2021>", "b<2021>", "a<2021>"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_same_variable_other_period_is_allowed() {
        let stack = EvaluationStack::new();
        let _a = stack.enter(key("a", 2021)).unwrap();
        assert!(stack.enter(key("a", 2020)).is_ok());
    }

    #[test]
    fn test_guard_pops_on_drop_and_collects_dependencies() {
        let stack = EvaluationStack::new();
        {
            let _guard = stack.enter(key("a", 2021)).unwrap();
            assert_eq!(stack.depth(), 1);
        }
        assert_eq!(stack.depth(), 0);

        let guard = stack.enter(key("a", 2021)).unwrap();
        stack.note_dependency(&key("b", 2021));
        stack.note_dependency(&key("b", 2021));
        assert_eq!(guard.finish(), vec![key("b", 2021)]);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_trace_log_keeps_first_origin() {
        let mut log = TraceLog::new();
        log.record(key("a", 2021), Origin::Formula, &[ParamValue::Int(2)], vec![]);
        log.record(key("a", 2021), Origin::Cache, &[], vec![]);
        let period = Period::year(2021).unwrap();
        let step = log.get("a", Some(&period)).unwrap();
        assert_eq!(step.origin, Origin::Formula);
        assert_eq!(step.extra_params.as_slice(), &[ParamValue::Int(2)]);
        assert_eq!(log.len(), 1);
    }
}
