//! A simulation: one holder per declared variable, over named populations.
use super::config::SimulationConfig;
use super::traceback::{EvaluationStack, FrameGuard, Origin, StepKey, TraceLog};
use crate::analysis::DependencyGraph;
use crate::compute::ComputationError;
use crate::holders::{Array, DatedHolder, Holder};
use crate::periods::{Instant, Period, PeriodCache, PeriodError};
use crate::store::{OutputMode, ParamValue, Registry, VariableId};
use chrono::NaiveDate;
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Owns the holders of one run.
///
/// Evaluation is single-threaded: the type is `Send` but not `Sync`.
/// Independent runs are obtained with `clone()`.
#[derive(Debug)]
pub struct Simulation {
    holders: Vec<Holder>,
    index: Arc<HashMap<String, VariableId>>,
    populations: Arc<BTreeMap<String, usize>>,
    period: Period,
    config: SimulationConfig,
    stack: EvaluationStack,
    trace: RefCell<TraceLog>,
    periods: RefCell<PeriodCache>,
}

impl Simulation {
    /// Creates one holder per variable of `registry`, sized by the population
    /// of its entity.
    pub fn new<I, S>(
        registry: &Registry,
        populations: I,
        period: Period,
        config: SimulationConfig,
    ) -> Result<Self, ComputationError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let populations: BTreeMap<String, usize> =
            populations.into_iter().map(|(entity, count)| (entity.into(), count)).collect();

        let mut holders = Vec::with_capacity(registry.count());
        let mut index = HashMap::with_capacity(registry.count());
        for id in registry.ids() {
            let variable = registry.variable(id);
            let count = *populations.get(&variable.entity).ok_or_else(|| ComputationError::UnknownEntity {
                variable: variable.name.clone(),
                entity: variable.entity.clone(),
            })?;
            let opt_out = config.is_cache_excluded(&variable.name);
            holders.push(Holder::new(Arc::clone(variable), count, registry.formula(id).cloned(), opt_out));
            index.insert(variable.name.clone(), id);
        }

        tracing::info!(variables = holders.len(), entities = populations.len(), %period, "simulation ready");
        Ok(Self {
            holders,
            index: Arc::new(index),
            populations: Arc::new(populations),
            period,
            config,
            stack: EvaluationStack::new(),
            trace: RefCell::new(TraceLog::new()),
            periods: RefCell::new(PeriodCache::new()),
        })
    }

    /// Default period of the run.
    pub fn period(&self) -> &Period { &self.period }
    pub fn config(&self) -> &SimulationConfig { &self.config }

    pub fn population(&self, entity: &str) -> Option<usize> {
        self.populations.get(entity).copied()
    }

    pub fn holder(&self, name: &str) -> Result<&Holder, ComputationError> {
        self.index
            .get(name)
            .map(|id| &self.holders[id.index()])
            .ok_or_else(|| ComputationError::UnknownVariable { name: name.to_string() })
    }

    /// Holders in declaration order.
    pub fn holders(&self) -> impl Iterator<Item = &Holder> {
        self.holders.iter()
    }

    // --- Evaluation ---

    pub fn compute(
        &self,
        name: &str,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<DatedHolder<'_>, ComputationError> {
        self.holder(name)?.compute(self, period, extra_params)
    }

    pub fn calculate(&self, name: &str, period: &Period) -> Result<Array, ComputationError> {
        Ok(self.compute(name, period, &[])?.into_array())
    }

    pub fn calculate_add(&self, name: &str, period: &Period) -> Result<Array, ComputationError> {
        Ok(self.holder(name)?.compute_add(self, period, &[])?.into_array())
    }

    pub fn calculate_divide(&self, name: &str, period: &Period) -> Result<Array, ComputationError> {
        Ok(self.holder(name)?.compute_divide(self, period, &[])?.into_array())
    }

    /// Answers with the rule the variable declares for output periods.
    pub fn calculate_output(&self, name: &str, period: &Period) -> Result<Array, ComputationError> {
        match self.holder(name)?.variable().calculate_output {
            OutputMode::Compute => self.calculate(name, period),
            OutputMode::Add => self.calculate_add(name, period),
            OutputMode::Divide => self.calculate_divide(name, period),
        }
    }

    pub fn set_input(&self, name: &str, period: &Period, array: Vec<f64>) -> Result<(), ComputationError> {
        let holder = self.holder(name)?;
        holder.set_input(period, array)?;
        self.record_step(holder.trace_key(period), Origin::Input, &[], Vec::new());
        Ok(())
    }

    pub fn get_array(
        &self,
        name: &str,
        period: &Period,
        extra_params: &[ParamValue],
    ) -> Result<Option<Array>, ComputationError> {
        Ok(self.holder(name)?.get_array(period, extra_params))
    }

    /// Empties every holder and the trace log.
    pub fn delete_arrays(&self) {
        for holder in &self.holders {
            holder.delete_arrays();
        }
        self.trace.borrow_mut().clear();
    }

    // --- Period memo ---

    pub fn parse_period(&self, value: &str) -> Result<Period, PeriodError> {
        self.periods.borrow_mut().period(value)
    }

    pub fn instant_date(&self, instant: Instant) -> Result<NaiveDate, PeriodError> {
        self.periods.borrow_mut().date(instant)
    }

    // --- Inspection ---

    /// Cache contents of every non-empty holder, keyed by variable name.
    pub fn to_value_json(&self, use_label: bool) -> serde_json::Value {
        let out: serde_json::Map<String, serde_json::Value> = self
            .holders
            .iter()
            .filter(|h| h.memory_usage().arrays > 0)
            .map(|h| (h.name().to_string(), h.to_value_json(use_label)))
            .collect();
        serde_json::Value::Object(out)
    }

    pub fn trace_log(&self) -> Ref<'_, TraceLog> {
        self.trace.borrow()
    }

    /// Indented audit tree of a traced computation.
    pub fn trace_report(&self, name: &str, period: &Period) -> Result<String, ComputationError> {
        crate::display::format_trace(self, name, period)
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::build(self)
    }

    // --- Hooks used by holders ---

    pub(crate) fn enter(&self, key: StepKey) -> Result<FrameGuard<'_>, ComputationError> {
        self.stack.enter(key)
    }

    pub(crate) fn note_dependency(&self, key: &StepKey) {
        if self.config.records_trace() {
            self.stack.note_dependency(key);
        }
    }

    pub(crate) fn record_step(
        &self,
        key: StepKey,
        origin: Origin,
        extra_params: &[ParamValue],
        dependencies: Vec<StepKey>,
    ) {
        if self.config.records_trace() {
            self.trace.borrow_mut().record(key, origin, extra_params, dependencies);
        }
    }
}

impl Clone for Simulation {
    /// Independent holders sharing arrays and formulas; fresh stack and trace.
    fn clone(&self) -> Self {
        Self {
            holders: self.holders.clone(),
            index: Arc::clone(&self.index),
            populations: Arc::clone(&self.populations),
            period: self.period,
            config: self.config.clone(),
            stack: EvaluationStack::new(),
            trace: RefCell::new(TraceLog::new()),
            periods: RefCell::new(self.periods.borrow().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::FnFormula;
    use crate::store::{Granularity, Variable};

    fn year(y: i32) -> Period {
        Period::year(y).unwrap()
    }

    fn registry() -> Registry {
        let mut reg = Registry::new();
        let salary = FnFormula::new(|_, _, _| Ok(vec![100.0, 200.0]));
        reg.add_formula_variable(
            Variable::new("salary", "person", Granularity::Month).with_output(OutputMode::Add),
            salary,
        )
        .unwrap();
        let income = FnFormula::new(|_, _, _| Ok(vec![1200.0, 2400.0]));
        reg.add_formula_variable(
            Variable::new("income", "person", Granularity::Year).with_output(OutputMode::Divide),
            income,
        )
        .unwrap();
        reg.add_variable(Variable::new("rent", "household", Granularity::Month)).unwrap();
        reg
    }

    fn simulation(config: SimulationConfig) -> Simulation {
        Simulation::new(&registry(), [("person", 2), ("household", 1)], year(2021), config).unwrap()
    }

    #[test]
    fn test_holders_are_sized_by_entity() {
        let sim = simulation(SimulationConfig::default());
        assert_eq!(sim.holder("salary").unwrap().count(), 2);
        assert_eq!(sim.holder("rent").unwrap().count(), 1);
        assert_eq!(sim.population("household"), Some(1));
        assert_eq!(sim.holders().count(), 3);
        assert!(matches!(sim.holder("nope"), Err(ComputationError::UnknownVariable { .. })));
    }

    #[test]
    fn test_unknown_entity_is_rejected() {
        let err = Simulation::new(&registry(), [("person", 2)], year(2021), SimulationConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ComputationError::UnknownEntity { variable: "rent".into(), entity: "household".into() }
        );
    }

    #[test]
    fn test_calculate_output_follows_declared_mode() {
        let sim = simulation(SimulationConfig::default());
        assert_eq!(sim.calculate_output("salary", &year(2021)).unwrap().as_slice(), &[1200.0, 2400.0]);
        assert_eq!(sim.calculate_output("income", &Period::month(2021, 4).unwrap()).unwrap().as_slice(), &[100.0, 200.0]);
        assert_eq!(sim.calculate_output("rent", &Period::month(2021, 4).unwrap()).unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn test_clone_keeps_arrays_but_not_the_trace() {
        let sim = simulation(SimulationConfig::traced());
        let march = Period::month(2021, 3).unwrap();
        sim.calculate("salary", &march).unwrap();
        assert_eq!(sim.trace_log().len(), 1);

        let copy = sim.clone();
        assert!(copy.trace_log().is_empty());
        assert_eq!(copy.get_array("salary", &march, &[]).unwrap(), sim.get_array("salary", &march, &[]).unwrap());

        copy.set_input("rent", &march, vec![500.0]).unwrap();
        assert!(sim.get_array("rent", &march, &[]).unwrap().is_none());
    }

    #[test]
    fn test_value_json_lists_filled_holders_only() {
        let sim = simulation(SimulationConfig::default());
        sim.set_input("rent", &Period::month(2021, 1).unwrap(), vec![500.0]).unwrap();
        let json = sim.to_value_json(false);
        assert_eq!(json, serde_json::json!({ "rent": { "2021-01": [500.0] } }));

        sim.delete_arrays();
        assert_eq!(sim.to_value_json(false), serde_json::json!({}));
    }

    #[test]
    fn test_period_memo() {
        let sim = simulation(SimulationConfig::default());
        let parsed = sim.parse_period("2021-03").unwrap();
        assert_eq!(parsed, Period::month(2021, 3).unwrap());
        assert_eq!(sim.parse_period("month:2021-03").unwrap(), parsed);
        assert!(sim.parse_period("2021-13").is_err());
        let date = sim.instant_date(parsed.start()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
    }

    #[test]
    fn test_simulation_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Simulation>();
    }
}
