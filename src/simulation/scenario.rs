//! Parallel what-if runs over independent clones.
use super::simulation::Simulation;
use rayon::prelude::*;

/// Runs `run` once per variant, each on its own clone of `base`.
///
/// Clones are taken up front on the calling thread; the variants then run on
/// the rayon pool. Results come back in variant order and `base` is never
/// written to.
pub fn run_variants<V, F, R>(base: &Simulation, variants: &[V], run: F) -> Vec<R>
where
    V: Sync,
    F: Fn(Simulation, &V) -> R + Sync + Send,
    R: Send,
{
    let jobs: Vec<(Simulation, &V)> = variants.iter().map(|variant| (base.clone(), variant)).collect();
    tracing::debug!(variants = jobs.len(), "running simulation variants");
    jobs.into_par_iter().map(|(simulation, variant)| run(simulation, variant)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::FnFormula;
    use crate::periods::Period;
    use crate::simulation::SimulationConfig;
    use crate::store::{Granularity, Registry, Variable};

    #[test]
    fn test_variants_run_on_isolated_clones() {
        let mut reg = Registry::new();
        reg.add_variable(Variable::new("rate", "person", Granularity::Year)).unwrap();
        let tax = FnFormula::new(|sim, period, _| {
            Ok(sim.calculate("rate", period)?.iter().map(|r| r * 100.0).collect())
        });
        reg.add_formula_variable(Variable::new("tax", "person", Granularity::Year), tax).unwrap();
        let period = Period::year(2021).unwrap();
        let base = Simulation::new(&reg, [("person", 2)], period, SimulationConfig::default()).unwrap();

        let rates = [0.1, 0.2, 0.3];
        let results = run_variants(&base, &rates, |sim, &rate| {
            sim.set_input("rate", &period, vec![rate; 2]).unwrap();
            sim.calculate("tax", &period).unwrap()[0]
        });

        assert_eq!(results.len(), 3);
        for (result, rate) in results.iter().zip(rates.iter()) {
            assert!((result - rate * 100.0).abs() < 1e-9);
        }
        assert!(base.get_array("rate", &period, &[]).unwrap().is_none());
        assert!(base.get_array("tax", &period, &[]).unwrap().is_none());
    }
}
