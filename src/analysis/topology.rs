//! Static dependency graph of a simulation's variables.
use crate::compute::ComputationError;
use crate::simulation::Simulation;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

/// Node payload, in the shape graph front-ends expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    /// Entity key.
    pub group: String,
    pub label: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Edges point from a dependency to the variable whose formula uses it.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, ()>,
    by_name: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Formulas whose validity window excludes the simulation period are
    /// not expanded.
    pub fn build(simulation: &Simulation) -> Self {
        let mut dg = Self::default();
        for holder in simulation.holders() {
            let variable = holder.variable();
            let idx = dg.graph.add_node(GraphNode {
                id: variable.name.clone(),
                group: variable.entity.clone(),
                label: variable.name.clone(),
                title: variable.label.clone(),
            });
            dg.by_name.insert(variable.name.clone(), idx);
        }

        let period = simulation.period();
        for holder in simulation.holders() {
            let Some(formula) = holder.formula() else { continue };
            if !holder.variable().in_window(period) {
                continue;
            }
            let consumer = dg.by_name[holder.name()];
            for dependency in formula.dependencies() {
                match dg.by_name.get(dependency) {
                    Some(&source) => {
                        dg.graph.update_edge(source, consumer, ());
                    }
                    None => tracing::warn!(variable = %holder.name(), %dependency, "undeclared dependency"),
                }
            }
        }
        dg
    }

    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    /// Direct dependencies of `name`.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.by_name.get(name) else { return Vec::new() };
        let mut deps: Vec<&str> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].id.as_str())
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Variables in evaluation order (dependencies first), or the offending
    /// cycle.
    pub fn check_acyclic(&self) -> Result<Vec<String>, ComputationError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| self.graph[n].id.clone()).collect()),
            Err(_) => {
                let cycle = tarjan_scc(&self.graph)
                    .into_iter()
                    .find(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
                    .map(|scc| {
                        let mut names: Vec<String> = scc.iter().map(|&n| self.graph[n].id.clone()).collect();
                        names.sort();
                        names
                    })
                    .unwrap_or_default();
                Err(ComputationError::CircularDependency { cycle })
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .map(|e| GraphEdge { from: self.graph[e.source()].id.clone(), to: self.graph[e.target()].id.clone() })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "nodes": self.nodes().collect::<Vec<_>>(),
            "edges": self.edges(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::FnFormula;
    use crate::periods::{Instant, Period};
    use crate::simulation::SimulationConfig;
    use crate::store::{Granularity, Registry, Variable};

    fn formula(deps: &[&str]) -> FnFormula {
        FnFormula::new(|_, _, _| Ok(vec![0.0])).with_dependencies(deps.iter().copied())
    }

    fn simulation(reg: &Registry) -> Simulation {
        Simulation::new(reg, [("person", 1)], Period::year(2021).unwrap(), SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_diamond_orders_dependencies_first() {
        // Shape: a -> b, a -> c, b + c -> d
        let mut reg = Registry::new();
        reg.add_variable(Variable::new("a", "person", Granularity::Year)).unwrap();
        reg.add_formula_variable(Variable::new("b", "person", Granularity::Year), formula(&["a"])).unwrap();
        reg.add_formula_variable(Variable::new("c", "person", Granularity::Year), formula(&["a"])).unwrap();
        reg.add_formula_variable(Variable::new("d", "person", Granularity::Year), formula(&["b", "c"])).unwrap();

        let graph = simulation(&reg).dependency_graph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.dependencies_of("d"), vec!["b", "c"]);

        let order = graph.check_acyclic().unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn test_static_cycle_is_reported() {
        let mut reg = Registry::new();
        reg.add_formula_variable(Variable::new("a", "person", Granularity::Year), formula(&["b"])).unwrap();
        reg.add_formula_variable(Variable::new("b", "person", Granularity::Year), formula(&["a"])).unwrap();

        match simulation(&reg).dependency_graph().check_acyclic() {
            Err(ComputationError::CircularDependency { cycle }) => assert_eq!(cycle, vec!["a", "b"]),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_formulas_outside_their_window_are_not_expanded() {
        let mut reg = Registry::new();
        reg.add_variable(Variable::new("a", "person", Granularity::Year)).unwrap();
        let expired = Variable::new("old", "person", Granularity::Year)
            .with_window(None, Some(Instant::new(2000, 12, 31).unwrap()))
            .with_label("Repealed benefit");
        reg.add_formula_variable(expired, formula(&["a"])).unwrap();

        let graph = simulation(&reg).dependency_graph();
        assert_eq!(graph.edge_count(), 0);
        let json = graph.to_json();
        assert_eq!(json["nodes"][1]["title"], "Repealed benefit");
        assert_eq!(json["nodes"][1]["group"], "person");
    }
}
