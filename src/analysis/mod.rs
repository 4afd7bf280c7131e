//! Static analysis of the variable graph.
pub mod topology;

pub use topology::{DependencyGraph, GraphEdge, GraphNode};
