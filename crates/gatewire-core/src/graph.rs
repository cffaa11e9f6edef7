//! Dependency graph over a finished stack, using `petgraph`.
//!
//! Rebuilds the declaration graph from each declaration's references and
//! resolves the order the engine creates resources in, plus the reverse
//! order used for teardown.

use crate::error::{Result, StackError};
use crate::model::Stack;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Build the graph of every declaration in `stack`
    pub fn from_stack(stack: &Stack) -> Result<Self> {
        let mut graph = Self::new();
        for declaration in &stack.declarations {
            graph.add_resource(declaration.logical_id());
        }
        for declaration in &stack.declarations {
            for reference in declaration.references() {
                graph.add_dependency(declaration.logical_id(), reference)?;
            }
        }
        Ok(graph)
    }

    pub fn add_resource(&mut self, logical_id: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(logical_id) {
            return index;
        }
        let index = self.graph.add_node(logical_id.to_string());
        self.nodes.insert(logical_id.to_string(), index);
        index
    }

    /// Record that `dependent` takes parameters from `dependency`.
    ///
    /// The edge points from `dependency` to `dependent` so that a
    /// topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let to = self.index_of(dependent, dependent)?;
        let from = self.index_of(dependency, dependent)?;
        self.graph.add_edge(from, to, ());
        Ok(())
    }

    fn index_of(&self, logical_id: &str, referrer: &str) -> Result<NodeIndex> {
        self.nodes
            .get(logical_id)
            .copied()
            .ok_or_else(|| StackError::UnresolvedReference {
                resource: referrer.to_string(),
                reference: logical_id.to_string(),
            })
    }

    /// Creation order: every resource after everything it depends on
    pub fn deploy_order(&self) -> Result<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => {
                let id = self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .unwrap_or_default();
                Err(StackError::CircularDependency(format!(
                    "cycle through '{}'",
                    id
                )))
            }
        }
    }

    /// Deletion order: dependents before their dependencies
    pub fn teardown_order(&self) -> Result<Vec<String>> {
        let mut order = self.deploy_order()?;
        order.reverse();
        Ok(order)
    }

    /// Logical ids `logical_id` directly depends on
    pub fn dependencies_of(&self, logical_id: &str) -> Vec<String> {
        let Some(&index) = self.nodes.get(logical_id) else {
            return Vec::new();
        };
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(index, petgraph::Direction::Incoming)
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();
        deps.sort();
        deps
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
