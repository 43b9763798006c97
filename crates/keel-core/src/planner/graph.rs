//! Step dependency graph and execution ordering.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BinaryHeap, HashMap},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{KeelError, Result},
    models::Step,
};

/// Edges from each step to the steps that depend on it.
///
/// Steps with explicit prerequisites get an edge from each prerequisite.
/// Any other step except the first depends on the step right before it in
/// spec order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Step IDs in spec order
    nodes: Vec<String>,
    /// Step ID to the IDs of its dependents
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph for `steps`, whose `after` lists hold resolved step
    /// IDs.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` if an `after` entry names an unknown
    /// step or the explicit dependencies form a cycle.
    pub fn build(steps: &[Step]) -> Result<Self> {
        let mut graph = Self {
            nodes: steps.iter().map(|step| step.id.clone()).collect(),
            edges: steps
                .iter()
                .map(|step| (step.id.clone(), Vec::new()))
                .collect(),
        };

        for (index, step) in steps.iter().enumerate() {
            match &step.after {
                Some(prerequisites) => {
                    for prerequisite in prerequisites {
                        graph.add_edge(prerequisite, &step.id)?;
                    }
                }
                None if index > 0 => {
                    let previous = &steps[index - 1].id;
                    graph.add_edge(previous, &step.id)?;
                }
                None => {}
            }
        }

        graph.execution_order()?;
        Ok(graph)
    }

    fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let dependents = self.edges.get_mut(from).ok_or_else(|| {
            KeelError::validation("after").with_reason(format!("Unknown step '{from}'"))
        })?;
        if !dependents.iter().any(|id| id == to) {
            dependents.push(to.to_string());
        }
        Ok(())
    }

    /// Step IDs in spec order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Steps that depend directly on `id`.
    pub fn dependents(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Steps `id` depends on directly, in spec order.
    pub fn prerequisites(&self, id: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| self.dependents(node).iter().any(|dep| dep == id))
            .map(String::as_str)
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// A topological order of the steps.
    ///
    /// Among steps that are ready at the same time, the one earliest in spec
    /// order goes first, so a plain list runs exactly in sequence.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` naming the steps on a cycle.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let position: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect();

        let mut in_degree = vec![0usize; self.nodes.len()];
        for dependents in self.edges.values() {
            for dependent in dependents {
                if let Some(&index) = position.get(dependent.as_str()) {
                    in_degree[index] += 1;
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| Reverse(index))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(index)) = ready.pop() {
            let id = &self.nodes[index];
            order.push(id.clone());
            for dependent in self.dependents(id) {
                if let Some(&next) = position.get(dependent.as_str()) {
                    in_degree[next] -= 1;
                    if in_degree[next] == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck: Vec<&str> = self
                .nodes
                .iter()
                .zip(&in_degree)
                .filter(|(_, degree)| **degree > 0)
                .map(|(id, _)| id.as_str())
                .collect();
            return Err(KeelError::validation("after").with_reason(format!(
                "Dependency cycle among steps: {}",
                stuck.join(", ")
            )));
        }

        Ok(order)
    }
}
