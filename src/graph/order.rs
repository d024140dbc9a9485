use super::{PipelineGraph, PipelineNode};
use crate::error::CompileError;
use ahash::{AHashMap, AHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

impl PipelineGraph {
    /// Orders the nodes so that every edge points forward.
    ///
    /// Ties between nodes that are ready at the same time are broken by creation
    /// order (position in `nodes()`), so identical graphs always yield the same order.
    pub fn topological_order(&self) -> Result<Vec<&PipelineNode>, CompileError> {
        let position: AHashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];

        for edge in &self.edges {
            let source = *position.get(edge.source.as_str()).ok_or_else(|| {
                CompileError::NodeNotFound {
                    missing_node_id: edge.source.clone(),
                    target_node_id: edge.target.clone(),
                }
            })?;
            let target = *position.get(edge.target.as_str()).ok_or_else(|| {
                CompileError::NodeNotFound {
                    missing_node_id: edge.target.clone(),
                    target_node_id: edge.target.clone(),
                }
            })?;
            successors[source].push(target);
            in_degree[target] += 1;
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);
            for &next in &successors[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != self.nodes.len() {
            let placed: AHashSet<usize> = order.iter().copied().collect();
            let remaining: Vec<usize> = (0..self.nodes.len())
                .filter(|i| !placed.contains(i))
                .collect();
            let node_ids = cycle_members(&remaining, &successors)
                .into_iter()
                .map(|i| self.nodes[i].id.clone())
                .collect();
            return Err(CompileError::CycleDetected { node_ids });
        }

        Ok(order.into_iter().map(|i| &self.nodes[i]).collect())
    }

    /// Returns `true` when the edge set forms a directed acyclic graph.
    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_ok()
    }
}

/// Keeps only the unplaced nodes that can reach themselves, dropping nodes that
/// merely sit downstream of a cycle.
fn cycle_members(remaining: &[usize], successors: &[Vec<usize>]) -> Vec<usize> {
    let pool: AHashSet<usize> = remaining.iter().copied().collect();
    remaining
        .iter()
        .copied()
        .filter(|&start| reaches(start, start, &pool, successors))
        .collect()
}

fn reaches(from: usize, goal: usize, pool: &AHashSet<usize>, successors: &[Vec<usize>]) -> bool {
    let mut seen = AHashSet::new();
    let mut stack: Vec<usize> = successors[from].clone();
    while let Some(current) = stack.pop() {
        if current == goal {
            return true;
        }
        if !pool.contains(&current) || !seen.insert(current) {
            continue;
        }
        stack.extend(successors[current].iter().copied());
    }
    false
}
