//! The in-memory node/edge model of a user's pipeline.

use crate::component::ComponentRegistry;
use crate::error::GraphError;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod definition;
mod order;

pub use definition::*;

/// A directed graph of pipeline steps.
///
/// Nodes keep their creation order; that order is the tie-break used when
/// several nodes could be emitted next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineGraph {
    #[serde(default)]
    nodes: Vec<PipelineNode>,
    #[serde(default)]
    edges: Vec<PipelineEdge>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[PipelineEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&PipelineNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Creates a node of the given component type with the descriptor's default
    /// configuration and port layout, and returns its generated id.
    pub fn add_node(
        &mut self,
        registry: &ComponentRegistry,
        component_type: &str,
    ) -> Result<String, GraphError> {
        let descriptor = registry.resolve(component_type)?;
        let id = self.fresh_node_id(descriptor.identity());
        self.nodes.push(PipelineNode {
            id: id.clone(),
            component_type: descriptor.identity().to_string(),
            config: descriptor.default_config(),
            inputs: descriptor.input_ports(),
            outputs: descriptor.output_ports(),
        });
        debug!(node_id = %id, component_type, "add_node: created");
        Ok(id)
    }

    /// Inserts a fully-formed node, e.g. one converted from a canvas document.
    pub fn insert_node(&mut self, node: PipelineNode) -> Result<(), GraphError> {
        if self.contains(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<PipelineNode, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let before = self.edges.len();
        self.edges.retain(|e| e.source != id && e.target != id);
        debug!(
            node_id = %id,
            removed_edges = before - self.edges.len(),
            "remove_node: cascaded"
        );
        Ok(self.nodes.remove(index))
    }

    /// Connects an output port to an input port. An input port accepts a single
    /// edge; connecting it again replaces the previous edge.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<(), GraphError> {
        let source_node = self
            .node(source)
            .ok_or_else(|| GraphError::NodeNotFound(source.to_string()))?;
        if source_node.output_index(source_port).is_none() {
            return Err(GraphError::PortNotFound {
                node_id: source.to_string(),
                direction: "output",
                port: source_port.to_string(),
            });
        }
        let target_node = self
            .node(target)
            .ok_or_else(|| GraphError::NodeNotFound(target.to_string()))?;
        if target_node.input_index(target_port).is_none() {
            return Err(GraphError::PortNotFound {
                node_id: target.to_string(),
                direction: "input",
                port: target_port.to_string(),
            });
        }

        self.edges
            .retain(|e| !(e.target == target && e.target_port == target_port));
        self.edges.push(PipelineEdge {
            source: source.to_string(),
            source_port: source_port.to_string(),
            target: target.to_string(),
            target_port: target_port.to_string(),
        });
        Ok(())
    }

    /// Connects the first output of `source` to the first input of `target`.
    pub fn link(&mut self, source: &str, target: &str) -> Result<(), GraphError> {
        let source_port = self
            .node(source)
            .ok_or_else(|| GraphError::NodeNotFound(source.to_string()))?
            .outputs
            .first()
            .cloned()
            .ok_or_else(|| GraphError::PortNotFound {
                node_id: source.to_string(),
                direction: "output",
                port: "0".to_string(),
            })?;
        let target_port = self
            .node(target)
            .ok_or_else(|| GraphError::NodeNotFound(target.to_string()))?
            .inputs
            .first()
            .cloned()
            .ok_or_else(|| GraphError::PortNotFound {
                node_id: target.to_string(),
                direction: "input",
                port: "0".to_string(),
            })?;
        self.connect(source, &source_port, target, &target_port)
    }

    /// Removes every edge from `source` to `target`, returning how many were dropped.
    pub fn disconnect(&mut self, source: &str, target: &str) -> usize {
        let before = self.edges.len();
        self.edges
            .retain(|e| !(e.source == source && e.target == target));
        before - self.edges.len()
    }

    /// Replaces the whole configuration of a node.
    pub fn set_config(&mut self, id: &str, config: NodeConfig) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.config = config;
        Ok(())
    }

    /// Replaces one top-level field of a node's configuration object.
    pub fn set_config_field(
        &mut self,
        id: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        if !node.config.is_object() {
            node.config = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(object) = node.config.as_object_mut() {
            object.insert(field.to_string(), value);
        }
        Ok(())
    }

    /// Incoming edges of a node, ordered by the target input port.
    pub fn incoming(&self, id: &str) -> Vec<&PipelineEdge> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut edges: Vec<&PipelineEdge> = self.edges.iter().filter(|e| e.target == id).collect();
        edges.sort_by_key(|e| node.input_index(&e.target_port).unwrap_or(usize::MAX));
        edges
    }

    /// Outgoing edges of a node, in insertion order.
    pub fn outgoing(&self, id: &str) -> Vec<&PipelineEdge> {
        self.edges.iter().filter(|e| e.source == id).collect()
    }

    /// Ids of every node `id` transitively depends on, in creation order.
    pub fn ancestors(&self, id: &str) -> Result<Vec<String>, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NodeNotFound(id.to_string()));
        }
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for edge in self.edges.iter().filter(|e| e.target == current) {
                if edge.source != id && seen.insert(edge.source.as_str()) {
                    stack.push(edge.source.as_str());
                }
            }
        }
        Ok(self
            .nodes
            .iter()
            .filter(|n| seen.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect())
    }

    /// The partial pipeline that runs up to, but not including, `id`.
    pub fn upstream_subgraph(&self, id: &str) -> Result<PipelineGraph, GraphError> {
        let keep: AHashSet<String> = self.ancestors(id)?.into_iter().collect();
        Ok(PipelineGraph {
            nodes: self
                .nodes
                .iter()
                .filter(|n| keep.contains(&n.id))
                .cloned()
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| keep.contains(&e.source) && keep.contains(&e.target))
                .cloned()
                .collect(),
        })
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut PipelineNode, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    fn fresh_node_id(&self, identity: &str) -> String {
        (self.nodes.len() + 1..)
            .map(|n| format!("{}-{}", identity, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| identity.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use serde_json::json;

    fn node(id: &str, inputs: &[&str], outputs: &[&str]) -> PipelineNode {
        PipelineNode {
            id: id.to_string(),
            component_type: "test".to_string(),
            config: json!({}),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn chain() -> PipelineGraph {
        let mut graph = PipelineGraph::new();
        graph.insert_node(node("sink", &["in"], &[])).unwrap();
        graph.insert_node(node("transform", &["in"], &["out"])).unwrap();
        graph.insert_node(node("source", &[], &["out"])).unwrap();
        graph.link("source", "transform").unwrap();
        graph.link("transform", "sink").unwrap();
        graph
    }

    #[test]
    fn test_order_follows_edges_not_creation() {
        let graph = chain();
        let order: Vec<&str> = graph
            .topological_order()
            .unwrap()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["source", "transform", "sink"]);
    }

    #[test]
    fn test_independent_nodes_keep_creation_order() {
        let mut graph = PipelineGraph::new();
        for id in ["c", "a", "b"] {
            graph.insert_node(node(id, &[], &[])).unwrap();
        }
        let order: Vec<&str> = graph
            .topological_order()
            .unwrap()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cycle_reports_only_cycle_members() {
        let mut graph = PipelineGraph::new();
        graph.insert_node(node("a", &["in"], &["out"])).unwrap();
        graph.insert_node(node("b", &["in"], &["out"])).unwrap();
        graph.insert_node(node("after", &["in"], &[])).unwrap();
        graph.insert_node(node("c", &["in"], &["out"])).unwrap();
        graph.connect("a", "out", "b", "in").unwrap();
        graph.connect("b", "out", "a", "in").unwrap();
        graph.connect("b", "out", "after", "in").unwrap();

        match graph.topological_order() {
            Err(CompileError::CycleDetected { node_ids }) => {
                assert_eq!(node_ids, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("Expected CycleDetected, got {:?}", other),
        }
        assert!(!graph.is_acyclic());
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let mut graph = chain();
        graph.remove_node("transform").unwrap();
        assert!(graph.edges().is_empty());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_connect_rejects_unknown_port() {
        let mut graph = chain();
        let err = graph.connect("source", "nope", "sink", "in").unwrap_err();
        assert!(matches!(err, GraphError::PortNotFound { direction: "output", .. }));
    }

    #[test]
    fn test_connect_replaces_edge_on_same_input() {
        let mut graph = chain();
        graph.insert_node(node("other", &[], &["out"])).unwrap();
        graph.connect("other", "out", "sink", "in").unwrap();
        let incoming = graph.incoming("sink");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, "other");
    }

    #[test]
    fn test_upstream_subgraph_excludes_target() {
        let graph = chain();
        let partial = graph.upstream_subgraph("sink").unwrap();
        let ids: Vec<&str> = partial.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["transform", "source"]);
        assert_eq!(partial.edges().len(), 1);
    }

    #[test]
    fn test_set_config_field_creates_object() {
        let mut graph = chain();
        graph.set_config("source", serde_json::Value::Null).unwrap();
        graph
            .set_config_field("source", "filePath", json!("data.csv"))
            .unwrap();
        assert_eq!(
            graph.node("source").unwrap().config,
            json!({ "filePath": "data.csv" })
        );
    }
}
