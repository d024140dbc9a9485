use serde::{Deserialize, Serialize};

/// Descriptor-defined configuration of a node (variables table, mapping table,
/// connection parameters, ...). The graph never interprets it.
pub type NodeConfig = serde_json::Value;

/// A single step of the pipeline, instantiated from a component descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineNode {
    pub id: String,
    /// Identity of the component descriptor this node was created from.
    #[serde(rename = "type", alias = "componentType")]
    pub component_type: String,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl PipelineNode {
    pub fn input_index(&self, port: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p == port)
    }

    pub fn output_index(&self, port: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p == port)
    }
}

/// A data dependency from one node's output port to another node's input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEdge {
    pub source: String,
    #[serde(alias = "sourcePort")]
    pub source_port: String,
    pub target: String,
    #[serde(alias = "targetPort")]
    pub target_port: String,
}
