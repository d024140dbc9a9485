//! Conversion from the canvas document format into a `PipelineGraph`.

use serde_json::Value;
use tracing::debug;

use crate::component::ComponentRegistry;
use crate::error::ConversionError;
use crate::graph::{PipelineGraph, PipelineNode};

mod types;

pub use types::*;

/// A trait for external documents that can be turned into a `PipelineGraph`.
///
/// Implement it on your own canvas or storage format to feed it to the compiler.
pub trait IntoPipeline {
    fn into_pipeline(self, registry: &ComponentRegistry) -> Result<PipelineGraph, ConversionError>;
}

impl UiPipeline {
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        serde_json::from_str(json).map_err(|e| ConversionError::JsonParseError(e.to_string()))
    }
}

impl IntoPipeline for UiPipeline {
    fn into_pipeline(self, registry: &ComponentRegistry) -> Result<PipelineGraph, ConversionError> {
        let mut graph = PipelineGraph::new();

        for node in self.nodes {
            let descriptor = registry
                .resolve(&node.node_type)
                .map_err(crate::error::GraphError::from)?;
            let config = merge_defaults(descriptor.default_config(), node.data.config);
            graph.insert_node(PipelineNode {
                id: node.id,
                component_type: descriptor.identity().to_string(),
                config,
                inputs: descriptor.input_ports(),
                outputs: descriptor.output_ports(),
            })?;
        }

        for edge in &self.edges {
            let source_handle = edge.source_handle.as_deref();
            let source_port = resolve_handle(&graph, &edge.source, source_handle, false)
                .map_err(|handle| ConversionError::UnknownHandle {
                    edge: edge.label(),
                    node_id: edge.source.clone(),
                    handle,
                })?;
            let target_handle = edge.target_handle.as_deref();
            let target_port = resolve_handle(&graph, &edge.target, target_handle, true)
                .map_err(|handle| ConversionError::UnknownHandle {
                    edge: edge.label(),
                    node_id: edge.target.clone(),
                    handle,
                })?;
            graph.connect(&edge.source, &source_port, &edge.target, &target_port)?;
        }

        debug!(
            nodes = graph.len(),
            edges = graph.edges().len(),
            "into_pipeline: converted canvas document"
        );
        Ok(graph)
    }
}

/// Overlays the saved config onto the component's default config.
fn merge_defaults(defaults: Value, saved: Value) -> Value {
    match (defaults, saved) {
        (defaults, Value::Null) => defaults,
        (Value::Object(mut base), Value::Object(overlay)) => {
            base.extend(overlay);
            Value::Object(base)
        }
        (_, saved) => saved,
    }
}

/// Maps a canvas handle onto a port name: an exact port name, a bare index
/// (`"1"`), or a suffixed index (`"handle-1"`, `"input-1"`). A missing handle
/// means the first port. An unknown node resolves to its own handle so that
/// `connect` reports the missing node.
fn resolve_handle(
    graph: &PipelineGraph,
    node_id: &str,
    handle: Option<&str>,
    input: bool,
) -> Result<String, String> {
    let Some(node) = graph.node(node_id) else {
        return Ok(handle.unwrap_or_default().to_string());
    };
    let ports = if input { &node.inputs } else { &node.outputs };

    let handle = handle.map(str::trim).unwrap_or_default();
    if handle.is_empty() {
        return ports.first().cloned().ok_or_else(|| "<none>".to_string());
    }
    if ports.iter().any(|p| p == handle) {
        return Ok(handle.to_string());
    }
    handle
        .rsplit('-')
        .next()
        .and_then(|index| index.parse::<usize>().ok())
        .and_then(|index| ports.get(index).cloned())
        .ok_or_else(|| handle.to_string())
}
