//! Turns a `PipelineGraph` into a single script.

use crate::codefmt::RESERVED_NAMES;
use crate::component::{ComponentRegistry, Generated};
use crate::error::{CompileError, GraphError};
use crate::graph::PipelineGraph;
use ahash::AHashMap;
use tracing::{debug, info, warn};

mod context;
mod imports;
mod script;

pub use context::{GenerationContext, NameTable};
pub use imports::ImportSet;
pub use script::{CompiledScript, NodeFragment, SkippedNode};

use context::UpstreamRef;

/// What the generator remembers about a node once it has been visited.
enum NodeOutcome {
    Emitted(Vec<Option<String>>),
    Skipped(String),
}

/// Compiles pipelines against a component registry.
///
/// `compile` is deterministic and read-only: the same graph and the same
/// descriptors always give byte-identical output, and neither is mutated.
pub struct Compiler<'r> {
    registry: &'r ComponentRegistry,
    header: Option<String>,
}

pub struct CompilerBuilder<'r> {
    registry: &'r ComponentRegistry,
    header: Option<String>,
}

impl<'r> CompilerBuilder<'r> {
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            header: None,
        }
    }

    /// Text rendered as a comment block at the top of the script.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_config(mut self, config: &crate::config::CompilerSettings) -> Self {
        self.header = config.header.clone();
        self
    }

    pub fn build(self) -> Compiler<'r> {
        Compiler {
            registry: self.registry,
            header: self.header,
        }
    }
}

impl<'r> Compiler<'r> {
    pub fn builder(registry: &'r ComponentRegistry) -> CompilerBuilder<'r> {
        CompilerBuilder::new(registry)
    }

    pub fn new(registry: &'r ComponentRegistry) -> Self {
        CompilerBuilder::new(registry).build()
    }

    pub fn compile(&self, graph: &PipelineGraph) -> Result<CompiledScript, CompileError> {
        info!(
            nodes = graph.len(),
            edges = graph.edges().len(),
            "compile: starting"
        );

        // Phase 1: ordering (also rejects cycles)
        let order = graph.topological_order()?;

        let mut names = NameTable::with_reserved(RESERVED_NAMES);
        let mut imports = ImportSet::new();
        let mut outcomes: AHashMap<&str, NodeOutcome> = AHashMap::new();
        let mut fragments = Vec::new();
        let mut skipped = Vec::new();

        // Phase 2: per-node generation
        for node in order {
            let descriptor = self.registry.resolve(&node.component_type).map_err(|_| {
                CompileError::UnknownComponentType {
                    node_id: node.id.clone(),
                    type_name: node.component_type.clone(),
                }
            })?;

            let upstream = Self::upstream_refs(graph, &node.id, &node.inputs, &outcomes);
            let mut ctx =
                GenerationContext::new(node, &mut names, upstream, descriptor.variable_prefix());

            match descriptor.generate_code(&node.config, &mut ctx)? {
                Generated::Fragment(code) => {
                    let outputs = ctx.finish();
                    imports.extend(descriptor.provide_imports(&node.config));
                    debug!(node_id = %node.id, bytes = code.len(), "compile: emitted fragment");
                    fragments.push(NodeFragment {
                        node_id: node.id.clone(),
                        component: node.component_type.clone(),
                        code: code.trim_end().to_string(),
                        outputs: outputs.clone(),
                    });
                    outcomes.insert(node.id.as_str(), NodeOutcome::Emitted(outputs));
                }
                Generated::Skipped { reason } => {
                    ctx.rollback();
                    warn!(node_id = %node.id, %reason, "compile: skipping incomplete node");
                    skipped.push(SkippedNode {
                        node_id: node.id.clone(),
                        reason: reason.clone(),
                    });
                    outcomes.insert(node.id.as_str(), NodeOutcome::Skipped(reason));
                }
            }
        }

        info!(
            fragments = fragments.len(),
            imports = imports.len(),
            skipped = skipped.len(),
            "compile: complete"
        );

        Ok(CompiledScript {
            header: self.header.clone(),
            imports: imports.into_vec(),
            fragments,
            skipped,
        })
    }

    /// Compiles only the nodes `node_id` depends on; used to preview the data
    /// flowing into a node.
    pub fn compile_until(
        &self,
        graph: &PipelineGraph,
        node_id: &str,
    ) -> Result<CompiledScript, CompileError> {
        let partial = graph.upstream_subgraph(node_id).map_err(|e| match e {
            GraphError::NodeNotFound(id) => CompileError::NodeNotFound {
                missing_node_id: id,
                target_node_id: node_id.to_string(),
            },
            other => CompileError::InvalidConfiguration {
                node_id: node_id.to_string(),
                message: other.to_string(),
            },
        })?;
        self.compile(&partial)
    }

    fn upstream_refs(
        graph: &PipelineGraph,
        node_id: &str,
        inputs: &[String],
        outcomes: &AHashMap<&str, NodeOutcome>,
    ) -> Vec<UpstreamRef> {
        let incoming = graph.incoming(node_id);
        inputs
            .iter()
            .map(|port| {
                let Some(edge) = incoming.iter().find(|e| &e.target_port == port) else {
                    return UpstreamRef::Unconnected;
                };
                match outcomes.get(edge.source.as_str()) {
                    Some(NodeOutcome::Emitted(outputs)) => {
                        let variable = graph
                            .node(&edge.source)
                            .and_then(|n| n.output_index(&edge.source_port))
                            .and_then(|i| outputs.get(i).cloned().flatten());
                        match variable {
                            Some(variable) => UpstreamRef::Available { variable },
                            None => UpstreamRef::Unavailable {
                                node_id: edge.source.clone(),
                                reason: format!(
                                    "produced no value on output port '{}'",
                                    edge.source_port
                                ),
                            },
                        }
                    }
                    Some(NodeOutcome::Skipped(reason)) => UpstreamRef::Unavailable {
                        node_id: edge.source.clone(),
                        reason: reason.clone(),
                    },
                    // Unreachable for a topologically ordered walk
                    None => UpstreamRef::Unavailable {
                        node_id: edge.source.clone(),
                        reason: "was not generated before its dependents".to_string(),
                    },
                }
            })
            .collect()
    }
}
