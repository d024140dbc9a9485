use crate::error::CompileError;
use crate::graph::PipelineNode;
use ahash::AHashSet;

/// Tracks every identifier already used in the script being generated.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    taken: AHashSet<String>,
}

impl NameTable {
    pub fn with_reserved(reserved: &[&str]) -> Self {
        Self {
            taken: reserved.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Allocates `base1`, `base2`, ... picking the first free suffix.
    pub fn allocate(&mut self, base: &str) -> String {
        let name = (1u32..)
            .map(|n| format!("{}{}", base, n))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or_else(|| base.to_string());
        self.taken.insert(name.clone());
        name
    }

    pub fn release(&mut self, name: &str) {
        self.taken.remove(name);
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

/// What feeds one input port of the node being generated.
#[derive(Debug, Clone)]
pub(crate) enum UpstreamRef {
    Unconnected,
    Available { variable: String },
    Unavailable { node_id: String, reason: String },
}

/// The compile-time view a descriptor gets while generating one node.
///
/// It exposes the identifiers produced by direct upstream nodes and hands out
/// fresh, script-unique names. Names allocated for a node that ends up skipped
/// are released again.
pub struct GenerationContext<'a> {
    node: &'a PipelineNode,
    names: &'a mut NameTable,
    upstream: Vec<UpstreamRef>,
    prefix: String,
    outputs: Vec<Option<String>>,
    allocated: Vec<String>,
}

impl<'a> GenerationContext<'a> {
    pub(crate) fn new(
        node: &'a PipelineNode,
        names: &'a mut NameTable,
        upstream: Vec<UpstreamRef>,
        prefix: String,
    ) -> Self {
        let outputs = vec![None; node.outputs.len()];
        Self {
            node,
            names,
            upstream,
            prefix,
            outputs,
            allocated: Vec::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node.id
    }

    pub fn input_count(&self) -> usize {
        self.upstream.len()
    }

    /// The identifier holding the dataset connected to input port `index`.
    pub fn input(&self, index: usize) -> Result<&str, CompileError> {
        match self.upstream.get(index) {
            Some(UpstreamRef::Available { variable }) => Ok(variable.as_str()),
            Some(UpstreamRef::Unavailable { node_id, reason }) => {
                Err(CompileError::IncompleteConfiguration {
                    node_id: node_id.clone(),
                    reason: format!("{} (required by node '{}')", reason, self.node.id),
                })
            }
            Some(UpstreamRef::Unconnected) => Err(CompileError::IncompleteConfiguration {
                node_id: self.node.id.clone(),
                reason: format!(
                    "input port '{}' is not connected",
                    self.node.inputs.get(index).map(String::as_str).unwrap_or("?")
                ),
            }),
            None => Err(CompileError::InvalidConfiguration {
                node_id: self.node.id.clone(),
                message: format!("input port #{} does not exist", index),
            }),
        }
    }

    /// All connected inputs, in port order.
    pub fn inputs(&self) -> Result<Vec<&str>, CompileError> {
        (0..self.upstream.len()).map(|i| self.input(i)).collect()
    }

    /// The identifier this node publishes on output port `index`, allocated on
    /// first use.
    pub fn output(&mut self, index: usize) -> Result<String, CompileError> {
        let slot = self
            .outputs
            .get(index)
            .ok_or_else(|| CompileError::InvalidConfiguration {
                node_id: self.node.id.clone(),
                message: format!("output port #{} does not exist", index),
            })?;
        if let Some(name) = slot {
            return Ok(name.clone());
        }
        let name = self.names.allocate(&self.prefix);
        self.allocated.push(name.clone());
        self.outputs[index] = Some(name.clone());
        Ok(name)
    }

    /// A script-unique identifier for node-local temporaries.
    pub fn fresh_name(&mut self, base: &str) -> String {
        let name = self.names.allocate(base);
        self.allocated.push(name.clone());
        name
    }

    pub fn is_allocated(&self, name: &str) -> bool {
        self.names.is_taken(name)
    }

    pub(crate) fn finish(self) -> Vec<Option<String>> {
        self.outputs
    }

    pub(crate) fn rollback(self) {
        for name in &self.allocated {
            self.names.release(name);
        }
    }
}
