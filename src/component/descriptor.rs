use crate::compiler::GenerationContext;
use crate::error::CompileError;
use crate::graph::NodeConfig;
use serde::{Deserialize, Serialize};

/// Broad family a component belongs to; decides its default port layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Reads data from outside the pipeline.
    Input,
    /// Derives a new dataset from one or more upstream datasets.
    Transform,
    /// Writes data out of the pipeline.
    Output,
    /// Affects the script environment without producing data.
    Settings,
}

/// What a descriptor produced for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// The node's code fragment.
    Fragment(String),
    /// The node's required configuration is missing; nothing is emitted for it.
    Skipped { reason: String },
}

/// Defines the contract for one step kind: its metadata, its defaults, and the
/// imports and code it contributes to a compiled script.
///
/// All type-specific generation logic lives behind `provide_imports` and
/// `generate_code`; nothing else in the crate switches on a node's type.
pub trait ComponentDescriptor: Send + Sync {
    fn identity(&self) -> &str;
    fn display_name(&self) -> &str;
    fn category(&self) -> &str;
    fn kind(&self) -> ComponentKind;

    fn icon(&self) -> &str {
        ""
    }

    /// Configuration assigned to a freshly created node.
    fn default_config(&self) -> NodeConfig {
        serde_json::Value::Object(serde_json::Map::new())
    }

    fn input_ports(&self) -> Vec<String> {
        match self.kind() {
            ComponentKind::Transform | ComponentKind::Output => vec!["in".to_string()],
            ComponentKind::Input | ComponentKind::Settings => Vec::new(),
        }
    }

    fn output_ports(&self) -> Vec<String> {
        match self.kind() {
            ComponentKind::Input | ComponentKind::Transform => vec!["out".to_string()],
            ComponentKind::Output | ComponentKind::Settings => Vec::new(),
        }
    }

    /// Base name for the variables allocated to this node's outputs.
    fn variable_prefix(&self) -> String {
        crate::codefmt::snake_case(self.identity())
    }

    /// Import statements this node needs. Must be a pure function of `config`.
    fn provide_imports(&self, config: &NodeConfig) -> Vec<String>;

    /// Emits the node's code fragment. Must be a pure function of `config` and `ctx`.
    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError>;
}
