use serde::Deserialize;
use serde_json::json;

use super::{IMPORT_PANDAS, component_metadata, parse_config, require_one_of};
use crate::codefmt::{py_str, py_str_list};
use crate::compiler::GenerationContext;
use crate::component::{ComponentDescriptor, Generated};
use crate::error::CompileError;
use crate::graph::NodeConfig;

const JOIN_KINDS: &[&str] = &["inner", "left", "right", "outer", "cross"];

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MergeConfig {
    /// Join columns; empty lets pandas join on the common columns.
    on: Vec<String>,
    how: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            on: Vec::new(),
            how: "inner".to_string(),
        }
    }
}

/// Joins two datasets.
pub struct MergeFrames;

impl ComponentDescriptor for MergeFrames {
    component_metadata!("mergeFrames", "Merge", "Transforms", Transform, "merge");

    fn default_config(&self) -> NodeConfig {
        json!({ "on": [], "how": "inner" })
    }

    fn input_ports(&self) -> Vec<String> {
        vec!["left".to_string(), "right".to_string()]
    }

    fn variable_prefix(&self) -> String {
        "merged".to_string()
    }

    fn provide_imports(&self, _config: &NodeConfig) -> Vec<String> {
        vec![IMPORT_PANDAS.to_string()]
    }

    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError> {
        let config: MergeConfig = parse_config(ctx.node_id(), config)?;
        require_one_of(ctx.node_id(), "how", &config.how, JOIN_KINDS)?;

        let left = ctx.input(0)?.to_string();
        let right = ctx.input(1)?.to_string();
        let out = ctx.output(0)?;

        let on = match config.on.as_slice() {
            [] => String::new(),
            [column] => format!(", on={}", py_str(column)),
            columns => format!(", on={}", py_str_list(columns.iter().map(String::as_str))),
        };
        Ok(Generated::Fragment(format!(
            "{} = pd.merge({}, {}{}, how={})",
            out,
            left,
            right,
            on,
            py_str(&config.how)
        )))
    }
}
