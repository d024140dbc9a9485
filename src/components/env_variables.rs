use itertools::Itertools;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{IMPORT_OS, component_metadata, parse_config};
use crate::codefmt::py_str;
use crate::compiler::GenerationContext;
use crate::component::{ComponentDescriptor, Generated};
use crate::error::CompileError;
use crate::graph::NodeConfig;
use crate::mapping::{EnvVariableRow, TableRow};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvVariablesConfig {
    variables: Vec<EnvVariableRow>,
}

/// Exports rows of `NAME = value` into the script's process environment.
///
/// Rows without a name or without a value are left out; `default` is only
/// shown in the editor. Duplicate names are emitted in row order, so the
/// last one wins when the script runs.
pub struct EnvVariables;

impl ComponentDescriptor for EnvVariables {
    component_metadata!("envVariables", "Environment Variables", "Settings", Settings, "key");

    fn default_config(&self) -> NodeConfig {
        json!({ "variables": [] })
    }

    fn variable_prefix(&self) -> String {
        "env".to_string()
    }

    fn provide_imports(&self, _config: &NodeConfig) -> Vec<String> {
        vec![IMPORT_OS.to_string()]
    }

    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError> {
        let config: EnvVariablesConfig = parse_config(ctx.node_id(), config)?;

        let assigned: Vec<&EnvVariableRow> = config
            .variables
            .iter()
            .filter(|row| row.is_complete() && !row.value.is_empty())
            .collect();

        for name in assigned.iter().map(|row| row.name.trim()).duplicates() {
            warn!(node_id = %ctx.node_id(), name, "environment variable assigned more than once");
        }

        if assigned.is_empty() {
            return Ok(Generated::Skipped {
                reason: "no environment variable has both a name and a value".to_string(),
            });
        }

        let code = assigned
            .iter()
            .map(|row| format!("os.environ[{}] = {}", py_str(row.name.trim()), py_str(&row.value)))
            .join("\n");
        Ok(Generated::Fragment(code))
    }
}
