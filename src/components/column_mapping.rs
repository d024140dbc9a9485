use serde::Deserialize;
use serde_json::json;

use super::{IMPORT_PANDAS, component_metadata, mapping_suffix, parse_config};
use crate::compiler::GenerationContext;
use crate::component::{ComponentDescriptor, Generated};
use crate::error::CompileError;
use crate::graph::NodeConfig;
use crate::mapping::ColumnMappingRow;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ColumnMappingConfig {
    mapping: Vec<ColumnMappingRow>,
}

/// Renames and selects upstream columns according to a mapping table.
pub struct ColumnMappingComponent;

impl ComponentDescriptor for ColumnMappingComponent {
    component_metadata!("columnMapping", "Column Mapping", "Transforms", Transform, "columns");

    fn default_config(&self) -> NodeConfig {
        json!({ "mapping": [] })
    }

    fn variable_prefix(&self) -> String {
        "mapped".to_string()
    }

    fn provide_imports(&self, _config: &NodeConfig) -> Vec<String> {
        vec![IMPORT_PANDAS.to_string()]
    }

    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError> {
        let config: ColumnMappingConfig = parse_config(ctx.node_id(), config)?;
        let Some(suffix) = mapping_suffix(ctx.node_id(), &config.mapping)? else {
            return Ok(Generated::Skipped {
                reason: "the mapping table is empty".to_string(),
            });
        };

        let frame = ctx.input(0)?.to_string();
        let out = ctx.output(0)?;
        Ok(Generated::Fragment(format!("{} = {}{}", out, frame, suffix)))
    }
}
