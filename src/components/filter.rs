use serde::Deserialize;
use serde_json::json;

use super::{IMPORT_PANDAS, component_metadata, parse_config};
use crate::codefmt::py_str;
use crate::compiler::GenerationContext;
use crate::component::{ComponentDescriptor, Generated};
use crate::error::CompileError;
use crate::graph::NodeConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilterConfig {
    /// A pandas `DataFrame.query` expression.
    condition: String,
}

pub struct FilterRows;

impl ComponentDescriptor for FilterRows {
    component_metadata!("filterRows", "Filter Rows", "Transforms", Transform, "filter");

    fn default_config(&self) -> NodeConfig {
        json!({ "condition": "" })
    }

    fn variable_prefix(&self) -> String {
        "filtered".to_string()
    }

    fn provide_imports(&self, _config: &NodeConfig) -> Vec<String> {
        vec![IMPORT_PANDAS.to_string()]
    }

    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError> {
        let config: FilterConfig = parse_config(ctx.node_id(), config)?;
        let condition = config.condition.trim();
        if condition.is_empty() {
            return Ok(Generated::Skipped {
                reason: "no filter condition".to_string(),
            });
        }

        let frame = ctx.input(0)?.to_string();
        let out = ctx.output(0)?;
        Ok(Generated::Fragment(format!(
            "{} = {}.query({})",
            out,
            frame,
            py_str(condition)
        )))
    }
}
