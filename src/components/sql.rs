use serde::Deserialize;
use serde_json::json;

use super::{
    IMPORT_PANDAS, IMPORT_SQLALCHEMY, component_metadata, mapping_suffix, parse_config,
    require_one_of,
};
use crate::codefmt::py_str;
use crate::compiler::GenerationContext;
use crate::component::{ComponentDescriptor, Generated};
use crate::error::CompileError;
use crate::graph::NodeConfig;
use crate::introspection::ConnectionParams;
use crate::mapping::ColumnMappingRow;

const IF_EXISTS: &[&str] = &["fail", "replace", "append"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SqlTableConfig {
    db_options: ConnectionParams,
    table_name: String,
    if_exists: String,
    mapping: Vec<ColumnMappingRow>,
}

impl Default for SqlTableConfig {
    fn default() -> Self {
        Self {
            db_options: ConnectionParams::default(),
            table_name: String::new(),
            if_exists: "append".to_string(),
            mapping: Vec::new(),
        }
    }
}

/// Writes a dataset into a SQL table, optionally reshaped by a mapping onto
/// the table's columns.
pub struct SqlTableOutput;

impl ComponentDescriptor for SqlTableOutput {
    component_metadata!("sqlTableOutput", "SQL Table Output", "Outputs", Output, "database");

    fn default_config(&self) -> NodeConfig {
        json!({
            "dbOptions": {
                "username": "",
                "password": "",
                "host": "",
                "port": "3306",
                "databaseName": ""
            },
            "tableName": "",
            "ifExists": "append",
            "mapping": []
        })
    }

    fn provide_imports(&self, _config: &NodeConfig) -> Vec<String> {
        vec![IMPORT_PANDAS.to_string(), IMPORT_SQLALCHEMY.to_string()]
    }

    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError> {
        let config: SqlTableConfig = parse_config(ctx.node_id(), config)?;
        if !config.db_options.is_complete() {
            return Ok(Generated::Skipped {
                reason: "database connection is not configured".to_string(),
            });
        }
        if config.table_name.trim().is_empty() {
            return Ok(Generated::Skipped {
                reason: "no target table".to_string(),
            });
        }
        require_one_of(ctx.node_id(), "ifExists", &config.if_exists, IF_EXISTS)?;

        let suffix = mapping_suffix(ctx.node_id(), &config.mapping)?.unwrap_or_default();
        let frame = ctx.input(0)?.to_string();
        let engine = ctx.fresh_name("engine");

        Ok(Generated::Fragment(format!(
            "{engine} = sqlalchemy.create_engine({url})\n\
             {frame}{suffix}.to_sql(name={table}, con={engine}, \
             if_exists={if_exists}, index=False)",
            engine = engine,
            url = py_str(&config.db_options.url()),
            frame = frame,
            suffix = suffix,
            table = py_str(config.table_name.trim()),
            if_exists = py_str(&config.if_exists),
        )))
    }
}
