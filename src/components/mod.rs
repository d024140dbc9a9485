//! The built-in step catalog.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::codefmt::py_str;
use crate::component::ComponentRegistry;
use crate::error::{CompileError, RegistryError};
use crate::graph::NodeConfig;
use crate::mapping::{ColumnMappingRow, TableRow};

mod column_mapping;
mod csv;
mod env_variables;
mod filter;
mod merge;
mod sql;

pub use column_mapping::ColumnMappingComponent;
pub use csv::{CsvFileInput, CsvFileOutput};
pub use env_variables::EnvVariables;
pub use filter::FilterRows;
pub use merge::MergeFrames;
pub use sql::SqlTableOutput;

pub const IMPORT_OS: &str = "import os";
pub const IMPORT_PANDAS: &str = "import pandas as pd";
pub const IMPORT_SQLALCHEMY: &str = "import sqlalchemy";

/// Expands to the metadata methods of a `ComponentDescriptor` impl.
macro_rules! component_metadata {
    ($identity:expr, $display:expr, $category:expr, $kind:ident, $icon:expr) => {
        fn identity(&self) -> &str {
            $identity
        }
        fn display_name(&self) -> &str {
            $display
        }
        fn category(&self) -> &str {
            $category
        }
        fn kind(&self) -> $crate::component::ComponentKind {
            $crate::component::ComponentKind::$kind
        }
        fn icon(&self) -> &str {
            $icon
        }
    };
}
pub(crate) use component_metadata;

/// A registry holding every built-in component, in catalog order.
pub fn default_registry() -> Result<ComponentRegistry, RegistryError> {
    ComponentRegistry::new()
        .with(Arc::new(EnvVariables))?
        .with(Arc::new(CsvFileInput))?
        .with(Arc::new(FilterRows))?
        .with(Arc::new(ColumnMappingComponent))?
        .with(Arc::new(MergeFrames))?
        .with(Arc::new(CsvFileOutput))?
        .with(Arc::new(SqlTableOutput))
}

/// Reads a node config into the component's typed config.
pub(crate) fn parse_config<T: DeserializeOwned>(
    node_id: &str,
    config: &NodeConfig,
) -> Result<T, CompileError> {
    let value = if config.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        config.clone()
    };
    serde_json::from_value(value).map_err(|e| CompileError::InvalidConfiguration {
        node_id: node_id.to_string(),
        message: e.to_string(),
    })
}

/// Rejects values outside `allowed` with an `InvalidConfiguration`.
pub(crate) fn require_one_of(
    node_id: &str,
    field: &str,
    value: &str,
    allowed: &[&str],
) -> Result<(), CompileError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CompileError::InvalidConfiguration {
            node_id: node_id.to_string(),
            message: format!(
                "'{}' must be one of {}, found '{}'",
                field,
                allowed.join(", "),
                value
            ),
        })
    }
}

/// `.rename(columns={...})[[...]]` for the resolved rows of a mapping table.
///
/// Returns `Ok(None)` for an empty table. A table with rows but none resolved
/// is an `IncompleteConfiguration`: emitting it would select no columns.
pub(crate) fn mapping_suffix(
    node_id: &str,
    rows: &[ColumnMappingRow],
) -> Result<Option<String>, CompileError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let resolved: Vec<&ColumnMappingRow> = rows.iter().filter(|r| r.is_complete()).collect();
    if resolved.is_empty() {
        return Err(CompileError::IncompleteConfiguration {
            node_id: node_id.to_string(),
            reason: format!(
                "none of the {} column mapping rows has a selected input column",
                rows.len()
            ),
        });
    }
    if resolved.len() < rows.len() {
        tracing::warn!(
            node_id,
            excluded = rows.len() - resolved.len(),
            "mapping rows without an input column are left out"
        );
    }

    let mut renames = Vec::with_capacity(resolved.len());
    for row in &resolved {
        let Some(input) = row.input.as_ref() else {
            continue;
        };
        let source = if input.named {
            py_str(&input.value)
        } else {
            // Positional columns are addressed by their integer label
            input
                .value
                .trim()
                .parse::<u64>()
                .map_err(|_| CompileError::InvalidConfiguration {
                    node_id: node_id.to_string(),
                    message: format!(
                        "positional input column '{}' is not a column index",
                        input.value
                    ),
                })?
                .to_string()
        };
        renames.push(format!("{}: {}", source, py_str(&row.output_name)));
    }
    let selected: Vec<String> = resolved.iter().map(|r| py_str(&r.output_name)).collect();

    Ok(Some(format!(
        ".rename(columns={{{}}})[[{}]]",
        renames.join(", "),
        selected.join(", ")
    )))
}
