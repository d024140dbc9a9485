use serde::Deserialize;
use serde_json::json;

use super::{IMPORT_PANDAS, component_metadata, parse_config};
use crate::codefmt::py_str;
use crate::compiler::GenerationContext;
use crate::component::{ComponentDescriptor, Generated};
use crate::error::CompileError;
use crate::graph::NodeConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CsvFileConfig {
    file_path: String,
    separator: String,
    /// Whether the first line holds column names. Input only.
    header: bool,
}

impl Default for CsvFileConfig {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            separator: ",".to_string(),
            header: true,
        }
    }
}

fn csv_default_config() -> NodeConfig {
    json!({ "filePath": "", "separator": ",", "header": true })
}

fn separator_arg(config: &CsvFileConfig) -> String {
    if config.separator.is_empty() {
        py_str(",")
    } else {
        py_str(&config.separator)
    }
}

pub struct CsvFileInput;

impl ComponentDescriptor for CsvFileInput {
    component_metadata!("csvFileInput", "CSV File Input", "Inputs", Input, "file-csv");

    fn default_config(&self) -> NodeConfig {
        csv_default_config()
    }

    fn variable_prefix(&self) -> String {
        "source".to_string()
    }

    fn provide_imports(&self, _config: &NodeConfig) -> Vec<String> {
        vec![IMPORT_PANDAS.to_string()]
    }

    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError> {
        let config: CsvFileConfig = parse_config(ctx.node_id(), config)?;
        if config.file_path.trim().is_empty() {
            return Ok(Generated::Skipped {
                reason: "no file path selected".to_string(),
            });
        }

        let out = ctx.output(0)?;
        let header = if config.header { "" } else { ", header=None" };
        Ok(Generated::Fragment(format!(
            "{} = pd.read_csv({}, sep={}{})",
            out,
            py_str(&config.file_path),
            separator_arg(&config),
            header
        )))
    }
}

pub struct CsvFileOutput;

impl ComponentDescriptor for CsvFileOutput {
    component_metadata!("csvFileOutput", "CSV File Output", "Outputs", Output, "file-export");

    fn default_config(&self) -> NodeConfig {
        csv_default_config()
    }

    fn provide_imports(&self, _config: &NodeConfig) -> Vec<String> {
        vec![IMPORT_PANDAS.to_string()]
    }

    fn generate_code(
        &self,
        config: &NodeConfig,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<Generated, CompileError> {
        let config: CsvFileConfig = parse_config(ctx.node_id(), config)?;
        if config.file_path.trim().is_empty() {
            return Ok(Generated::Skipped {
                reason: "no output file path".to_string(),
            });
        }

        let frame = ctx.input(0)?;
        Ok(Generated::Fragment(format!(
            "{}.to_csv({}, sep={}, index=False)",
            frame,
            py_str(&config.file_path),
            separator_arg(&config)
        )))
    }
}
