use crate::introspection::SchemaOption;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

/// A row of a table-shaped node configuration.
pub trait TableRow: Clone + Serialize + DeserializeOwned {
    /// Partial update merged into a row by `update_row`.
    type Patch;

    fn key(&self) -> &str;

    /// A new row with sensible defaults. `ordinal` is unique within the table.
    fn blank(key: String, ordinal: usize) -> Self;

    fn apply(&mut self, patch: Self::Patch);

    /// Incomplete rows stay in the table but never reach generated code.
    fn is_complete(&self) -> bool;

    /// Ordinals already consumed by this row, so new rows never collide with it.
    fn used_ordinals(&self) -> Vec<usize> {
        self.key().parse().ok().into_iter().collect()
    }
}

/// One environment variable set by an env-variables node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariableRow {
    #[serde(deserialize_with = "string_or_number")]
    pub key: String,
    /// Exported variable name; required.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    /// Display-only fallback; never emitted.
    #[serde(default)]
    pub default: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVariablePatch {
    pub name: Option<String>,
    pub value: Option<String>,
    pub default: Option<String>,
}

impl EnvVariablePatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl TableRow for EnvVariableRow {
    type Patch = EnvVariablePatch;

    fn key(&self) -> &str {
        &self.key
    }

    fn blank(key: String, ordinal: usize) -> Self {
        Self {
            key,
            name: format!("ENV_{}", ordinal),
            value: String::new(),
            default: String::new(),
        }
    }

    fn apply(&mut self, patch: EnvVariablePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(default) = patch.default {
            self.default = default;
        }
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
    }

    fn used_ordinals(&self) -> Vec<usize> {
        let from_name = self
            .name
            .strip_prefix("ENV_")
            .and_then(|n| n.parse().ok());
        self.key.parse().ok().into_iter().chain(from_name).collect()
    }
}

/// Maps one upstream column onto a target column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMappingRow {
    #[serde(deserialize_with = "string_or_number")]
    pub key: String,
    /// The selected upstream column; `None` until the user picks one.
    #[serde(default)]
    pub input: Option<SchemaOption>,
    #[serde(rename = "value", alias = "outputName", default)]
    pub output_name: String,
    #[serde(rename = "type", alias = "outputType", default)]
    pub output_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMappingPatch {
    pub input: Option<Option<SchemaOption>>,
    pub output_name: Option<String>,
    pub output_type: Option<String>,
}

impl ColumnMappingPatch {
    pub fn input(option: SchemaOption) -> Self {
        Self {
            input: Some(Some(option)),
            ..Self::default()
        }
    }

    pub fn clear_input() -> Self {
        Self {
            input: Some(None),
            ..Self::default()
        }
    }

    pub fn output(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            output_name: Some(name.into()),
            output_type: Some(data_type.into()),
            ..Self::default()
        }
    }
}

impl TableRow for ColumnMappingRow {
    type Patch = ColumnMappingPatch;

    fn key(&self) -> &str {
        &self.key
    }

    fn blank(key: String, ordinal: usize) -> Self {
        Self {
            key,
            input: None,
            output_name: format!("column_{}", ordinal),
            output_type: String::new(),
        }
    }

    fn apply(&mut self, patch: ColumnMappingPatch) {
        if let Some(input) = patch.input {
            self.input = input;
        }
        if let Some(name) = patch.output_name {
            self.output_name = name;
        }
        if let Some(data_type) = patch.output_type {
            self.output_type = data_type;
        }
    }

    fn is_complete(&self) -> bool {
        self.input.is_some() && !self.output_name.trim().is_empty()
    }
}

/// Canvas documents use numeric row keys; accept both forms.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number key, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_row_accepts_numeric_key() {
        let row: EnvVariableRow =
            serde_json::from_value(json!({ "key": 3, "name": "API_KEY", "value": "abc" })).unwrap();
        assert_eq!(row.key, "3");
        assert_eq!(row.default, "");
        assert_eq!(row.used_ordinals(), vec![3]);
    }

    #[test]
    fn test_env_row_completeness() {
        let mut row = EnvVariableRow::blank("0".to_string(), 0);
        assert_eq!(row.name, "ENV_0");
        assert!(row.is_complete());
        row.apply(EnvVariablePatch::name("  "));
        assert!(!row.is_complete());
    }

    #[test]
    fn test_mapping_row_wire_names() {
        let row: ColumnMappingRow = serde_json::from_value(json!({
            "key": 0,
            "input": null,
            "value": "customer_id",
            "type": "int(11)"
        }))
        .unwrap();
        assert_eq!(row.output_name, "customer_id");
        assert!(!row.is_complete());

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["value"], "customer_id");
        assert_eq!(value["type"], "int(11)");
    }

    #[test]
    fn test_mapping_patch_can_clear_input() {
        let mut row = ColumnMappingRow::blank("1".to_string(), 1);
        row.apply(ColumnMappingPatch::input(SchemaOption::named("id", "int64")));
        assert!(row.is_complete());
        row.apply(ColumnMappingPatch::clear_input());
        assert!(row.input.is_none());
    }
}
