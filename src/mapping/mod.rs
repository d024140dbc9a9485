//! Editable, table-shaped node configuration.
//!
//! An [`EditableTable`] owns the rows of one config field of one node. Every
//! mutation re-serializes the rows and writes them back through a
//! [`ConfigSink`] (normally the [`PipelineGraph`]) before returning, so the
//! compiler always sees the latest edit.

use ahash::AHashMap;
use itertools::Itertools;
use serde_json::Value;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

use crate::error::{GraphError, IntrospectionError, MappingError};
use crate::graph::PipelineGraph;
use crate::introspection::{Introspected, SchemaOption};

mod rows;

pub use rows::{ColumnMappingPatch, ColumnMappingRow, EnvVariablePatch, EnvVariableRow, TableRow};

pub(crate) use rows::string_or_number;

/// Where a table writes its serialized rows.
pub trait ConfigSink {
    fn write_field(&mut self, node_id: &str, field: &str, value: Value) -> Result<(), GraphError>;
}

impl ConfigSink for PipelineGraph {
    fn write_field(&mut self, node_id: &str, field: &str, value: Value) -> Result<(), GraphError> {
        self.set_config_field(node_id, field, value)
    }
}

/// Edit state of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CellState {
    /// Freshly added or loaded; not touched by the user yet.
    #[default]
    Pristine,
    Editing,
    Committed,
}

/// State of the last introspection round for a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IntrospectionStatus {
    #[default]
    Idle,
    Pending,
    Failed { message: String, retryable: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowEntry<R> {
    pub row: R,
    pub state: CellState,
}

#[derive(Debug, Clone)]
pub struct EditableTable<R: TableRow> {
    node_id: String,
    field: String,
    entries: Vec<RowEntry<R>>,
    next_ordinal: usize,
    choices: Vec<SchemaOption>,
    status: IntrospectionStatus,
}

impl<R: TableRow> EditableTable<R> {
    /// An empty table for `field` of `node_id`; nothing is written until the first mutation.
    pub fn new(node_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            field: field.into(),
            entries: Vec::new(),
            next_ordinal: 0,
            choices: Vec::new(),
            status: IntrospectionStatus::Idle,
        }
    }

    /// Seeds the table from the node's current config. A missing or null
    /// field gives an empty table.
    pub fn load(graph: &PipelineGraph, node_id: &str, field: &str) -> Result<Self, MappingError> {
        let node = graph
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

        let rows: Vec<R> = match node.config.get(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                MappingError::InvalidTable {
                    node_id: node_id.to_string(),
                    field: field.to_string(),
                    message: e.to_string(),
                }
            })?,
        };

        let next_ordinal = rows
            .iter()
            .flat_map(|r| r.used_ordinals())
            .filter_map(|ordinal| ordinal.checked_add(1))
            .max()
            .unwrap_or(0);
        debug!(node_id, field, rows = rows.len(), next_ordinal, "load: called");

        let mut table = Self::new(node_id, field);
        table.entries = rows
            .into_iter()
            .map(|row| RowEntry {
                row,
                state: CellState::Pristine,
            })
            .collect();
        table.next_ordinal = next_ordinal;
        Ok(table)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn entries(&self) -> &[RowEntry<R>] {
        &self.entries
    }

    pub fn rows(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().map(|e| &e.row)
    }

    pub fn row(&self, key: &str) -> Option<&R> {
        self.position(key).map(|i| &self.entries[i].row)
    }

    pub fn state(&self, key: &str) -> Option<CellState> {
        self.position(key).map(|i| self.entries[i].state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a blank row under a fresh key and returns the key.
    pub fn add_row(&mut self, sink: &mut impl ConfigSink) -> Result<String, MappingError> {
        let ordinal = self.fresh_ordinal();
        let key = ordinal.to_string();

        self.entries.push(RowEntry {
            row: R::blank(key.clone(), ordinal),
            state: CellState::Pristine,
        });
        debug!(node_id = %self.node_id, %key, "add_row: called");
        self.sync(sink)?;
        Ok(key)
    }

    /// Merges `patch` into the row under `key`. A missing key is logged and
    /// ignored, since the row may have been deleted by an earlier edit.
    pub fn update_row(
        &mut self,
        sink: &mut impl ConfigSink,
        key: &str,
        patch: R::Patch,
    ) -> Result<bool, MappingError> {
        let Some(index) = self.position(key) else {
            warn!(node_id = %self.node_id, key, "update_row: no row with this key");
            return Ok(false);
        };
        let entry = &mut self.entries[index];
        entry.row.apply(patch);
        entry.state = CellState::Committed;
        self.sync(sink)?;
        Ok(true)
    }

    /// Removes the row under `key`; absent keys are a no-op.
    pub fn delete_row(
        &mut self,
        sink: &mut impl ConfigSink,
        key: &str,
    ) -> Result<bool, MappingError> {
        let Some(index) = self.position(key) else {
            return Ok(false);
        };
        self.entries.remove(index);
        debug!(node_id = %self.node_id, key, "delete_row: called");
        self.sync(sink)?;
        Ok(true)
    }

    /// Marks a row as being edited. Config is untouched until the edit is committed.
    pub fn begin_edit(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(index) => {
                self.entries[index].state = CellState::Editing;
                true
            }
            None => false,
        }
    }

    /// Keys of rows that are kept but will not reach generated code.
    pub fn incomplete_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.row.is_complete())
            .map(|e| e.row.key())
            .collect()
    }

    pub fn to_config_value(&self) -> Result<Value, MappingError> {
        let rows: Vec<&R> = self.rows().collect();
        serde_json::to_value(rows).map_err(|e| MappingError::InvalidTable {
            node_id: self.node_id.clone(),
            field: self.field.clone(),
            message: e.to_string(),
        })
    }

    /// Writes the current rows into the node's config.
    pub fn sync(&self, sink: &mut impl ConfigSink) -> Result<(), MappingError> {
        let value = self.to_config_value()?;
        sink.write_field(&self.node_id, &self.field, value)?;
        Ok(())
    }

    /// The upstream options last applied to this table.
    pub fn choices(&self) -> &[SchemaOption] {
        &self.choices
    }

    pub fn status(&self) -> &IntrospectionStatus {
        &self.status
    }

    pub fn mark_pending(&mut self) {
        self.status = IntrospectionStatus::Pending;
    }

    /// Records a failed lookup; rows and choices are left as they were.
    pub fn record_failure(&mut self, error: &IntrospectionError) {
        warn!(node_id = %self.node_id, "introspection failed: {}", error);
        self.status = IntrospectionStatus::Failed {
            message: error.to_string(),
            retryable: error.is_retryable(),
        };
    }

    /// Replaces the selectable upstream options.
    pub fn apply_input_choices(&mut self, options: Vec<SchemaOption>) {
        debug!(node_id = %self.node_id, options = options.len(), "apply_input_choices: called");
        self.choices = options;
        self.status = IntrospectionStatus::Idle;
    }

    /// Applies the outcome of an upstream lookup. Superseded outcomes change
    /// nothing; returns whether new choices were applied.
    pub fn receive_input_choices(
        &mut self,
        outcome: Result<Introspected<Vec<SchemaOption>>, IntrospectionError>,
    ) -> bool {
        match outcome {
            Ok(Introspected::Current(options)) => {
                self.apply_input_choices(options);
                true
            }
            Ok(Introspected::Superseded) => false,
            Err(e) => {
                self.record_failure(&e);
                false
            }
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.row.key() == key)
    }

    /// Next ordinal whose key is free. Wraps instead of overflowing; the table is
    /// finite, so a free key is always found.
    fn fresh_ordinal(&mut self) -> usize {
        let mut ordinal = self.next_ordinal;
        while self.position(&ordinal.to_string()).is_some() {
            ordinal = ordinal.wrapping_add(1);
        }
        self.next_ordinal = ordinal.wrapping_add(1);
        ordinal
    }
}

impl EditableTable<EnvVariableRow> {
    /// Variable names assigned more than once; the last assignment wins at runtime.
    pub fn duplicate_names(&self) -> Vec<&str> {
        self.rows()
            .map(|r| r.name.trim())
            .filter(|n| !n.is_empty())
            .duplicates()
            .collect()
    }
}

impl EditableTable<ColumnMappingRow> {
    /// Resolves the choice whose `value` matches and stores it as the row's input.
    pub fn select_input(
        &mut self,
        sink: &mut impl ConfigSink,
        key: &str,
        value: &str,
    ) -> Result<bool, MappingError> {
        let Some(option) = self.choices.iter().find(|o| o.value == value).cloned() else {
            warn!(node_id = %self.node_id, key, value, "select_input: no such choice");
            return Ok(false);
        };
        self.update_row(sink, key, ColumnMappingPatch::input(option))
    }

    /// Rebuilds the rows from a target table schema: one row per column, in
    /// schema order. A row whose output column already existed keeps its key,
    /// input and edit state.
    pub fn apply_table_schema(
        &mut self,
        sink: &mut impl ConfigSink,
        options: Vec<SchemaOption>,
    ) -> Result<(), MappingError> {
        let mut previous: AHashMap<String, RowEntry<ColumnMappingRow>> = AHashMap::new();
        for entry in self.entries.drain(..) {
            match previous.entry(entry.row.output_name.clone()) {
                Entry::Occupied(_) => warn!(
                    node_id = %self.node_id,
                    key = %entry.row.key,
                    output = %entry.row.output_name,
                    "apply_table_schema: duplicate output column, keeping the first row"
                ),
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
            }
        }

        let mut entries = Vec::with_capacity(options.len());
        let mut fresh = Vec::new();
        for option in options {
            match previous.remove(&option.value) {
                Some(mut entry) => {
                    entry.row.output_type = option.data_type;
                    entries.push(entry);
                }
                None => {
                    fresh.push(entries.len());
                    entries.push(RowEntry {
                        row: ColumnMappingRow {
                            key: String::new(),
                            input: None,
                            output_name: option.value,
                            output_type: option.data_type,
                        },
                        state: CellState::Pristine,
                    });
                }
            }
        }
        self.entries = entries;

        for index in fresh {
            self.entries[index].row.key = self.fresh_ordinal().to_string();
        }

        debug!(
            node_id = %self.node_id,
            rows = self.entries.len(),
            dropped = previous.len(),
            "apply_table_schema: called"
        );
        self.status = IntrospectionStatus::Idle;
        self.sync(sink)
    }

    /// Applies the outcome of a table lookup; see [`Self::receive_input_choices`].
    pub fn receive_table_schema(
        &mut self,
        sink: &mut impl ConfigSink,
        outcome: Result<Introspected<Vec<SchemaOption>>, IntrospectionError>,
    ) -> Result<bool, MappingError> {
        match outcome {
            Ok(Introspected::Current(options)) => {
                self.apply_table_schema(sink, options)?;
                Ok(true)
            }
            Ok(Introspected::Superseded) => Ok(false),
            Err(e) => {
                self.record_failure(&e);
                Ok(false)
            }
        }
    }
}
