//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the pipeforge crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use pipeforge::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let registry = default_registry()?;
//! let canvas = std::fs::read_to_string("path/to/pipeline.json")?;
//! let graph = UiPipeline::from_json(&canvas)?.into_pipeline(&registry)?;
//!
//! let script = Compiler::new(&registry).compile(&graph)?;
//! script.save("pipeline.bin")?;
//! # Ok(())
//! # }
//! ```

// Registry and compilation
pub use crate::compiler::{CompiledScript, Compiler, GenerationContext};
pub use crate::component::{ComponentDescriptor, ComponentKind, ComponentRegistry, Generated};
pub use crate::components::default_registry;

// Graph model
pub use crate::graph::{NodeConfig, PipelineEdge, PipelineGraph, PipelineNode};
pub use crate::ui::{IntoPipeline, UiPipeline};

// Editable tables
pub use crate::mapping::{
    CellState, ColumnMappingPatch, ColumnMappingRow, EditableTable, EnvVariablePatch,
    EnvVariableRow, TableRow,
};

// Introspection
pub use crate::introspection::{
    ConnectionParams, Introspected, SchemaBackend, SchemaIntrospectionService, SchemaOption,
};

// Configuration and errors
pub use crate::config::Config;
pub use crate::error::{CompileError, GraphError, IntrospectionError, MappingError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
