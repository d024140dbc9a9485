//! # Pipeforge - Pipeline Compilation Engine
//!
//! **Pipeforge** turns visually assembled data-processing pipelines into a single
//! executable script. Each step kind is a component descriptor that knows its
//! defaults, the imports it needs, and the code fragment it emits; the compiler
//! orders the steps by their data dependencies and assembles the fragments into
//! one program with deduplicated imports and collision-free variable names.
//!
//! ## Core Workflow
//!
//! 1.  **Build a Registry**: Start from `components::default_registry()` or register your own `ComponentDescriptor`s.
//! 2.  **Build the Graph**: Create nodes and edges on a `PipelineGraph`, or convert a canvas document with the `IntoPipeline` trait.
//! 3.  **Edit Configuration**: Table-shaped configuration (environment variables, column mappings) is edited through an `EditableTable`, which writes every change back into the graph.
//! 4.  **Introspect**: The `SchemaIntrospectionService` asks a backend which columns flow into a node, discarding answers that a newer request has superseded.
//! 5.  **Compile**: `Compiler::builder(&registry).build().compile(&graph)` produces a `CompiledScript`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipeforge::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let registry = default_registry()?;
//!     let mut graph = PipelineGraph::new();
//!
//!     // Nodes are created with their component's default config and ports
//!     let env = graph.add_node(&registry, "envVariables")?;
//!     let source = graph.add_node(&registry, "csvFileInput")?;
//!     let sink = graph.add_node(&registry, "csvFileOutput")?;
//!     graph.set_config_field(&source, "filePath", "orders.csv".into())?;
//!     graph.set_config_field(&sink, "filePath", "out.csv".into())?;
//!     graph.link(&source, &sink)?;
//!
//!     // Table-shaped config goes through the editable model
//!     let mut variables: EditableTable<EnvVariableRow> =
//!         EditableTable::load(&graph, &env, "variables")?;
//!     let key = variables.add_row(&mut graph)?;
//!     variables.update_row(
//!         &mut graph,
//!         &key,
//!         EnvVariablePatch::name("API_KEY").with_value("abc123"),
//!     )?;
//!
//!     let script = Compiler::builder(&registry)
//!         .with_header("generated by pipeforge")
//!         .build()
//!         .compile(&graph)?;
//!     println!("{}", script.render());
//!     Ok(())
//! }
//! ```

pub mod codefmt;
pub mod compiler;
pub mod component;
pub mod components;
pub mod config;
pub mod error;
pub mod graph;
pub mod introspection;
pub mod mapping;
pub mod prelude;
pub mod ui;
