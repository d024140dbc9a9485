use clap::{Parser, Subcommand};
use pipeforge::config::Config;
use pipeforge::introspection::{
    ConnectionParams, Introspected, SchemaIntrospectionService, SchemaOption,
};
use pipeforge::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Compile visual data pipelines into executable scripts
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML config file (defaults to ./.pipeforge.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a saved canvas document into a script
    Compile {
        /// Path to the pipeline JSON file
        pipeline: PathBuf,
        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also save the compiled artifact (bincode)
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
    /// Ask the schema backend which columns flow into a node
    Columns {
        /// Path to the pipeline JSON file
        pipeline: PathBuf,
        /// Id of the node whose input columns are listed
        node_id: String,
    },
    /// Describe the columns of an external SQL table
    Table {
        /// Table to describe
        table: String,
        #[arg(long)]
        host: String,
        #[arg(long, default_value = "3306")]
        port: String,
        #[arg(short, long, default_value = "root")]
        user: String,
        #[arg(short, long, default_value = "")]
        password: String,
        #[arg(short, long)]
        database: String,
        /// Probe query; defaults to DESCRIBE <table>
        #[arg(short, long)]
        query: Option<String>,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load configuration: {}", e)));

    match cli.command {
        Command::Compile {
            pipeline,
            output,
            artifact,
        } => run_compile(&config, &pipeline, output.as_deref(), artifact.as_deref()),
        Command::Columns { pipeline, node_id } => run_columns(&config, &pipeline, &node_id).await,
        Command::Table {
            table,
            host,
            port,
            user,
            password,
            database,
            query,
        } => {
            let connection = ConnectionParams {
                username: user,
                password,
                host,
                port,
                database_name: database,
            };
            run_table(&config, &connection, &table, query.as_deref()).await
        }
    }
}

fn load_pipeline(registry: &ComponentRegistry, path: &Path) -> PipelineGraph {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read pipeline file '{}': {}", path.display(), e))
    });
    UiPipeline::from_json(&json)
        .and_then(|canvas| canvas.into_pipeline(registry))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to convert pipeline: {}", e)))
}

fn default_catalog() -> ComponentRegistry {
    default_registry()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to build component registry: {}", e)))
}

fn run_compile(config: &Config, pipeline: &Path, output: Option<&Path>, artifact: Option<&Path>) {
    let registry = default_catalog();
    let graph = load_pipeline(&registry, pipeline);

    let start = Instant::now();
    let script = Compiler::builder(&registry)
        .with_config(&config.compiler)
        .build()
        .compile(&graph)
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
    info!(
        fragments = script.fragments.len(),
        elapsed = ?start.elapsed(),
        "Compiled pipeline"
    );
    for skipped in &script.skipped {
        eprintln!("Skipped node '{}': {}", skipped.node_id, skipped.reason);
    }

    if let Some(path) = artifact {
        script
            .save(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to save artifact: {}", e)));
        info!("Saved compiled artifact to {}", path.display());
    }

    let text = script.render();
    match output {
        Some(path) => fs::write(path, text).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to write script '{}': {}", path.display(), e))
        }),
        None => print!("{}", text),
    }
}

fn build_service(
    config: &Config,
    registry: Option<ComponentRegistry>,
) -> SchemaIntrospectionService {
    let service = SchemaIntrospectionService::from_settings(&config.introspection)
        .unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to create introspection client: {}", e))
        });
    match registry {
        Some(registry) => service.with_registry(Arc::new(registry)),
        None => service,
    }
}

fn print_options(
    outcome: std::result::Result<Introspected<Vec<SchemaOption>>, IntrospectionError>,
) {
    match outcome {
        Ok(Introspected::Current(options)) if options.is_empty() => println!("(no columns)"),
        Ok(Introspected::Current(options)) => {
            for option in options {
                let kind = if option.named { "" } else { " (positional)" };
                println!("{:<32} {}{}", option.label, option.data_type, kind);
            }
        }
        Ok(Introspected::Superseded) => println!("(superseded)"),
        Err(e) if e.is_retryable() => exit_with_error(&format!("{} (retry later)", e)),
        Err(e) => exit_with_error(&e.to_string()),
    }
}

async fn run_columns(config: &Config, pipeline: &Path, node_id: &str) {
    let registry = default_catalog();
    let graph = load_pipeline(&registry, pipeline);
    let service = build_service(config, Some(registry));
    print_options(service.retrieve_upstream_columns(&graph, node_id).await);
}

async fn run_table(
    config: &Config,
    connection: &ConnectionParams,
    table: &str,
    query: Option<&str>,
) {
    let service = build_service(config, None);
    print_options(service.retrieve_table_columns(table, connection, table, query).await);
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
