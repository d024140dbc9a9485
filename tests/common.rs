//! Common test utilities for building pipelines and fake schema backends.
use async_trait::async_trait;
use pipeforge::introspection::IntrospectionRequest;
use pipeforge::prelude::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub type SchemaResult = std::result::Result<Vec<SchemaOption>, IntrospectionError>;

/// The built-in catalog.
#[allow(dead_code)]
pub fn registry() -> ComponentRegistry {
    default_registry().expect("built-in components register cleanly")
}

/// A graph with one env-variables node holding the given `(name, value)` rows.
#[allow(dead_code)]
pub fn env_graph(registry: &ComponentRegistry, rows: &[(&str, &str)]) -> (PipelineGraph, String) {
    let mut graph = PipelineGraph::new();
    let id = graph.add_node(registry, "envVariables").unwrap();
    add_env_rows(&mut graph, &id, rows);
    (graph, id)
}

#[allow(dead_code)]
pub fn add_env_rows(graph: &mut PipelineGraph, node_id: &str, rows: &[(&str, &str)]) {
    let mut table: EditableTable<EnvVariableRow> =
        EditableTable::load(graph, node_id, "variables").unwrap();
    for (name, value) in rows {
        let key = table.add_row(graph).unwrap();
        table
            .update_row(graph, &key, EnvVariablePatch::name(*name).with_value(*value))
            .unwrap();
    }
}

/// source -> filter -> sink, with the nodes created sink first.
///
/// Returns the graph and the node ids in data-flow order.
#[allow(dead_code)]
pub fn reversed_chain(registry: &ComponentRegistry) -> (PipelineGraph, [String; 3]) {
    let mut graph = PipelineGraph::new();
    let sink = graph.add_node(registry, "csvFileOutput").unwrap();
    let filter = graph.add_node(registry, "filterRows").unwrap();
    let source = graph.add_node(registry, "csvFileInput").unwrap();

    graph
        .set_config_field(&source, "filePath", "orders.csv".into())
        .unwrap();
    graph
        .set_config_field(&filter, "condition", "amount > 10".into())
        .unwrap();
    graph
        .set_config_field(&sink, "filePath", "large_orders.csv".into())
        .unwrap();

    graph.link(&filter, &sink).unwrap();
    graph.link(&source, &filter).unwrap();
    (graph, [source, filter, sink])
}

/// A csv source feeding a column-mapping node. Returns the graph and `(source, mapping)`.
#[allow(dead_code)]
pub fn mapping_graph(registry: &ComponentRegistry) -> (PipelineGraph, String, String) {
    let mut graph = PipelineGraph::new();
    let source = graph.add_node(registry, "csvFileInput").unwrap();
    let mapping = graph.add_node(registry, "columnMapping").unwrap();
    graph
        .set_config_field(&source, "filePath", "customers.csv".into())
        .unwrap();
    graph.link(&source, &mapping).unwrap();
    (graph, source, mapping)
}

/// Canvas document as saved by the editor.
#[allow(dead_code)]
pub const CANVAS_JSON: &str = r#"{
    "nodes": [
        { "id": "env", "type": "envVariables", "data": { "config": { "variables": [
            { "key": 0, "name": "API_KEY", "value": "abc123", "default": "" }
        ] } } },
        { "id": "orders", "type": "csvFileInput",
          "data": { "config": { "filePath": "orders.csv", "separator": ";" } } },
        { "id": "customers", "type": "csvFileInput",
          "data": { "config": { "filePath": "customers.csv" } } },
        { "id": "joined", "type": "mergeFrames",
          "data": { "config": { "on": ["customer_id"], "how": "left" } } },
        { "id": "db", "type": "sqlTableOutput", "data": { "config": {
            "dbOptions": {
                "username": "etl", "password": "pw", "host": "db.local",
                "port": 3306, "databaseName": "shop"
            },
            "tableName": "orders_enriched",
            "ifExists": "replace"
        } } }
    ],
    "edges": [
        { "id": "e1", "source": "orders", "sourceHandle": "handle-0",
          "target": "joined", "targetHandle": "handle-0" },
        { "id": "e2", "source": "customers", "sourceHandle": "handle-0",
          "target": "joined", "targetHandle": "handle-1" },
        { "id": "e3", "source": "joined", "sourceHandle": "handle-0",
          "target": "db", "targetHandle": "handle-0" }
    ]
}"#;

/// A schema backend whose answers are released by the test, in any order.
///
/// Calls take the gates in arrival order.
#[allow(dead_code)]
pub struct GatedBackend {
    gates: Mutex<VecDeque<oneshot::Receiver<SchemaResult>>>,
    pub requests: Mutex<Vec<IntrospectionRequest>>,
}

#[allow(dead_code)]
impl GatedBackend {
    pub fn new(calls: usize) -> (Self, Vec<oneshot::Sender<SchemaResult>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..calls).map(|_| oneshot::channel()).unzip();
        (
            Self {
                gates: Mutex::new(receivers),
                requests: Mutex::new(Vec::new()),
            },
            senders,
        )
    }
}

#[async_trait]
impl SchemaBackend for GatedBackend {
    async fn introspect(&self, request: IntrospectionRequest) -> SchemaResult {
        self.requests.lock().unwrap().push(request);
        let gate = self.gates.lock().unwrap().pop_front();
        match gate {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(IntrospectionError::BackendUnreachable("gate dropped".to_string()))
            }),
            None => Err(IntrospectionError::BackendUnreachable(
                "unexpected call".to_string(),
            )),
        }
    }
}

/// A backend that answers every request with the same columns.
#[allow(dead_code)]
pub struct StaticBackend(pub Vec<SchemaOption>);

#[async_trait]
impl SchemaBackend for StaticBackend {
    async fn introspect(&self, _request: IntrospectionRequest) -> SchemaResult {
        Ok(self.0.clone())
    }
}
