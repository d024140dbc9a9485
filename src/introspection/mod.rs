//! Asynchronous schema lookups for the editing surface.
//!
//! Every request is stamped with a ticket when it is prepared. A response is
//! applied only if its ticket is still the latest one for the same node and
//! purpose; anything older resolves to [`Introspected::Superseded`], whatever
//! order the backend answers in.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

mod backend;
mod tokens;
mod types;

pub use backend::{HttpSchemaBackend, SchemaBackend};
pub use tokens::{RequestPurpose, RequestTokens, TargetKey, Ticket};
pub use types::{
    BackendFailure, ConnectionParams, FailureKind, IntrospectionRequest, IntrospectionResponse,
    SchemaOption, describe_query,
};

#[cfg(test)]
pub(crate) use backend::mock;

use crate::compiler::Compiler;
use crate::component::ComponentRegistry;
use crate::config::IntrospectionSettings;
use crate::error::IntrospectionError;
use crate::graph::PipelineGraph;

/// Outcome of an introspection call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Introspected<T> {
    /// The response belongs to the latest request for its target.
    Current(T),
    /// A newer request for the same target was issued; the response was dropped.
    Superseded,
}

impl<T> Introspected<T> {
    pub fn into_current(self) -> Option<T> {
        match self {
            Introspected::Current(value) => Some(value),
            Introspected::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Introspected::Superseded)
    }
}

/// A request snapshot plus the ticket it was issued under.
///
/// Preparing is synchronous and copies what it needs out of the graph, so the
/// graph can keep being edited while the request is in flight.
#[derive(Debug, Clone)]
pub struct PendingIntrospection {
    ticket: Ticket,
    request: IntrospectionRequest,
}

impl PendingIntrospection {
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn request(&self) -> &IntrospectionRequest {
        &self.request
    }
}

pub struct SchemaIntrospectionService {
    backend: Arc<dyn SchemaBackend>,
    tokens: RequestTokens,
    timeout: Duration,
    registry: Option<Arc<ComponentRegistry>>,
}

impl SchemaIntrospectionService {
    pub fn new(backend: Arc<dyn SchemaBackend>) -> Self {
        Self {
            backend,
            tokens: RequestTokens::new(),
            timeout: IntrospectionSettings::default().timeout(),
            registry: None,
        }
    }

    /// Service talking to the HTTP backend named in the settings.
    pub fn from_settings(settings: &IntrospectionSettings) -> Result<Self, IntrospectionError> {
        let backend = HttpSchemaBackend::from_settings(settings)?;
        Ok(Self::new(Arc::new(backend)).with_timeout(settings.timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// With a registry, upstream requests also carry the compiled partial script.
    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn tokens(&self) -> &RequestTokens {
        &self.tokens
    }

    /// Issues a ticket for `node_id`, then snapshots the partial pipeline feeding it.
    ///
    /// The ticket is issued even when the snapshot fails, so a failed re-invoke still
    /// supersedes any earlier request in flight for the same node.
    pub fn prepare_upstream(
        &self,
        graph: &PipelineGraph,
        node_id: &str,
    ) -> Result<PendingIntrospection, IntrospectionError> {
        let ticket = self
            .tokens
            .issue(TargetKey::new(node_id, RequestPurpose::UpstreamColumns));
        let pipeline = graph
            .upstream_subgraph(node_id)
            .map_err(|_| IntrospectionError::NodeNotFound(node_id.to_string()))?;

        let (script, preview_variable) = match &self.registry {
            Some(registry) => {
                let compiled = Compiler::new(registry).compile(&pipeline)?;
                let preview_variable = graph.incoming(node_id).first().and_then(|edge| {
                    let port = graph.node(&edge.source)?.output_index(&edge.source_port)?;
                    compiled
                        .fragment(&edge.source)?
                        .outputs
                        .get(port)
                        .cloned()
                        .flatten()
                });
                (Some(compiled.render()), preview_variable)
            }
            None => (None, None),
        };

        debug!(
            node_id,
            token = ticket.token(),
            upstream_nodes = pipeline.len(),
            "prepare_upstream: issued"
        );
        Ok(PendingIntrospection {
            ticket,
            request: IntrospectionRequest::Upstream {
                pipeline,
                target_node_id: node_id.to_string(),
                script,
                preview_variable,
            },
        })
    }

    /// Issues a ticket for describing `table_name` on behalf of `node_id`.
    /// Without a probe query the table is described with `DESCRIBE`.
    pub fn prepare_table(
        &self,
        node_id: &str,
        connection: &ConnectionParams,
        table_name: &str,
        probe_query: Option<&str>,
    ) -> PendingIntrospection {
        let probe_query = match probe_query {
            Some(query) if !query.trim().is_empty() => query.to_string(),
            _ => describe_query(table_name),
        };
        let ticket = self
            .tokens
            .issue(TargetKey::new(node_id, RequestPurpose::TableColumns));
        debug!(node_id, table_name, token = ticket.token(), "prepare_table: issued");
        PendingIntrospection {
            ticket,
            request: IntrospectionRequest::Table {
                connection: connection.clone(),
                table_name: table_name.to_string(),
                probe_query,
            },
        }
    }

    /// Sends a prepared request and filters out stale answers.
    pub async fn dispatch(
        &self,
        pending: PendingIntrospection,
    ) -> Result<Introspected<Vec<SchemaOption>>, IntrospectionError> {
        let PendingIntrospection { ticket, request } = pending;
        let timeout_ms = self.timeout.as_millis() as u64;

        let call = tokio::time::timeout(self.timeout, self.backend.introspect(request));
        let outcome = match call.await {
            Ok(result) => result,
            Err(_) => Err(IntrospectionError::Timeout(timeout_ms)),
        };

        if !self.tokens.is_current(&ticket) {
            debug!(
                node_id = %ticket.key().node_id,
                token = ticket.token(),
                failed = outcome.is_err(),
                "dispatch: discarding superseded response"
            );
            return Ok(Introspected::Superseded);
        }

        match outcome {
            Ok(options) => {
                info!(
                    node_id = %ticket.key().node_id,
                    options = options.len(),
                    "dispatch: schema received"
                );
                Ok(Introspected::Current(options))
            }
            Err(e) => {
                warn!(
                    node_id = %ticket.key().node_id,
                    retryable = e.is_retryable(),
                    "dispatch: introspection failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    /// Columns produced by the nodes upstream of `node_id`.
    pub async fn retrieve_upstream_columns(
        &self,
        graph: &PipelineGraph,
        node_id: &str,
    ) -> Result<Introspected<Vec<SchemaOption>>, IntrospectionError> {
        let pending = self.prepare_upstream(graph, node_id)?;
        self.dispatch(pending).await
    }

    /// Columns of an external table.
    pub async fn retrieve_table_columns(
        &self,
        node_id: &str,
        connection: &ConnectionParams,
        table_name: &str,
        probe_query: Option<&str>,
    ) -> Result<Introspected<Vec<SchemaOption>>, IntrospectionError> {
        let pending = self.prepare_table(node_id, connection, table_name, probe_query);
        self.dispatch(pending).await
    }

    /// Supersedes every in-flight request for a node.
    pub fn forget_node(&self, node_id: &str) {
        let dropped = self.tokens.invalidate_node(node_id);
        debug!(node_id, dropped, "forget_node: called");
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{FixedBackend, GatedBackend};
    use super::*;
    use crate::graph::PipelineNode;
    use serde_json::json;

    fn node(id: &str, component_type: &str, inputs: &[&str]) -> PipelineNode {
        serde_json::from_value(json!({
            "id": id,
            "type": component_type,
            "config": {},
            "inputs": inputs,
            "outputs": ["out"]
        }))
        .unwrap()
    }

    fn two_node_graph() -> PipelineGraph {
        let mut graph = PipelineGraph::new();
        graph.insert_node(node("src", "csvFileInput", &[])).unwrap();
        graph.insert_node(node("map", "columnMapping", &["in"])).unwrap();
        graph.link("src", "map").unwrap();
        graph
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let (backend, mut gates) = GatedBackend::new(2);
        let service = SchemaIntrospectionService::new(Arc::new(backend));
        let graph = two_node_graph();

        let first = service.prepare_upstream(&graph, "map").unwrap();
        let second = service.prepare_upstream(&graph, "map").unwrap();
        let gate_second = gates.pop().unwrap();
        let gate_first = gates.pop().unwrap();

        let release = async {
            gate_second
                .send(Ok(vec![SchemaOption::named("new_col", "object")]))
                .unwrap();
            tokio::task::yield_now().await;
            gate_first
                .send(Ok(vec![SchemaOption::named("old_col", "object")]))
                .unwrap();
        };

        let (r1, r2, _) = tokio::join!(service.dispatch(first), service.dispatch(second), release);
        assert_eq!(r1, Ok(Introspected::Superseded));
        assert_eq!(
            r2,
            Ok(Introspected::Current(vec![SchemaOption::named("new_col", "object")]))
        );
    }

    #[tokio::test]
    async fn test_stale_failure_is_also_superseded() {
        let (backend, mut gates) = GatedBackend::new(2);
        let service = SchemaIntrospectionService::new(Arc::new(backend));
        let connection = ConnectionParams::default();

        let first = service.prepare_table("sql", &connection, "orders", None);
        let second = service.prepare_table("sql", &connection, "customers", None);
        let gate_second = gates.pop().unwrap();
        let gate_first = gates.pop().unwrap();
        gate_first
            .send(Err(IntrospectionError::InvalidQuery("no such table".to_string())))
            .unwrap();
        gate_second.send(Ok(vec![])).unwrap();

        assert_eq!(service.dispatch(first).await, Ok(Introspected::Superseded));
        assert_eq!(service.dispatch(second).await, Ok(Introspected::Current(vec![])));
    }

    #[tokio::test]
    async fn test_default_probe_query() {
        let service =
            SchemaIntrospectionService::new(Arc::new(FixedBackend(Ok(Vec::new()))));
        let connection = ConnectionParams::default();
        let pending = service.prepare_table("sql", &connection, "orders", Some("  "));
        match pending.request() {
            IntrospectionRequest::Table { probe_query, .. } => {
                assert_eq!(probe_query, "DESCRIBE orders")
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_current_failure_is_surfaced() {
        let service = SchemaIntrospectionService::new(Arc::new(FixedBackend(Err(
            IntrospectionError::BackendUnreachable("connection refused".to_string()),
        ))));
        let result = service.retrieve_upstream_columns(&two_node_graph(), "map").await;
        let err = result.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let service =
            SchemaIntrospectionService::new(Arc::new(FixedBackend(Ok(Vec::new()))));
        let result = service.retrieve_upstream_columns(&two_node_graph(), "ghost").await;
        assert_eq!(result, Err(IntrospectionError::NodeNotFound("ghost".to_string())));
    }

    #[tokio::test]
    async fn test_upstream_request_carries_only_ancestors() {
        let (backend, mut gates) = GatedBackend::new(1);
        let backend = Arc::new(backend);
        let service = SchemaIntrospectionService::new(backend.clone());
        gates.pop().unwrap().send(Ok(vec![])).unwrap();

        service
            .retrieve_upstream_columns(&two_node_graph(), "map")
            .await
            .unwrap();
        let requests = backend.requests.lock().unwrap();
        match &requests[0] {
            IntrospectionRequest::Upstream { pipeline, target_node_id, script, .. } => {
                assert_eq!(target_node_id, "map");
                assert_eq!(pipeline.len(), 1);
                assert!(pipeline.contains("src"));
                assert!(script.is_none());
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let (backend, _gates) = GatedBackend::new(1);
        let service = SchemaIntrospectionService::new(Arc::new(backend))
            .with_timeout(Duration::from_millis(250));
        let result = service.retrieve_upstream_columns(&two_node_graph(), "map").await;
        assert_eq!(result, Err(IntrospectionError::Timeout(250)));
    }

    #[tokio::test]
    async fn test_forget_node_supersedes_in_flight() {
        let (backend, mut gates) = GatedBackend::new(1);
        let service = SchemaIntrospectionService::new(Arc::new(backend));
        let pending = service.prepare_upstream(&two_node_graph(), "map").unwrap();
        service.forget_node("map");
        gates.pop().unwrap().send(Ok(vec![])).unwrap();
        assert!(service.dispatch(pending).await.unwrap().is_superseded());
    }
}
