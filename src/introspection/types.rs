use crate::error::IntrospectionError;
use crate::graph::PipelineGraph;
use serde::{Deserialize, Serialize};

/// One column/field reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaOption {
    pub label: String,
    /// Stable identifier of the column (its name, or its position when not `named`).
    pub value: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    /// `false` for positional columns (e.g. a CSV read without a header row).
    #[serde(default = "default_named")]
    pub named: bool,
}

fn default_named() -> bool {
    true
}

impl SchemaOption {
    pub fn named(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            value: name,
            data_type: data_type.into(),
            named: true,
        }
    }

    pub fn positional(index: usize, data_type: impl Into<String>) -> Self {
        Self {
            label: index.to_string(),
            value: index.to_string(),
            data_type: data_type.into(),
            named: false,
        }
    }
}

/// Connection parameters of an external SQL database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionParams {
    pub username: String,
    pub password: String,
    pub host: String,
    #[serde(deserialize_with = "crate::mapping::string_or_number")]
    pub port: String,
    pub database_name: String,
}

impl ConnectionParams {
    /// SQLAlchemy connection URL.
    pub fn url(&self) -> String {
        format!(
            "mysql+pymysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.database_name.trim().is_empty()
    }
}

/// Probe query used to describe a table when the caller supplies none.
pub fn describe_query(table_name: &str) -> String {
    format!("DESCRIBE {}", table_name)
}

/// A request sent to the schema backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntrospectionRequest {
    /// Run the pipeline up to (not including) `target_node_id` and report the
    /// columns flowing into it.
    #[serde(rename_all = "camelCase")]
    Upstream {
        pipeline: PipelineGraph,
        target_node_id: String,
        /// Script for `pipeline`, when a registry was available to compile it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        script: Option<String>,
        /// Identifier in `script` holding the data feeding the target node.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preview_variable: Option<String>,
    },
    /// Describe an arbitrary external table.
    #[serde(rename_all = "camelCase")]
    Table {
        connection: ConnectionParams,
        table_name: String,
        probe_query: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Unreachable,
    InvalidQuery,
    Timeout,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFailure {
    pub kind: FailureKind,
    #[serde(default)]
    pub message: String,
}

/// The backend's answer to an `IntrospectionRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum IntrospectionResponse {
    Ok {
        #[serde(default)]
        options: Vec<SchemaOption>,
    },
    Error {
        error: BackendFailure,
    },
}

impl IntrospectionResponse {
    pub fn into_result(self, timeout_ms: u64) -> Result<Vec<SchemaOption>, IntrospectionError> {
        match self {
            IntrospectionResponse::Ok { options } => Ok(options),
            IntrospectionResponse::Error { error } => Err(match error.kind {
                FailureKind::Unreachable => IntrospectionError::BackendUnreachable(error.message),
                FailureKind::InvalidQuery => IntrospectionError::InvalidQuery(error.message),
                FailureKind::Timeout => IntrospectionError::Timeout(timeout_ms),
                FailureKind::Other => IntrospectionError::Protocol(error.message),
            }),
        }
    }
}
