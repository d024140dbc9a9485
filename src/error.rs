use thiserror::Error;

/// Errors raised while registering or resolving component descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A component with identity '{0}' is already registered")]
    DuplicateIdentity(String),

    #[error("No component is registered for node type '{0}'")]
    UnknownComponentType(String),
}

/// Errors raised while editing the in-memory pipeline graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("A node with id '{0}' already exists in the pipeline")]
    DuplicateNode(String),

    #[error("Node '{0}' does not exist in the pipeline")]
    NodeNotFound(String),

    #[error("Node '{node_id}' has no {direction} port '{port}'")]
    PortNotFound {
        node_id: String,
        direction: &'static str,
        port: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors that can occur while compiling a pipeline into a script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("The pipeline contains a cycle involving nodes: {}", node_ids.join(", "))]
    CycleDetected { node_ids: Vec<String> },

    #[error("Node '{node_id}' has an incomplete configuration: {reason}")]
    IncompleteConfiguration { node_id: String, reason: String },

    #[error("Node '{node_id}' has an unregistered component type: '{type_name}'")]
    UnknownComponentType { node_id: String, type_name: String },

    #[error(
        "Node '{missing_node_id}' not found, which is required by a connection \
         to node '{target_node_id}'"
    )]
    NodeNotFound {
        missing_node_id: String,
        target_node_id: String,
    },

    #[error("Node '{node_id}' has an invalid configuration: {message}")]
    InvalidConfiguration { node_id: String, message: String },
}

/// Errors returned by schema introspection calls.
///
/// An empty option list is a valid answer, so every failure to ask is surfaced here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntrospectionError {
    #[error("Schema backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Probe query rejected by the backend: {0}")]
    InvalidQuery(String),

    #[error("Schema request timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed backend response: {0}")]
    Protocol(String),

    #[error("Node '{0}' does not exist in the pipeline")]
    NodeNotFound(String),

    #[error("Upstream pipeline cannot be compiled: {0}")]
    Pipeline(#[from] CompileError),
}

impl IntrospectionError {
    /// Whether the editing surface should offer a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            IntrospectionError::BackendUnreachable(_) => true,
            IntrospectionError::Timeout(_) => true,
            IntrospectionError::InvalidQuery(_) => false,
            IntrospectionError::Protocol(_) => false,
            IntrospectionError::NodeNotFound(_) => false,
            IntrospectionError::Pipeline(_) => false,
        }
    }
}

/// Errors raised by the editable table model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Field '{field}' of node '{node_id}' does not hold a valid row table: {message}")]
    InvalidTable {
        node_id: String,
        field: String,
        message: String,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors that can occur when converting a canvas document into a `PipelineGraph`.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    #[error("Failed to parse pipeline JSON: {0}")]
    JsonParseError(String),

    #[error("Edge '{edge}' references handle '{handle}' which does not exist on node '{node_id}'")]
    UnknownHandle {
        edge: String,
        node_id: String,
        handle: String,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors raised while saving or loading a compiled script artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact encoding failed: {0}")]
    Encode(String),

    #[error("Artifact decoding failed: {0}")]
    Decode(String),
}

/// Errors raised while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
