use serde::Deserialize;

/// Form state a canvas node carries
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UiNodeData {
    #[serde(default)]
    pub label: Option<String>,
    /// The node's configuration; missing fields fall back to the component defaults
    #[serde(default, alias = "formData", alias = "values")]
    pub config: serde_json::Value,
}

/// Canvas node with ID, component type and data
#[derive(Debug, Deserialize, Clone)]
pub struct UiNode {
    pub id: String,
    #[serde(rename = "type", alias = "nodeType")]
    pub node_type: String,
    #[serde(default)]
    pub data: UiNodeData,
}

/// Canvas edge connecting two node handles
#[derive(Debug, Deserialize, Clone)]
pub struct UiEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    #[serde(default, alias = "sourceHandle")]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(default, alias = "targetHandle")]
    pub target_handle: Option<String>,
}

impl UiEdge {
    /// Identifier used in error messages.
    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}->{}", self.source, self.target))
    }
}

/// Complete canvas document
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UiPipeline {
    #[serde(default)]
    pub nodes: Vec<UiNode>,
    #[serde(default)]
    pub edges: Vec<UiEdge>,
}
