use crate::error::ArtifactError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The code contributed by one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFragment {
    pub node_id: String,
    pub component: String,
    pub code: String,
    /// Identifiers published on each output port, in port order.
    pub outputs: Vec<Option<String>>,
}

/// A node that produced no code because its configuration is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedNode {
    pub node_id: String,
    pub reason: String,
}

/// The result of compiling a pipeline: a deduplicated import block followed by
/// one fragment per node in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledScript {
    pub header: Option<String>,
    pub imports: Vec<String>,
    pub fragments: Vec<NodeFragment>,
    pub skipped: Vec<SkippedNode>,
}

impl CompiledScript {
    pub fn imports_block(&self) -> String {
        self.imports.join("\n")
    }

    /// Fragments joined by a blank line.
    pub fn body_block(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.code.as_str())
            .filter(|code| !code.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The full program text.
    pub fn render(&self) -> String {
        let mut sections = Vec::new();
        if let Some(header) = self.header.as_deref().filter(|h| !h.is_empty()) {
            sections.push(
                header
                    .lines()
                    .map(|line| format!("# {}", line))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        let imports = self.imports_block();
        if !imports.is_empty() {
            sections.push(imports);
        }
        let body = self.body_block();
        if !body.is_empty() {
            sections.push(body);
        }
        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }

    pub fn fragment(&self, node_id: &str) -> Option<&NodeFragment> {
        self.fragments.iter().find(|f| f.node_id == node_id)
    }

    /// The identifier a node published on its first output port.
    pub fn output_of(&self, node_id: &str) -> Option<&str> {
        self.fragment(node_id)
            .and_then(|f| f.outputs.first())
            .and_then(|o| o.as_deref())
    }

    /// Saves the compiled script to a file using the bincode format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let bytes = encode_to_vec(self, standard())
            .map_err(|e| ArtifactError::Encode(e.to_string()))?;
        fs::write(path, bytes).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads a compiled script from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Deserializes a compiled script from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        decode_from_slice(bytes, standard())
            .map(|(script, _)| script) // bincode 2 returns (data, bytes_read)
            .map_err(|e| ArtifactError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> CompiledScript {
        CompiledScript {
            header: Some("generated".to_string()),
            imports: vec!["import os".to_string()],
            fragments: vec![
                NodeFragment {
                    node_id: "env".to_string(),
                    component: "envVariables".to_string(),
                    code: "os.environ[\"A\"] = \"1\"".to_string(),
                    outputs: vec![],
                },
                NodeFragment {
                    node_id: "csv".to_string(),
                    component: "csvFileInput".to_string(),
                    code: "csv_file_input1 = pd.read_csv(\"a.csv\")".to_string(),
                    outputs: vec![Some("csv_file_input1".to_string())],
                },
            ],
            skipped: vec![],
        }
    }

    #[test]
    fn test_render_layout() {
        let rendered = script().render();
        assert_eq!(
            rendered,
            "# generated\n\nimport os\n\n\
             os.environ[\"A\"] = \"1\"\n\n\
             csv_file_input1 = pd.read_csv(\"a.csv\")\n"
        );
    }

    #[test]
    fn test_output_lookup() {
        let script = script();
        assert_eq!(script.output_of("csv"), Some("csv_file_input1"));
        assert_eq!(script.output_of("env"), None);
        assert_eq!(script.output_of("missing"), None);
    }

    #[test]
    fn test_artifact_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.bin");
        let original = script();
        original.save(&path).unwrap();
        assert_eq!(CompiledScript::from_file(&path).unwrap(), original);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            CompiledScript::from_bytes(&[0xff, 0xff, 0xff]),
            Err(ArtifactError::Decode(_))
        ));
    }
}
