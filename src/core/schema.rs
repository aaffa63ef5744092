//! The scan document: components, edges, workflows and the envelope that
//! carries them to the viewer.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::language::Language;
use crate::error::{Result, SysvistaError};

/// Version of the document layout written by this crate
pub const SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Model,
    Service,
    Transport,
    Transform,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Model => "model",
            ComponentKind::Service => "service",
            ComponentKind::Transport => "transport",
            ComponentKind::Transform => "transform",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Http,
    Grpc,
    Websocket,
    Mq,
    Graphql,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File path relative to the scan root, `/`-separated
    pub file: String,
    /// 1-based line where the construct starts
    pub line_start: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
}

/// A detected architectural unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub kind: ComponentKind,
    pub language: Language,
    pub source: SourceLocation,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_protocol: Option<TransportProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produces: Option<Vec<String>>,
}

impl Component {
    /// Whether the name can be matched as a bare source token
    pub fn has_token_name(&self, min_len: usize) -> bool {
        is_identifier(&self.name) && self.name.len() >= min_len
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLabel {
    Imports,
    References,
    Handles,
    Persists,
    Transforms,
    Consumes,
    Produces,
    Calls,
    Dispatches,
}

impl EdgeLabel {
    /// The fixed set of labels a consumer may filter on for flow views
    pub const FLOW: [EdgeLabel; 7] = [
        EdgeLabel::Handles,
        EdgeLabel::Persists,
        EdgeLabel::Transforms,
        EdgeLabel::Consumes,
        EdgeLabel::Produces,
        EdgeLabel::Calls,
        EdgeLabel::Dispatches,
    ];

    pub fn is_flow(&self) -> bool {
        Self::FLOW.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::Imports => "imports",
            EdgeLabel::References => "references",
            EdgeLabel::Handles => "handles",
            EdgeLabel::Persists => "persists",
            EdgeLabel::Transforms => "transforms",
            EdgeLabel::Consumes => "consumes",
            EdgeLabel::Produces => "produces",
            EdgeLabel::Calls => "calls",
            EdgeLabel::Dispatches => "dispatches",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed relationship between two components of the same scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    #[serde(deserialize_with = "one_or_many_labels")]
    pub label: Vec<EdgeLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<String>,
}

impl Edge {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, label: EdgeLabel) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            label: vec![label],
            payload_type: None,
        }
    }

    pub fn with_payload(mut self, payload_type: impl Into<String>) -> Self {
        self.payload_type = Some(payload_type.into());
        self
    }

    pub fn has_label(&self, label: EdgeLabel) -> bool {
        self.label.contains(&label)
    }

    pub fn is_flow(&self) -> bool {
        self.label.iter().any(EdgeLabel::is_flow)
    }
}

/// Older documents carry a single label string per edge
fn one_or_many_labels<'de, D>(deserializer: D) -> std::result::Result<Vec<EdgeLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(EdgeLabel),
        Many(Vec<EdgeLabel>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(label) => Ok(vec![label]),
        OneOrMany::Many(labels) if labels.is_empty() => {
            Err(serde::de::Error::custom("edge label set must not be empty"))
        }
        OneOrMany::Many(labels) => Ok(labels),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Entry,
    Call,
    Persist,
    Dispatch,
    Response,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub component_id: String,
    pub step_type: StepType,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeRef {
    pub from_id: String,
    pub to_id: String,
}

/// An ordered trace of one data-flow path starting at a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub entry_point_id: String,
    pub steps: Vec<WorkflowStep>,
    /// Every flow edge the trace crossed, including ones into known nodes
    #[serde(default)]
    pub edges: Vec<EdgeRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubTier {
    Normal,
    Medium,
    High,
}

/// Derived per-component annotation; never persisted on the component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAnnotation {
    pub component_id: String,
    pub cluster: String,
    pub hub_tier: HubTier,
    pub degree: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub files_scanned: u64,
    pub files_skipped: u64,
    pub scan_duration_ms: u64,
}

/// The hand-off document between the scanner and any consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanDocument {
    pub version: String,
    pub scanned_at: String,
    pub root_dir: String,
    pub project_name: String,
    pub detected_languages: Vec<Language>,
    pub components: Vec<Component>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    pub scan_stats: ScanStats,
}

impl ScanDocument {
    /// Write the document as JSON
    pub fn write<P: AsRef<Path>>(&self, path: P, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a document written by `write` (or an older scanner)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SysvistaError::InvalidDocument(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a document. `components` and `edges` are required;
    /// a missing `workflows` array is treated as empty.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| SysvistaError::InvalidDocument(format!("not valid JSON: {}", e)))?;

        let object = value.as_object().ok_or_else(|| {
            SysvistaError::InvalidDocument("top-level value must be an object".to_string())
        })?;

        for field in ["components", "edges"] {
            match object.get(field) {
                Some(serde_json::Value::Array(_)) => {}
                Some(_) => {
                    return Err(SysvistaError::InvalidDocument(format!(
                        "`{}` must be an array",
                        field
                    )))
                }
                None => {
                    return Err(SysvistaError::InvalidDocument(format!(
                        "missing required array `{}`",
                        field
                    )))
                }
            }
        }

        serde_json::from_value(value).map_err(|e| SysvistaError::InvalidDocument(e.to_string()))
    }
}
