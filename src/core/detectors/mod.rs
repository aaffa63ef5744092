//! Component detectors. Each detector is a set of declarative pattern rules
//! for one component kind; `DetectorSet` runs all four over a file and
//! resolves precedence between explicit markers and directory heuristics.

pub mod models;
pub mod services;
pub mod text;
pub mod transforms;
pub mod transports;

use std::collections::{BTreeMap, HashSet};

use crate::config::Config;
use crate::core::language::Language;
use crate::core::schema::{ComponentKind, TransportProtocol};
use crate::error::Result;

pub use models::ModelDetector;
pub use services::ServiceDetector;
pub use text::FileText;
pub use transforms::TransformDetector;
pub use transports::TransportDetector;

/// Metadata key naming the rule that produced a candidate
pub const DETECTION_KEY: &str = "detection";

/// Detection value used by the service directory fallback
pub const DIRECTORY_CONVENTION: &str = "directory_convention";

/// A detected construct before identity assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kind: ComponentKind,
    pub name: String,
    pub language: Language,
    pub file: String,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    pub metadata: BTreeMap<String, String>,
    pub transport_protocol: Option<TransportProtocol>,
    pub http_method: Option<String>,
    pub http_path: Option<String>,
    pub model_fields: Option<Vec<String>>,
    pub consumes: Option<Vec<String>>,
    pub produces: Option<Vec<String>>,
}

impl Candidate {
    /// New candidate declared on the 0-based line `line_index` of `file`
    pub fn new(kind: ComponentKind, name: impl Into<String>, file: &FileText, line_index: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            language: file.language,
            file: file.path.to_string(),
            line_start: Some(line_index as u32 + 1),
            line_end: None,
            metadata: BTreeMap::new(),
            transport_protocol: None,
            http_method: None,
            http_path: None,
            model_fields: None,
            consumes: None,
            produces: None,
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Set the 0-based last line of the construct
    pub fn with_end(mut self, end_index: usize) -> Self {
        let end = end_index as u32 + 1;
        self.line_end = match self.line_start {
            Some(start) if end < start => Some(start),
            _ => Some(end),
        };
        self
    }

    pub fn with_payloads(mut self, consumes: Vec<String>, produces: Vec<String>) -> Self {
        if !consumes.is_empty() {
            self.consumes = Some(consumes);
        }
        if !produces.is_empty() {
            self.produces = Some(produces);
        }
        self
    }

    pub fn detection(&self) -> Option<&str> {
        self.metadata.get(DETECTION_KEY).map(String::as_str)
    }

    pub fn is_directory_convention(&self) -> bool {
        self.detection() == Some(DIRECTORY_CONVENTION)
    }
}

/// A pure, per-file detector for one component kind
pub trait ComponentDetector: Send + Sync {
    /// The kind of every candidate this detector produces
    fn kind(&self) -> ComponentKind;

    /// Detect candidates in one file. No match yields an empty vector.
    fn detect(&self, file: &FileText) -> Vec<Candidate>;
}

/// All four detectors, compiled once per scan
pub struct DetectorSet {
    detectors: Vec<Box<dyn ComponentDetector>>,
}

impl DetectorSet {
    pub fn new(config: &Config) -> Result<Self> {
        let max_lines = config.relationships.max_body_lines;
        let detectors: Vec<Box<dyn ComponentDetector>> = vec![
            Box::new(ModelDetector::new(max_lines)?),
            Box::new(ServiceDetector::new(&config.detection, max_lines)?),
            Box::new(TransportDetector::new(max_lines)?),
            Box::new(TransformDetector::new(max_lines)?),
        ];
        Ok(Self { detectors })
    }

    /// Run every detector over one file and resolve precedence
    pub fn detect(&self, path: &str, language: Language, content: &str) -> Vec<Candidate> {
        let file = FileText::new(path, language, content);
        let candidates = self
            .detectors
            .iter()
            .flat_map(|detector| detector.detect(&file))
            .collect();
        resolve_precedence(candidates)
    }
}

/// Drop directory-convention services shadowed by an explicit candidate of
/// another kind with the same name or on the same line.
pub fn resolve_precedence(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let explicit: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !c.is_directory_convention())
        .collect();
    let names: HashSet<(ComponentKind, &str)> =
        explicit.iter().map(|c| (c.kind, c.name.as_str())).collect();
    let lines: HashSet<(ComponentKind, Option<u32>)> =
        explicit.iter().map(|c| (c.kind, c.line_start)).collect();

    let shadowed = |candidate: &Candidate| {
        candidate.is_directory_convention()
            && (names
                .iter()
                .any(|(kind, name)| *kind != candidate.kind && *name == candidate.name)
                || lines
                    .iter()
                    .any(|(kind, line)| *kind != candidate.kind && *line == candidate.line_start))
    };

    let keep: Vec<bool> = candidates.iter().map(|c| !shadowed(c)).collect();
    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(candidate, keep)| keep.then_some(candidate))
        .collect()
}

/// Capture group `index` as a string slice, if it participated
pub(crate) fn group<'t>(captures: &regex::Captures<'t>, index: usize) -> Option<&'t str> {
    captures.get(index).map(|m| m.as_str())
}
