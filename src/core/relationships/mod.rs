//! Relationship inference. Every rule family reads the same immutable
//! snapshot of components and bodies and emits unmerged edges; the merged
//! set is what the document carries.

mod bodies;
mod flow;
mod merge;
mod structural;

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::RelationshipConfig;
use crate::core::detectors::FileText;
use crate::core::schema::{Component, ComponentKind, Edge, EdgeLabel};
use crate::core::source::SourceFile;
use crate::error::Result;

pub use bodies::Body;
pub use merge::merge_edges;

use flow::FlowRules;
use structural::ImportResolver;

/// Read-only view shared by every rule family
pub(crate) struct Snapshot<'a> {
    pub components: &'a [Component],
    pub files: HashMap<&'a str, FileText<'a>>,
    pub bodies: Vec<Body>,
    /// Component indices per file, in component order
    pub by_file: BTreeMap<&'a str, Vec<usize>>,
    /// Component indices per token-eligible name
    pub by_name: HashMap<&'a str, Vec<usize>>,
    /// Model indices per name, regardless of eligibility
    pub models: HashMap<&'a str, Vec<usize>>,
}

impl<'a> Snapshot<'a> {
    pub fn new(components: &'a [Component], sources: &'a [SourceFile], config: &RelationshipConfig) -> Self {
        let files: HashMap<&str, FileText> = sources
            .iter()
            .map(|s| (s.path.as_str(), FileText::new(&s.path, s.language, &s.content)))
            .collect();
        let bodies = bodies::collect_bodies(components, &files, config);

        let mut by_file: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut models: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, component) in components.iter().enumerate() {
            by_file.entry(component.source.file.as_str()).or_default().push(idx);
            if component.has_token_name(config.min_name_length) {
                by_name.entry(component.name.as_str()).or_default().push(idx);
            }
            if component.kind == ComponentKind::Model {
                models.entry(component.name.as_str()).or_default().push(idx);
            }
        }

        Self {
            components,
            files,
            bodies,
            by_file,
            by_name,
            models,
        }
    }

    pub fn component(&self, idx: usize) -> &'a Component {
        &self.components[idx]
    }

    pub fn named(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn models_named(&self, name: &str) -> &[usize] {
        self.models.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn same_file(&self, a: usize, b: usize) -> bool {
        self.components[a].source.file == self.components[b].source.file
    }

    pub fn edge(&self, from: usize, to: usize, label: EdgeLabel) -> Edge {
        Edge::new(&self.components[from].id, &self.components[to].id, label)
    }
}

/// Infers the merged edge set over a component list
pub struct RelationshipInferencer {
    config: RelationshipConfig,
    imports: ImportResolver,
    flow: FlowRules,
}

impl RelationshipInferencer {
    pub fn new(config: &RelationshipConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            imports: ImportResolver::new()?,
            flow: FlowRules::new()?,
        })
    }

    /// Emit every rule family's edges in a fixed order, then merge
    pub fn infer(&self, components: &[Component], sources: &[SourceFile]) -> Vec<Edge> {
        let snapshot = Snapshot::new(components, sources, &self.config);

        let mut edges = Vec::new();
        edges.extend(self.imports.infer(&snapshot));
        edges.extend(structural::references(&snapshot));
        edges.extend(flow::handles(&snapshot));
        edges.extend(flow::persists(&snapshot));
        edges.extend(flow::transforms(&snapshot));
        edges.extend(flow::payloads(&snapshot));
        edges.extend(self.flow.invocations(&snapshot));

        let raw = edges.len();
        let merged = merge_edges(edges);
        debug!("Inferred {} edges ({} before merge)", merged.len(), raw);
        merged
    }
}
