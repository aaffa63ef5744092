//! The pure analysis pipeline: detection, identity, relationship inference
//! and workflow synthesis over an in-memory set of source files.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::core::detectors::DetectorSet;
use crate::core::identity;
use crate::core::language::Language;
use crate::core::relationships::RelationshipInferencer;
use crate::core::schema::{Component, Edge, Workflow};
use crate::core::source::SourceFile;
use crate::core::workflows::WorkflowSynthesizer;
use crate::error::Result;

/// Everything a scan derives from its inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub components: Vec<Component>,
    pub edges: Vec<Edge>,
    pub workflows: Vec<Workflow>,
    pub detected_languages: Vec<Language>,
}

/// Compiled detectors and inference rules, reusable across scans
pub struct Pipeline {
    detectors: DetectorSet,
    relationships: RelationshipInferencer,
    workflows: WorkflowSynthesizer,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            detectors: DetectorSet::new(config)?,
            relationships: RelationshipInferencer::new(&config.relationships)?,
            workflows: WorkflowSynthesizer::new(&config.workflows),
        })
    }

    pub fn run(&self, sources: &[SourceFile]) -> ScanResult {
        let components = self.components(sources);
        info!("🧩 Detected {} components in {} files", components.len(), sources.len());

        let edges = self.relationships.infer(&components, sources);
        info!("🔗 Inferred {} relationships", edges.len());

        let workflows = self.workflows.synthesize(&components, &edges);
        info!("🧭 Synthesized {} workflows", workflows.len());

        let mut detected_languages: Vec<Language> = sources.iter().map(|s| s.language).collect();
        detected_languages.sort();
        detected_languages.dedup();

        ScanResult {
            components,
            edges,
            workflows,
            detected_languages,
        }
    }

    /// Detect per file in parallel, dedupe, assign ids and sort
    fn components(&self, sources: &[SourceFile]) -> Vec<Component> {
        let candidates: Vec<_> = sources
            .par_iter()
            .map(|source| self.detectors.detect(&source.path, source.language, &source.content))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        debug!("{} raw candidates", candidates.len());

        let mut components: Vec<Component> = identity::dedupe(candidates)
            .into_iter()
            .filter_map(identity::assign)
            .collect();
        components.sort_by(|a, b| {
            (&a.source.file, a.source.line_start, a.kind, &a.name)
                .cmp(&(&b.source.file, b.source.line_start, b.kind, &b.name))
        });
        components
    }
}

/// Run the whole pipeline once
pub fn analyze(sources: &[SourceFile], config: &Config) -> Result<ScanResult> {
    Ok(Pipeline::new(config)?.run(sources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ComponentKind, EdgeLabel};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_empty_input() {
        let result = analyze(&[], &Config::default()).unwrap();
        assert_eq!(result, ScanResult::default());
    }

    #[test]
    fn test_ids_unique_and_kinds_exclusive() {
        let sources = vec![
            SourceFile::new(
                "src/services/users.ts",
                Language::TypeScript,
                indoc! {r#"
                    export interface User {
                      id: string;
                    }

                    export class UserService {
                      find(id: string): User {
                        return { id };
                      }
                    }

                    export function toUser(row) {
                      return row;
                    }
                "#},
            ),
            SourceFile::new("app/models.py", Language::Python, "class User(BaseModel):\n    id: int\n"),
        ];
        let result = analyze(&sources, &Config::default()).unwrap();

        let ids: HashSet<&str> = result.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), result.components.len());
        assert!(result.components.iter().any(|c| c.kind == ComponentKind::Model && c.name == "User"));
        assert!(result.components.iter().any(|c| c.kind == ComponentKind::Service && c.name == "UserService"));
        assert!(result.components.iter().any(|c| c.kind == ComponentKind::Transform && c.name == "toUser"));
        assert_eq!(result.detected_languages, vec![Language::TypeScript, Language::Python]);
    }

    #[test]
    fn test_components_sorted_by_location() {
        let sources = vec![
            SourceFile::new("b.rs", Language::Rust, "pub struct Beta {\n    x: u8,\n}\n"),
            SourceFile::new("a.rs", Language::Rust, "pub struct Zed;\n\npub struct Alpha {\n    y: u8,\n}\n"),
        ];
        let result = analyze(&sources, &Config::default()).unwrap();
        let names: Vec<&str> = result.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Alpha", "Beta"]);
        assert!(result.edges.iter().all(|e| !e.has_label(EdgeLabel::Handles)));
    }
}
