use std::collections::HashSet;
use std::fmt;

use crate::core::schema::ScanDocument;

/// Which slice of a document a consumer renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ViewMode {
    /// Every component and edge
    #[default]
    System,
    /// Only flow edges and the components they touch
    Flow,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::System => f.write_str("system"),
            ViewMode::Flow => f.write_str("flow"),
        }
    }
}

/// Project a document onto a view mode. Workflows and stats are kept as-is.
pub fn project(doc: &ScanDocument, mode: ViewMode) -> ScanDocument {
    match mode {
        ViewMode::System => doc.clone(),
        ViewMode::Flow => {
            let edges: Vec<_> = doc.edges.iter().filter(|e| e.is_flow()).cloned().collect();
            let touched: HashSet<&str> = edges
                .iter()
                .flat_map(|e| [e.from_id.as_str(), e.to_id.as_str()])
                .collect();
            let components = doc
                .components
                .iter()
                .filter(|c| touched.contains(c.id.as_str()))
                .cloned()
                .collect();

            ScanDocument {
                components,
                edges,
                ..doc.clone()
            }
        }
    }
}
