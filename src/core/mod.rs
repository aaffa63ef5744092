// src/core/mod.rs
pub mod analytics;
pub mod detectors;
pub mod identity;
pub mod language;
pub mod pipeline;
pub mod relationships;
pub mod schema;
pub mod source;
pub mod view;
pub mod workflows;

mod engine;

pub use analytics::GraphAnalytics;
pub use detectors::{Candidate, ComponentDetector, DetectorSet};
pub use language::Language;
pub use pipeline::{analyze, Pipeline, ScanResult};
pub use relationships::{merge_edges, RelationshipInferencer};
pub use schema::{
    Component, ComponentAnnotation, ComponentKind, Edge, EdgeLabel, EdgeRef, HubTier, ScanDocument,
    ScanStats, SourceLocation, StepType, TransportProtocol, Workflow, WorkflowStep,
};
pub use source::{CollectedSources, SourceCollector, SourceFile};
pub use view::{project, ViewMode};
pub use workflows::WorkflowSynthesizer;

// Export the main engine
pub use engine::{Engine, HubSummary, Inspection};
