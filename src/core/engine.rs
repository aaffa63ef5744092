// src/core/engine.rs
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use super::analytics::GraphAnalytics;
use super::pipeline::Pipeline;
use super::schema::{ComponentKind, HubTier, ScanDocument, ScanStats, SCHEMA_VERSION};
use super::source::SourceCollector;
use super::view::{self, ViewMode};

/// Main orchestration engine: walks a tree, runs the pipeline and wraps the
/// result in a scan document
pub struct Engine {
    config: Config,
    collector: SourceCollector,
    pipeline: Pipeline,
    analytics: GraphAnalytics,
}

impl Engine {
    /// Create a new engine from an already loaded configuration
    pub fn new(config: Config) -> Result<Self> {
        debug!("Loaded configuration: {:?}", config);

        let collector = SourceCollector::new(&config.scan);
        let pipeline = Pipeline::new(&config).context("Failed to compile detection rules")?;
        let analytics = GraphAnalytics::new(&config.analytics).context("Failed to compile analytics rules")?;

        Ok(Self {
            config,
            collector,
            pipeline,
            analytics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan a directory tree into a document
    pub fn scan(&self, root: &Path) -> Result<ScanDocument> {
        let started = Instant::now();
        let root = root
            .canonicalize()
            .with_context(|| format!("Cannot read scan root {}", root.display()))?;

        info!("🔍 Scanning {}", root.display());
        let collected = self
            .collector
            .collect(&root)
            .with_context(|| format!("Failed to walk {}", root.display()))?;
        if collected.files.is_empty() {
            warn!("No recognized source files under {}", root.display());
        }

        let result = self.pipeline.run(&collected.files);

        let project_name = root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());

        Ok(ScanDocument {
            version: SCHEMA_VERSION.to_string(),
            scanned_at: chrono::Utc::now().to_rfc3339(),
            root_dir: root.display().to_string(),
            project_name,
            detected_languages: result.detected_languages,
            components: result.components,
            edges: result.edges,
            workflows: result.workflows,
            scan_stats: ScanStats {
                files_scanned: collected.files.len() as u64,
                files_skipped: collected.skipped,
                scan_duration_ms: started.elapsed().as_millis() as u64,
            },
        })
    }

    /// Scan and write the document, returning the path written
    pub fn scan_to_file(&self, root: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
        let document = self.scan(root)?;
        let output = output.unwrap_or_else(|| self.config.output.path.clone());

        document
            .write(&output, self.config.output.pretty)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        let stats = &document.scan_stats;
        info!("📊 Scan complete:");
        info!("  - {} files scanned, {} skipped", stats.files_scanned, stats.files_skipped);
        info!("  - {} components", document.components.len());
        info!("  - {} edges", document.edges.len());
        info!("  - {} workflows", document.workflows.len());
        info!("  - {} ms", stats.scan_duration_ms);
        info!("✅ Wrote {}", output.display());

        Ok(output)
    }

    /// Load a document, project it and summarize clusters, hubs and workflows
    pub fn inspect(&self, document: &Path, mode: ViewMode, top: usize) -> Result<Inspection> {
        let doc = ScanDocument::load(document)
            .with_context(|| format!("Failed to load scan document {}", document.display()))?;
        Ok(self.summarize(&doc, mode, top))
    }

    pub fn summarize(&self, doc: &ScanDocument, mode: ViewMode, top: usize) -> Inspection {
        let projected = view::project(doc, mode);
        let annotations = self.analytics.annotate(&projected.components, &projected.edges);

        let mut clusters: BTreeMap<String, usize> = BTreeMap::new();
        for annotation in &annotations {
            *clusters.entry(annotation.cluster.clone()).or_insert(0) += 1;
        }
        let mut clusters: Vec<(String, usize)> = clusters.into_iter().collect();
        clusters.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut hubs: Vec<HubSummary> = projected
            .components
            .iter()
            .zip(&annotations)
            .map(|(component, annotation)| HubSummary {
                name: component.name.clone(),
                kind: component.kind,
                degree: annotation.degree,
                tier: annotation.hub_tier,
            })
            .collect();
        hubs.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.name.cmp(&b.name)));
        hubs.truncate(top);

        let workflows = projected
            .workflows
            .iter()
            .take(top)
            .map(|w| (w.name.clone(), w.steps.len()))
            .collect();

        Inspection {
            project_name: projected.project_name.clone(),
            mode,
            components: projected.components.len(),
            edges: projected.edges.len(),
            clusters,
            hubs,
            workflows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HubSummary {
    pub name: String,
    pub kind: ComponentKind,
    pub degree: usize,
    pub tier: HubTier,
}

/// Printable summary of a projected document
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub project_name: String,
    pub mode: ViewMode,
    pub components: usize,
    pub edges: usize,
    /// (label, members), largest first
    pub clusters: Vec<(String, usize)>,
    pub hubs: Vec<HubSummary>,
    /// (name, step count), in document order
    pub workflows: Vec<(String, usize)>,
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} view): {} components, {} edges",
            self.project_name, self.mode, self.components, self.edges
        )?;

        writeln!(f, "\nClusters:")?;
        for (label, size) in &self.clusters {
            writeln!(f, "  {:<24} {}", label, size)?;
        }

        writeln!(f, "\nHubs:")?;
        for hub in &self.hubs {
            writeln!(f, "  {:<40} {:<10} {:>4}  {:?}", hub.name, hub.kind.as_str(), hub.degree, hub.tier)?;
        }

        writeln!(f, "\nWorkflows:")?;
        if self.workflows.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for (name, steps) in &self.workflows {
            writeln!(f, "  {:<40} {} steps", name, steps)?;
        }
        Ok(())
    }
}
