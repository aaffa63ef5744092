//! Graph analytics over a finished scan: semantic clusters and hub tiers.
//! Annotations are derived on demand and never written back to components.

pub mod clustering;
pub mod hubs;

use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::core::relationships::merge_edges;
use crate::core::schema::{Component, ComponentAnnotation, Edge};
use crate::error::Result;

pub use clustering::{ClusterLabeler, OTHER_CLUSTER};
pub use hubs::{degree_stats, degrees, hub_tiers};

pub struct GraphAnalytics {
    config: AnalyticsConfig,
    labeler: ClusterLabeler,
}

impl GraphAnalytics {
    pub fn new(config: &AnalyticsConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            labeler: ClusterLabeler::new(config.min_cluster_size)?,
        })
    }

    /// Annotate every component, in component order
    pub fn annotate(&self, components: &[Component], edges: &[Edge]) -> Vec<ComponentAnnotation> {
        if components.is_empty() {
            return Vec::new();
        }

        // documents from older scanners may carry unmerged pairs
        let edges = merge_edges(edges.to_vec());
        let degrees = hubs::degrees(components, &edges);
        let tiers = hubs::hub_tiers(&degrees, self.config.medium_sigma, self.config.high_sigma);
        let clusters = self.labeler.label(components);

        let annotations: Vec<ComponentAnnotation> = components
            .iter()
            .zip(clusters)
            .zip(degrees.into_iter().zip(tiers))
            .map(|((component, cluster), (degree, hub_tier))| ComponentAnnotation {
                component_id: component.id.clone(),
                cluster,
                hub_tier,
                degree,
            })
            .collect();

        debug!("Annotated {} components", annotations.len());
        annotations
    }
}
