use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use crate::core::schema::{Component, ComponentKind};
use crate::error::Result;

/// Label given to clusters below the minimum size
pub const OTHER_CLUSTER: &str = "Other";

/// Path segments that are parameters, not resources
const PLACEHOLDER_PREFIXES: &[char] = &[':', '{', '<', '[', '*', '$'];

/// Assigns semantic cluster labels from paths, names and directories
pub struct ClusterLabeler {
    leading_word: Regex,
    min_cluster_size: usize,
}

impl ClusterLabeler {
    pub fn new(min_cluster_size: usize) -> Result<Self> {
        Ok(Self {
            leading_word: Regex::new(r"[A-Z][a-z]+")?,
            min_cluster_size,
        })
    }

    /// One label per component, with undersized clusters folded into `Other`
    pub fn label(&self, components: &[Component]) -> Vec<String> {
        let raw: Vec<String> = components.iter().map(|c| self.raw_label(c)).collect();

        let mut sizes: HashMap<&str, usize> = HashMap::new();
        for label in &raw {
            *sizes.entry(label.as_str()).or_insert(0) += 1;
        }

        raw.iter()
            .map(|label| {
                if sizes.get(label.as_str()).copied().unwrap_or(0) < self.min_cluster_size {
                    OTHER_CLUSTER.to_string()
                } else {
                    label.clone()
                }
            })
            .collect()
    }

    fn raw_label(&self, component: &Component) -> String {
        let from_name = match component.kind {
            ComponentKind::Transport => component.http_path.as_deref().and_then(resource_segment),
            _ => self
                .leading_word
                .find(&component.name)
                .map(|m| m.as_str().to_string()),
        };
        from_name.unwrap_or_else(|| parent_dir(&component.source.file))
    }
}

/// First non-placeholder path segment, title-cased
fn resource_segment(path: &str) -> Option<String> {
    path.split('/')
        .find(|segment| !segment.is_empty() && !segment.starts_with(PLACEHOLDER_PREFIXES))
        .map(title_case)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn parent_dir(file: &str) -> String {
    Path::new(file)
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "root".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::Language;
    use crate::core::schema::SourceLocation;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn component(name: &str, kind: ComponentKind, file: &str, http_path: Option<&str>) -> Component {
        Component {
            id: name.to_string(),
            name: name.to_string(),
            kind,
            language: Language::Go,
            source: SourceLocation {
                file: file.to_string(),
                line_start: 1,
                line_end: None,
            },
            metadata: BTreeMap::new(),
            transport_protocol: None,
            http_method: None,
            http_path: http_path.map(str::to_string),
            model_fields: None,
            consumes: None,
            produces: None,
        }
    }

    #[test]
    fn test_raw_labels() {
        let labeler = ClusterLabeler::new(1).unwrap();
        let labels = labeler.label(&[
            component("GET /api/:id", ComponentKind::Transport, "a/routes.go", Some("/:id/ORDERS")),
            component("UserService", ComponentKind::Service, "a/svc.go", None),
            component("send_mail", ComponentKind::Service, "jobs/mail.py", None),
            component("mq:payments", ComponentKind::Transport, "main.ts", None),
            component("GET /", ComponentKind::Transport, "web/app.ts", Some("/")),
        ]);
        assert_eq!(labels, vec!["Orders", "User", "jobs", "root", "web"]);
    }

    #[test]
    fn test_small_clusters_fold_into_other() {
        let labeler = ClusterLabeler::new(3).unwrap();
        let labels = labeler.label(&[
            component("OrderRow", ComponentKind::Model, "m.rs", None),
            component("OrderService", ComponentKind::Service, "s.rs", None),
            component("OrderLine", ComponentKind::Model, "m.rs", None),
            component("POST /orders", ComponentKind::Transport, "r.rs", Some("/orders")),
            component("UserRow", ComponentKind::Model, "m.rs", None),
        ]);
        assert_eq!(labels, vec!["Order", "Order", "Order", "Other", "Other"]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("ORDERS"), "Orders");
        assert_eq!(title_case("users"), "Users");
    }
}
