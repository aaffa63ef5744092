use std::collections::HashMap;

use crate::core::schema::Edge;

/// Merge edges sharing an ordered (from, to) pair.
///
/// Pairs keep their first-occurrence order, labels are unioned in
/// first-occurrence order and the first payload type wins. Merging an
/// already merged set is a no-op.
pub fn merge_edges(edges: Vec<Edge>) -> Vec<Edge> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut merged: Vec<Edge> = Vec::with_capacity(edges.len());

    for edge in edges {
        if edge.from_id == edge.to_id || edge.label.is_empty() {
            continue;
        }
        let key = (edge.from_id.clone(), edge.to_id.clone());
        match index.get(&key) {
            Some(&slot) => {
                let existing = &mut merged[slot];
                for label in edge.label {
                    if !existing.label.contains(&label) {
                        existing.label.push(label);
                    }
                }
                if existing.payload_type.is_none() {
                    existing.payload_type = edge.payload_type;
                }
            }
            None => {
                index.insert(key, merged.len());
                let mut edge = edge;
                let mut seen = Vec::with_capacity(edge.label.len());
                edge.label.retain(|label| {
                    let fresh = !seen.contains(label);
                    seen.push(*label);
                    fresh
                });
                merged.push(edge);
            }
        }
    }

    merged
}
