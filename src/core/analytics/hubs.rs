use std::collections::HashMap;

use crate::core::schema::{Component, Edge, HubTier};

/// Number of incident edges per component, index-aligned with `components`
pub fn degrees(components: &[Component], edges: &[Edge]) -> Vec<usize> {
    let index: HashMap<&str, usize> = components
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut degrees = vec![0; components.len()];
    for edge in edges {
        for id in [&edge.from_id, &edge.to_id] {
            if let Some(&i) = index.get(id.as_str()) {
                degrees[i] += 1;
            }
        }
    }
    degrees
}

/// Population mean and standard deviation of a degree sequence
pub fn degree_stats(degrees: &[usize]) -> (f64, f64) {
    if degrees.is_empty() {
        return (0.0, 0.0);
    }
    let n = degrees.len() as f64;
    let mean = degrees.iter().sum::<usize>() as f64 / n;
    let variance = degrees
        .iter()
        .map(|&d| {
            let diff = d as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

/// Tier each degree against `mean + k·σ` thresholds
pub fn hub_tiers(degrees: &[usize], medium_sigma: f64, high_sigma: f64) -> Vec<HubTier> {
    let (mean, sigma) = degree_stats(degrees);
    let medium = mean + medium_sigma * sigma;
    let high = mean + high_sigma * sigma;

    degrees
        .iter()
        .map(|&d| {
            let d = d as f64;
            if d > high {
                HubTier::High
            } else if d > medium {
                HubTier::Medium
            } else {
                HubTier::Normal
            }
        })
        .collect()
}
