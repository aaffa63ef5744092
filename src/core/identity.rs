//! Stable component identity: deduplication of candidates and digest ids.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::detectors::Candidate;
use super::schema::{Component, ComponentKind, SourceLocation};

/// `hex(sha256("{file}:{line}:{name}:{kind}"))[..16]`
pub fn make_id(file: &str, line_start: u32, name: &str, kind: ComponentKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}:{}", file, line_start, name, kind).as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..16].to_string()
}

/// Turn a candidate into a component. Candidates without a name or a line
/// are incomplete and dropped.
pub fn assign(candidate: Candidate) -> Option<Component> {
    let name = candidate.name.trim();
    if name.is_empty() {
        return None;
    }
    let line_start = candidate.line_start?;

    Some(Component {
        id: make_id(&candidate.file, line_start, name, candidate.kind),
        name: name.to_string(),
        kind: candidate.kind,
        language: candidate.language,
        source: SourceLocation {
            file: candidate.file,
            line_start,
            line_end: candidate.line_end,
        },
        metadata: candidate.metadata,
        transport_protocol: candidate.transport_protocol,
        http_method: candidate.http_method,
        http_path: candidate.http_path,
        model_fields: candidate.model_fields,
        consumes: candidate.consumes,
        produces: candidate.produces,
    })
}

/// Merge candidates sharing (file, name, kind). The earliest line wins;
/// later duplicates only fill in metadata keys and optional fields the
/// winner lacks. Result order follows first occurrence.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut index: HashMap<(String, String, ComponentKind), usize> = HashMap::new();
    let mut merged: Vec<Candidate> = Vec::new();

    for candidate in candidates {
        let key = (
            candidate.file.clone(),
            candidate.name.trim().to_string(),
            candidate.kind,
        );
        match index.get(&key) {
            Some(&slot) => {
                let existing = &mut merged[slot];
                let (winner, loser) = if line_key(&candidate) < line_key(existing) {
                    (candidate, existing.clone())
                } else {
                    (existing.clone(), candidate)
                };
                *existing = fill_from(winner, loser);
            }
            None => {
                index.insert(key, merged.len());
                merged.push(candidate);
            }
        }
    }

    merged
}

/// Missing lines sort last so a complete duplicate always wins
fn line_key(candidate: &Candidate) -> u32 {
    candidate.line_start.unwrap_or(u32::MAX)
}

fn fill_from(mut winner: Candidate, loser: Candidate) -> Candidate {
    for (key, value) in loser.metadata {
        winner.metadata.entry(key).or_insert(value);
    }
    winner.line_end = winner.line_end.or(loser.line_end);
    winner.transport_protocol = winner.transport_protocol.or(loser.transport_protocol);
    winner.http_method = winner.http_method.or(loser.http_method);
    winner.http_path = winner.http_path.or(loser.http_path);
    winner.model_fields = winner.model_fields.or(loser.model_fields);
    winner.consumes = winner.consumes.or(loser.consumes);
    winner.produces = winner.produces.or(loser.produces);
    winner
}
