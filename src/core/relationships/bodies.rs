use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::config::RelationshipConfig;
use crate::core::detectors::FileText;
use crate::core::schema::{Component, ComponentKind};

/// The text a component spans, plus its identifier tokens
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub text: String,
    tokens: HashSet<String>,
}

impl Body {
    pub fn new(text: String) -> Self {
        let tokens = crate::core::detectors::text::token_set(&text)
            .into_iter()
            .map(str::to_string)
            .collect();
        Self { text, tokens }
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Compute every component's body in parallel, index-aligned with `components`
pub fn collect_bodies(
    components: &[Component],
    files: &HashMap<&str, FileText<'_>>,
    config: &RelationshipConfig,
) -> Vec<Body> {
    components
        .par_iter()
        .map(|component| match files.get(component.source.file.as_str()) {
            Some(file) => Body::new(body_text(component, file, config)),
            None => Body::default(),
        })
        .collect()
}

/// Lines `line_start..=line_end`, falling back to a fixed window, plus the
/// named handler's declaration for transports
fn body_text(component: &Component, file: &FileText<'_>, config: &RelationshipConfig) -> String {
    let max = config.max_body_lines.max(1);
    let start = component.source.line_start.saturating_sub(1) as usize;
    let end = match component.source.line_end {
        Some(end) => (end.saturating_sub(1) as usize).max(start),
        None => start + config.body_window_lines.max(1) - 1,
    };
    let end = end.min(start + max - 1);
    let mut text = file.slice(start, end);

    if component.kind == ComponentKind::Transport {
        let handler_line = component
            .metadata
            .get("handler_line")
            .and_then(|line| line.parse::<usize>().ok())
            .filter(|&line| line > 0);
        if let Some(line) = handler_line {
            let handler_start = line - 1;
            if handler_start < start || handler_start > end {
                let handler_end = file.block_end(handler_start, max);
                text.push('\n');
                text.push_str(&file.slice(handler_start, handler_end));
            }
        }
    }

    text
}
