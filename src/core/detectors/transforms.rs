//! Transform detection: conversion functions and conversion-trait impls.

use regex::Regex;

use super::text::FileText;
use super::{group, Candidate, ComponentDetector, DETECTION_KEY};
use crate::core::language::Language;
use crate::core::schema::ComponentKind;
use crate::error::Result;

use Language::*;

/// Conversion-looking names that are plumbing, not transforms
const EXCLUDED: &[&str] = &["toString", "ToString", "to_string", "to_owned", "toJSON", "toJson"];

/// Words that can precede a call site and look like a return type
const NOT_A_TYPE: &[&str] = &["return", "await", "throw", "new", "yield", "else", "val", "var", "let"];

struct TransformRule {
    name: &'static str,
    languages: &'static [Language],
    pattern: Regex,
}

impl TransformRule {
    fn new(name: &'static str, languages: &'static [Language], pattern: &str) -> Result<Self> {
        Ok(Self {
            name,
            languages,
            pattern: Regex::new(pattern)?,
        })
    }
}

pub struct TransformDetector {
    rules: Vec<TransformRule>,
    conversion_impl: Regex,
    max_lines: usize,
}

impl TransformDetector {
    pub fn new(max_lines: usize) -> Result<Self> {
        let rules = vec![
            TransformRule::new(
                "function",
                &[TypeScript, JavaScript],
                r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>(?:to|from)[A-Z_]\w*|convert\w*|transform\w*)\s*[(<]",
            )?,
            TransformRule::new(
                "arrow_function",
                &[TypeScript, JavaScript],
                r"(?m)^[ \t]*(?:export\s+)?(?:const|let|var)\s+(?P<name>(?:to|from)[A-Z_]\w*|convert\w*|transform\w*)\s*(?::[^=\n]+)?=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*(?::[^=\n]+)?=>",
            )?,
            TransformRule::new(
                "method",
                &[TypeScript, JavaScript],
                r"(?m)^[ \t]*(?:(?:public|private|protected|static|async)\s+)*(?P<name>(?:to|from)[A-Z_]\w*|convert\w*|transform\w*)\s*\([^)\n]*\)\s*(?::[^{\n]+)?\{",
            )?,
            TransformRule::new(
                "fn",
                &[Rust],
                r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?fn\s+(?P<name>(?:to|from)_\w+|convert\w*|transform\w*)\s*[(<]",
            )?,
            TransformRule::new(
                "def",
                &[Python],
                r"(?m)^[ \t]*(?:async\s+)?def\s+(?P<name>(?:to|from)_\w+|convert\w*|transform\w*)\s*\(",
            )?,
            TransformRule::new(
                "func",
                &[Go],
                r"(?m)^func\s+(?:\([^)]*\)\s*)?(?P<name>(?:To|From)[A-Z_]\w*|[Cc]onvert\w*|[Tt]ransform\w*)\s*\(",
            )?,
            TransformRule::new(
                "method",
                &[Java, Kotlin, CSharp],
                r"(?m)^[ \t]*(?:(?:public|private|protected|internal|static|final|override|suspend|open|fun|async|virtual)\s+)*(?P<ty>[\w<>\[\],.?]+\s+)?(?:\w+(?:<[^>\n]*>)?\.)?(?P<name>(?:to|from|To|From)[A-Z]\w*|[Cc]onvert\w*|[Tt]ransform\w*)\s*\([^)\n]*\)\s*(?::\s*[^={;\n]+)?(?:\{|=|throws\b|$)",
            )?,
        ];

        Ok(Self {
            rules,
            conversion_impl: Regex::new(
                r"(?m)^[ \t]*impl(?:<[^>\n]*>)?\s+(?P<trait>From|TryFrom|Into)<(?P<inner>[^>\n]+(?:<[^>\n]*>)?)>\s+for\s+(?P<outer>[\w:]+(?:<[^>\n]*>)?)",
            )?,
            max_lines,
        })
    }

    fn detect_conversion_impls(&self, file: &FileText, out: &mut Vec<Candidate>) {
        for captures in self.conversion_impl.captures_iter(file.content) {
            let (Some(whole), Some(trait_name), Some(inner), Some(outer)) = (
                captures.get(0),
                group(&captures, 1),
                group(&captures, 2),
                group(&captures, 3),
            ) else {
                continue;
            };
            let inner = inner.trim();
            let outer = outer.trim();
            // `impl Into<B> for A` converts A into B
            let (source, target) = match trait_name {
                "Into" => (outer, inner),
                _ => (inner, outer),
            };

            let line = file.line_index(whole.start());
            out.push(
                Candidate::new(
                    ComponentKind::Transform,
                    format!("{}<{}> for {}", trait_name, inner, outer),
                    file,
                    line,
                )
                .with_meta(DETECTION_KEY, "conversion_impl")
                .with_meta("source_type", source)
                .with_meta("target_type", target)
                .with_end(file.block_end(line, self.max_lines)),
            );
        }
    }
}

impl ComponentDetector for TransformDetector {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Transform
    }

    fn detect(&self, file: &FileText) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        if file.language == Rust {
            self.detect_conversion_impls(file, &mut candidates);
        }

        for rule in self.rules.iter().filter(|r| r.languages.contains(&file.language)) {
            for captures in rule.pattern.captures_iter(file.content) {
                let Some(name) = captures.name("name") else {
                    continue;
                };
                if EXCLUDED.contains(&name.as_str()) {
                    continue;
                }
                if let Some(ty) = captures.name("ty") {
                    if NOT_A_TYPE.contains(&ty.as_str().trim()) {
                        continue;
                    }
                }

                let line = file.line_index(name.start());
                candidates.push(
                    Candidate::new(ComponentKind::Transform, name.as_str(), file, line)
                        .with_meta(DETECTION_KEY, rule.name)
                        .with_end(file.block_end(line, self.max_lines)),
                );
            }
        }

        candidates
    }
}
