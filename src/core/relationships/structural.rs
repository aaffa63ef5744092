//! Structural edges: `imports` and `references`.

use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::Snapshot;
use crate::core::detectors::FileText;
use crate::core::language::Language;
use crate::core::schema::{Edge, EdgeLabel};
use crate::error::Result;

use Language::*;

/// Words inside an import clause that never name a symbol
const CLAUSE_KEYWORDS: &[&str] = &["as", "type", "import", "from", "self", "super", "crate", "default", "typeof"];

/// Module path segments that carry no file information
const ROOT_SEGMENTS: &[&str] = &["crate", "self", "super"];

/// File stems that stand for their directory
const DIRECTORY_STEMS: &[&str] = &["index", "mod", "__init__", "main", "lib"];

/// One parsed import statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportTarget {
    pub module: String,
    pub symbols: Vec<String>,
}

struct ImportRule {
    languages: &'static [Language],
    pattern: Regex,
}

impl ImportRule {
    fn new(languages: &'static [Language], pattern: &str) -> Result<Self> {
        Ok(Self {
            languages,
            pattern: Regex::new(pattern)?,
        })
    }
}

pub struct ImportResolver {
    rules: Vec<ImportRule>,
    quoted: Regex,
}

impl ImportResolver {
    pub fn new() -> Result<Self> {
        let rules = vec![
            ImportRule::new(
                &[TypeScript, JavaScript],
                r#"(?m)^[ \t]*import\s+(?:type\s+)?(?P<symbols>[^'";]*?)\s*from\s*['"](?P<module>[^'"]+)['"]"#,
            )?,
            ImportRule::new(&[TypeScript, JavaScript], r#"(?m)^[ \t]*import\s+['"](?P<module>[^'"]+)['"]"#)?,
            ImportRule::new(
                &[TypeScript, JavaScript],
                r#"(?:(?:const|let|var)\s+(?P<symbols>\{[^}]*\}|\w+)\s*=\s*)?\brequire\s*\(\s*['"](?P<module>[^'"]+)['"]\s*\)"#,
            )?,
            ImportRule::new(
                &[Rust],
                r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?use\s+(?P<module>[\w:]+?)(?:::\{(?P<symbols>[^}]*)\})?\s*;",
            )?,
            ImportRule::new(&[Rust], r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?mod\s+(?P<module>\w+)\s*;")?,
            ImportRule::new(
                &[Python],
                r"(?m)^[ \t]*from\s+(?P<module>[\w.]+)\s+import\s+(?P<symbols>\([^)]*\)|[^\n#]+)",
            )?,
            ImportRule::new(&[Python], r"(?m)^[ \t]*import\s+(?P<module>[\w.]+)")?,
            ImportRule::new(&[Go], r#"(?m)^[ \t]*import\s+(?:[\w.]+\s+)?"(?P<module>[^"]+)""#)?,
            ImportRule::new(&[Go], r"(?m)^[ \t]*import\s*\((?P<block>[^)]*)\)")?,
            ImportRule::new(&[Java, Kotlin], r"(?m)^[ \t]*import\s+(?:static\s+)?(?P<module>[\w.]+)")?,
            ImportRule::new(&[CSharp], r"(?m)^[ \t]*using\s+(?:static\s+)?(?P<module>[\w.]+)\s*;")?,
            ImportRule::new(
                &[Ruby],
                r#"(?m)^[ \t]*require(?:_relative)?\s*\(?\s*['"](?P<module>[^'"]+)['"]"#,
            )?,
            ImportRule::new(
                &[Protobuf],
                r#"(?m)^[ \t]*import\s+(?:public\s+|weak\s+)?"(?P<module>[^"]+)""#,
            )?,
        ];

        Ok(Self {
            rules,
            quoted: Regex::new(r#""([^"]+)""#)?,
        })
    }

    /// Parse every import statement of a file, in rule then source order
    pub fn imports(&self, file: &FileText) -> Vec<ImportTarget> {
        let mut targets = Vec::new();
        for rule in self.rules.iter().filter(|r| r.languages.contains(&file.language)) {
            for captures in rule.pattern.captures_iter(file.content) {
                if let Some(block) = captures.name("block") {
                    for quoted in self.quoted.captures_iter(block.as_str()) {
                        if let Some(module) = quoted.get(1) {
                            targets.push(ImportTarget {
                                module: module.as_str().to_string(),
                                symbols: Vec::new(),
                            });
                        }
                    }
                    continue;
                }
                let module = captures.name("module").map(|m| m.as_str()).unwrap_or_default();
                let symbols = captures
                    .name("symbols")
                    .map(|s| clause_symbols(s.as_str()))
                    .unwrap_or_default();
                targets.push(ImportTarget {
                    module: module.to_string(),
                    symbols,
                });
            }
        }
        targets
    }

    /// `imports` edges from every component of an importing file to every
    /// resolved component of another file
    pub(crate) fn infer(&self, snapshot: &Snapshot) -> Vec<Edge> {
        let mut file_index: HashMap<String, Vec<&str>> = HashMap::new();
        for &path in snapshot.by_file.keys() {
            let language = snapshot.files.get(path).map(|f| f.language);
            for key in file_keys(path, language) {
                file_index.entry(key).or_default().push(path);
            }
        }

        let importers: Vec<&str> = snapshot.by_file.keys().copied().collect();
        let per_file: Vec<Vec<Edge>> = importers
            .par_iter()
            .map(|&path| {
                let Some(file) = snapshot.files.get(path) else {
                    return Vec::new();
                };
                let mut targets: BTreeSet<usize> = BTreeSet::new();
                for import in self.imports(file) {
                    let mut keys = module_keys(&import.module, file.language);
                    if file.language == Python {
                        keys.extend(import.symbols.iter().cloned());
                    }
                    for key in &keys {
                        for &target_file in file_index.get(key).into_iter().flatten() {
                            if target_file != path {
                                targets.extend(snapshot.by_file[target_file].iter().copied());
                            }
                        }
                    }
                    for symbol in &import.symbols {
                        targets.extend(
                            snapshot
                                .named(symbol)
                                .iter()
                                .copied()
                                .filter(|&idx| snapshot.component(idx).source.file != path),
                        );
                    }
                }

                let sources = &snapshot.by_file[path];
                let mut edges = Vec::with_capacity(sources.len() * targets.len());
                for &from in sources {
                    for &to in &targets {
                        edges.push(snapshot.edge(from, to, EdgeLabel::Imports));
                    }
                }
                edges
            })
            .collect();

        per_file.into_iter().flatten().collect()
    }
}

/// `references` edges: an eligible name from another file appears as a
/// token in a component's body
pub(crate) fn references(snapshot: &Snapshot) -> Vec<Edge> {
    let per_component: Vec<Vec<Edge>> = (0..snapshot.components.len())
        .into_par_iter()
        .map(|from| {
            let targets: BTreeSet<usize> = snapshot.bodies[from]
                .tokens()
                .flat_map(|token| snapshot.named(token).iter().copied())
                .filter(|&to| !snapshot.same_file(from, to))
                .collect();
            targets
                .into_iter()
                .map(|to| snapshot.edge(from, to, EdgeLabel::References))
                .collect()
        })
        .collect();

    per_component.into_iter().flatten().collect()
}

/// Symbol names listed in an import clause such as `{ A, B as C }` or `(X, Y)`
fn clause_symbols(clause: &str) -> Vec<String> {
    crate::core::detectors::text::identifiers(clause)
        .map(|(_, token)| token)
        .filter(|token| !CLAUSE_KEYWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Names a file can be imported by: its stem, plus its directory for
/// index-like stems and Go packages
fn file_keys(path: &str, language: Option<Language>) -> Vec<String> {
    let path = Path::new(path);
    let mut keys = Vec::new();
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return keys;
    };
    keys.push(stem.to_string());

    if DIRECTORY_STEMS.contains(&stem) || language == Some(Go) {
        if let Some(dir) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|d| d.to_str())
        {
            if dir != stem {
                keys.push(dir.to_string());
            }
        }
    }
    keys
}

/// File keys an import module string may resolve to
fn module_keys(module: &str, language: Language) -> Vec<String> {
    let module = module.trim();
    let path_like = matches!(language, TypeScript | JavaScript | Go | Ruby | Protobuf);
    if path_like || module.contains('/') || module.contains('\\') {
        let Some(last) = module
            .rsplit(['/', '\\'])
            .find(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        else {
            return Vec::new();
        };
        let last_path = Path::new(last);
        let key = match Language::classify(last_path) {
            Some(_) => last_path.file_stem().and_then(|s| s.to_str()).unwrap_or(last),
            None => last,
        };
        return vec![key.to_string()];
    }

    let segments: Vec<&str> = module
        .split("::")
        .flat_map(|part| part.split('.'))
        .filter(|seg| !seg.is_empty() && !ROOT_SEGMENTS.contains(seg))
        .collect();
    let mut keys: Vec<String> = segments.last().map(|s| s.to_string()).into_iter().collect();
    if language == Rust && segments.len() >= 2 {
        keys.push(segments[segments.len() - 2].to_string());
    }
    keys
}
