//! Maps file paths onto the fixed catalog of recognized languages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Rust,
    Python,
    Go,
    Java,
    Kotlin,
    CSharp,
    Ruby,
    Protobuf,
    GraphQl,
}

impl Language {
    /// Classify a file by its extension. Unrecognized files return `None`
    /// and are never handed to the detectors.
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "rs" => Some(Language::Rust),
            "py" => Some(Language::Python),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            "kt" | "kts" => Some(Language::Kotlin),
            "cs" => Some(Language::CSharp),
            "rb" => Some(Language::Ruby),
            "proto" => Some(Language::Protobuf),
            "graphql" | "gql" => Some(Language::GraphQl),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Protobuf => "protobuf",
            Language::GraphQl => "graphql",
        }
    }

    /// True for the JavaScript family (TS shares every JS pattern)
    pub fn is_js_family(&self) -> bool {
        matches!(self, Language::TypeScript | Language::JavaScript)
    }

    /// True for languages whose blocks are delimited by indentation
    pub fn is_indent_scoped(&self) -> bool {
        matches!(self, Language::Python | Language::Ruby)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(Language::classify(Path::new("src/app.tsx")), Some(Language::TypeScript));
        assert_eq!(Language::classify(Path::new("lib/index.mjs")), Some(Language::JavaScript));
        assert_eq!(Language::classify(Path::new("api/user.proto")), Some(Language::Protobuf));
        assert_eq!(Language::classify(Path::new("schema.gql")), Some(Language::GraphQl));
        assert_eq!(Language::classify(Path::new("build.gradle.kts")), Some(Language::Kotlin));
    }

    #[test]
    fn test_unrecognized_files() {
        assert_eq!(Language::classify(Path::new("README.md")), None);
        assert_eq!(Language::classify(Path::new("Makefile")), None);
        assert_eq!(Language::classify(Path::new("main.RS")), None);
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&Language::GraphQl).unwrap();
        assert_eq!(json, "\"graphql\"");
        assert_eq!(Language::CSharp.to_string(), "csharp");
    }
}
