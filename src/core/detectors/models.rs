//! Data model detection: types, interfaces, structs, enums, data classes
//! and IDL messages, with their declared fields.

use regex::Regex;

use super::text::{extract_fields, FieldStyle, FileText};
use super::{Candidate, ComponentDetector, DETECTION_KEY};
use crate::core::language::Language;
use crate::core::schema::ComponentKind;
use crate::error::Result;

use Language::*;

const JS: &[Language] = &[TypeScript, JavaScript];

/// GraphQL root operation types are transports, not models
const GRAPHQL_ROOT_TYPES: &[&str] = &["Query", "Mutation", "Subscription"];

struct ModelRule {
    name: &'static str,
    languages: &'static [Language],
    pattern: Regex,
    fields: FieldStyle,
}

impl ModelRule {
    fn new(
        name: &'static str,
        languages: &'static [Language],
        pattern: &str,
        fields: FieldStyle,
    ) -> Result<Self> {
        Ok(Self {
            name,
            languages,
            pattern: Regex::new(pattern)?,
            fields,
        })
    }
}

pub struct ModelDetector {
    rules: Vec<ModelRule>,
    max_lines: usize,
}

impl ModelDetector {
    pub fn new(max_lines: usize) -> Result<Self> {
        let rules = vec![
            ModelRule::new(
                "interface",
                JS,
                r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:declare\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)",
                FieldStyle::ColonMembers,
            )?,
            ModelRule::new(
                "type_alias",
                JS,
                r"(?m)^[ \t]*(?:export\s+)?(?:declare\s+)?type\s+(?P<name>[A-Z][\w$]*)\s*(?:<[^=\n]*>)?\s*=",
                FieldStyle::ColonMembers,
            )?,
            ModelRule::new(
                "enum",
                JS,
                r"(?m)^[ \t]*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(?P<name>\w+)",
                FieldStyle::Variants,
            )?,
            ModelRule::new(
                "decorated_class",
                JS,
                r"(?m)^[ \t]*@(?:Entity|Schema|ObjectType)\b[^\n]*\n(?:[ \t]*@[^\n]*\n)*[ \t]*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(?P<name>\w+)",
                FieldStyle::ColonMembers,
            )?,
            ModelRule::new(
                "struct",
                &[Rust],
                r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>\w+)",
                FieldStyle::ColonMembers,
            )?,
            ModelRule::new(
                "enum",
                &[Rust],
                r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>\w+)",
                FieldStyle::Variants,
            )?,
            ModelRule::new(
                "dataclass",
                &[Python],
                r"(?m)^[ \t]*@(?:dataclasses\.)?dataclass\b[^\n]*\n(?:[ \t]*@[^\n]*\n)*[ \t]*class\s+(?P<name>\w+)",
                FieldStyle::PythonAttributes,
            )?,
            ModelRule::new(
                "schema_class",
                &[Python],
                r"(?m)^[ \t]*class\s+(?P<name>\w+)\s*\([^)]*\b(?:BaseModel|Schema|TypedDict|NamedTuple|SQLModel|models\.Model|Base|DeclarativeBase)\b[^)]*\)",
                FieldStyle::PythonAttributes,
            )?,
            ModelRule::new(
                "struct",
                &[Go],
                r"(?m)^[ \t]*type\s+(?P<name>\w+)\s+struct\b",
                FieldStyle::GoStruct,
            )?,
            ModelRule::new(
                "record",
                &[Java],
                r"(?m)^[ \t]*(?:(?:public|private|protected|static|final)\s+)*record\s+(?P<name>\w+)\s*(?:<[^>\n]*>)?\s*\(",
                FieldStyle::Params,
            )?,
            ModelRule::new(
                "entity",
                &[Java],
                r"(?m)^[ \t]*@(?:Entity|Data|Document|Table)\b[^\n]*\n(?:[ \t]*@[^\n]*\n)*[ \t]*(?:(?:public|private|protected|abstract|final)\s+)*class\s+(?P<name>\w+)",
                FieldStyle::TypedFields,
            )?,
            ModelRule::new(
                "data_class",
                &[Kotlin],
                r"(?m)^[ \t]*(?:(?:public|private|internal)\s+)?data\s+class\s+(?P<name>\w+)",
                FieldStyle::Params,
            )?,
            ModelRule::new(
                "record",
                &[CSharp],
                r"(?m)^[ \t]*(?:(?:public|private|internal|protected|sealed|readonly|partial)\s+)*record\s+(?:struct\s+|class\s+)?(?P<name>\w+)",
                FieldStyle::Params,
            )?,
            ModelRule::new(
                "struct",
                &[CSharp],
                r"(?m)^[ \t]*(?:(?:public|private|internal|protected|readonly|partial)\s+)*struct\s+(?P<name>\w+)",
                FieldStyle::TypedFields,
            )?,
            ModelRule::new(
                "active_record",
                &[Ruby],
                r"(?m)^[ \t]*class\s+(?P<name>\w+)\s*<\s*(?:ApplicationRecord|ActiveRecord::Base)\b",
                FieldStyle::Skip,
            )?,
            ModelRule::new(
                "message",
                &[Protobuf],
                r"(?m)^[ \t]*message\s+(?P<name>\w+)\s*\{",
                FieldStyle::ProtoFields,
            )?,
            ModelRule::new(
                "enum",
                &[Protobuf],
                r"(?m)^[ \t]*enum\s+(?P<name>\w+)\s*\{",
                FieldStyle::Variants,
            )?,
            ModelRule::new(
                "sdl_type",
                &[GraphQl],
                r"(?m)^[ \t]*(?:extend\s+)?(?:type|input|interface)\s+(?P<name>\w+)[^{\n]*\{",
                FieldStyle::SdlFields,
            )?,
            ModelRule::new(
                "sdl_enum",
                &[GraphQl],
                r"(?m)^[ \t]*enum\s+(?P<name>\w+)\s*\{",
                FieldStyle::Variants,
            )?,
        ];

        Ok(Self { rules, max_lines })
    }

    fn fields_for(rule: &ModelRule, file: &FileText, line: usize, end: usize, after_name: &str) -> Vec<String> {
        // records without a parameter list declare their members in a body
        let style = match rule.fields {
            FieldStyle::Params if !after_name.trim_start().starts_with(['(', '<']) => {
                FieldStyle::TypedFields
            }
            style => style,
        };
        extract_fields(&file.lines, line, end, style)
    }
}

impl ComponentDetector for ModelDetector {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Model
    }

    fn detect(&self, file: &FileText) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for rule in self.rules.iter().filter(|r| r.languages.contains(&file.language)) {
            for captures in rule.pattern.captures_iter(file.content) {
                let Some(name) = captures.name("name") else {
                    continue;
                };
                if file.language == GraphQl && GRAPHQL_ROOT_TYPES.contains(&name.as_str()) {
                    continue;
                }

                let line = file.line_index(name.start());
                let after_name = &file.content[name.end()..];
                let end = file.block_end(line, self.max_lines);
                let fields = Self::fields_for(rule, file, line, end, after_name);

                let mut candidate = Candidate::new(ComponentKind::Model, name.as_str(), file, line)
                    .with_meta(DETECTION_KEY, rule.name)
                    .with_end(end);
                if !fields.is_empty() {
                    candidate.model_fields = Some(fields);
                }
                candidates.push(candidate);
            }
        }

        candidates
    }
}
