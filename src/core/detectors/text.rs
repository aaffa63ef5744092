//! Text heuristics shared by the detectors: line lookup, block extents,
//! field lists and payload type extraction. None of this builds a syntax
//! tree; every function degrades to a shorter or empty answer.

use regex::Regex;
use std::collections::HashSet;

use crate::core::language::Language;

/// A source file prepared for pattern matching
pub struct FileText<'a> {
    pub path: &'a str,
    pub language: Language,
    pub content: &'a str,
    pub lines: Vec<&'a str>,
    line_starts: Vec<usize>,
}

impl<'a> FileText<'a> {
    pub fn new(path: &'a str, language: Language, content: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            path,
            language,
            content,
            lines: content.lines().collect(),
            line_starts,
        }
    }

    /// 0-based line index containing a byte offset
    pub fn line_index(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// 1-based line number containing a byte offset
    pub fn line_number(&self, offset: usize) -> u32 {
        self.line_index(offset) as u32 + 1
    }

    /// Lines `start..=end` (0-based, clamped) joined with newlines
    pub fn slice(&self, start: usize, end: usize) -> String {
        if self.lines.is_empty() || start >= self.lines.len() {
            return String::new();
        }
        let end = end.min(self.lines.len() - 1);
        self.lines[start..=end].join("\n")
    }

    /// 0-based index of the last line of the block starting at `start`
    pub fn block_end(&self, start: usize, max_lines: usize) -> usize {
        block_end(&self.lines, start, self.language, max_lines)
    }
}

/// Find where the construct declared on line `start` ends.
///
/// Brace languages match braces from the first `{`; a statement that closes
/// its parentheses or hits `;` before any `{` ends on that line. Python and
/// Ruby use indentation below the declaration header.
pub fn block_end(lines: &[&str], start: usize, language: Language, max_lines: usize) -> usize {
    if start >= lines.len() {
        return start;
    }
    let limit = lines.len().min(start + max_lines.max(1));
    if language.is_indent_scoped() {
        indent_block_end(lines, start, limit, language)
    } else {
        brace_block_end(lines, start, limit, language)
    }
}

const BRACE_LOOKAHEAD: usize = 12;

fn brace_block_end(lines: &[&str], start: usize, limit: usize, language: Language) -> usize {
    let mut depth: i32 = 0;
    let mut parens: i32 = 0;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().take(limit).skip(start) {
        let trimmed = line.trim_start();
        let is_attribute =
            trimmed.starts_with('@') || trimmed.starts_with("#[") || trimmed.starts_with('[');
        let mut parens_opened_here = false;

        for ch in code_chars(line, language) {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => {
                    depth -= 1;
                    if opened && depth <= 0 {
                        return i;
                    }
                }
                '(' => {
                    parens += 1;
                    parens_opened_here = true;
                }
                ')' => parens -= 1,
                ';' if !opened && depth == 0 => return i,
                _ => {}
            }
        }

        if !opened && !is_attribute && parens_opened_here && parens <= 0 {
            return i;
        }
        if !opened && i >= start + BRACE_LOOKAHEAD {
            return start;
        }
    }

    if opened {
        limit.saturating_sub(1).max(start)
    } else {
        start
    }
}

/// Characters of a line outside string literals and line comments
fn code_chars(line: &str, language: Language) -> Vec<char> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        i += 1;
        if let Some(q) = quote {
            if ch == '\\' {
                i += 1;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '`' => quote = Some(ch),
            // lifetimes and labels stay as code
            '\'' if matches!(language, Language::Rust) => i += char_literal_len(&chars[i..]),
            '\'' => quote = Some(ch),
            '/' if chars.get(i) == Some(&'/') => break,
            '#' if matches!(language, Language::GraphQl) => break,
            _ => out.push(ch),
        }
    }

    out
}

/// Length of a Rust char literal after its opening quote, or 0 when the
/// quote starts a lifetime such as `'a`
fn char_literal_len(rest: &[char]) -> usize {
    match rest {
        ['\\', _, tail @ ..] => tail.iter().position(|&c| c == '\'').map_or(0, |p| p + 3),
        [_, '\'', ..] => 2,
        _ => 0,
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_indent_header(line: &str, language: Language) -> bool {
    let trimmed = line.trim();
    match language {
        Language::Python => {
            trimmed.starts_with("def ")
                || trimmed.starts_with("async def ")
                || trimmed.starts_with("class ")
        }
        _ => {
            trimmed.starts_with("def ")
                || trimmed.starts_with("class ")
                || trimmed.starts_with("module ")
                || trimmed.ends_with(" do")
                || trimmed.contains(" do |")
        }
    }
}

fn indent_block_end(lines: &[&str], start: usize, limit: usize, language: Language) -> usize {
    let mut header = start;
    while header < limit && lines[header].trim_start().starts_with('@') {
        header += 1;
    }
    if header >= limit || !is_indent_header(lines[header], language) {
        return start;
    }

    let base = indent_of(lines[header]);
    let mut end = header;
    for (i, line) in lines.iter().enumerate().take(limit).skip(header + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) > base {
            end = i;
        } else {
            if language == Language::Ruby && indent_of(line) == base && line.trim() == "end" {
                end = i;
            }
            break;
        }
    }
    end
}

/// Iterate identifier tokens (`[A-Za-z_][A-Za-z0-9_]*`) in order
pub fn identifiers(text: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    let bytes = text.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() {
            let b = bytes[i];
            if b.is_ascii_alphabetic() || b == b'_' {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                return Some((start, &text[start..i]));
            }
            if b.is_ascii_digit() {
                // skip the tail of numeric literals like 0x1F
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                continue;
            }
            i += 1;
        }
        None
    })
}

/// The set of identifier tokens in a text
pub fn token_set(text: &str) -> HashSet<&str> {
    identifiers(text).map(|(_, token)| token).collect()
}

/// Type names that never count as payloads
const NON_PAYLOAD_TYPES: &[&str] = &[
    "str", "int", "float", "dict", "list", "none", "bool", "any", "bytes", "object", "string",
    "number", "void", "undefined", "optional", "union", "integer", "long", "double", "boolean",
    "char", "short", "byte", "decimal", "uuid", "date", "datetime", "instant", "promise", "vec",
    "option", "result", "box", "arc", "rc", "map", "set", "hashmap", "btreemap", "hashset",
    "array", "iterable", "sequence", "observable", "future", "task", "mono", "flux", "request",
    "response", "responseentity", "httpresponse", "httprequest", "jsonresponse", "actionresult",
    "iactionresult", "json", "path", "query", "form", "body", "state", "extension", "depends",
    "session", "asyncsession", "context", "ctx", "error", "exception", "self", "cls",
    "nextfunction", "next", "req", "res", "http", "writer", "responsewriter", "impl",
    "intoresponse", "statuscode", "page", "pageable", "principal", "authentication", "background",
    "backgroundtasks", "id", "pathvariable", "requestbody", "requestparam", "valid", "validated",
    "partial", "readonly", "record", "pick", "omit", "type", "typing", "annotated", "awaitable",
    "generator", "asynciterator", "streamingresponse",
];

fn is_payload_candidate(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && !NON_PAYLOAD_TYPES.contains(&name.to_ascii_lowercase().as_str())
}

/// Normalize a raw type expression into payload type names: splits unions,
/// unwraps generics, strips module prefixes, drops primitives and wrappers.
pub fn normalize_types(raw: &str) -> Vec<String> {
    payload_types(raw)
}

/// Capitalized, non-wrapper type names mentioned in a signature fragment.
/// Names directly after `@` (annotations) are skipped.
pub fn payload_types(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut names: Vec<String> = identifiers(text)
        .filter(|&(start, _)| start == 0 || bytes[start - 1] != b'@')
        .map(|(_, token)| token)
        .filter(|token| is_payload_candidate(token))
        .map(|token| token.to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Join lines from `start` until the first balanced parameter list and a
/// body/terminator is reached. Used to capture multi-line signatures.
pub fn signature_from(lines: &[&str], start: usize) -> String {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut seen_paren = false;

    for line in lines.iter().skip(start).take(8) {
        parts.push(line.trim());
        for ch in line.chars() {
            match ch {
                '(' => {
                    depth += 1;
                    seen_paren = true;
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        let trimmed = line.trim_end();
        if seen_paren
            && depth <= 0
            && (trimmed.ends_with('{')
                || trimmed.ends_with(':')
                || trimmed.ends_with("=>")
                || trimmed.ends_with(';')
                || trimmed.contains("=> {")
                || trimmed.ends_with(')'))
        {
            break;
        }
    }

    parts.join(" ")
}

/// Split a signature into (parameter text, return type text)
pub fn split_signature(signature: &str, language: Language) -> (String, String) {
    let mut sig = signature;

    // Go method receivers come before the name: `func (s *Svc) Name(...)`
    if language == Language::Go {
        if let Some(rest) = sig.trim_start().strip_prefix("func") {
            let rest = rest.trim_start();
            if rest.starts_with('(') {
                if let Some(close) = matching_paren(rest, 0) {
                    sig = &rest[close + 1..];
                }
            }
        }
    }

    let Some(open) = sig.find('(') else {
        return (String::new(), String::new());
    };
    let Some(close) = matching_paren(sig, open) else {
        return (sig[open + 1..].to_string(), String::new());
    };

    let params = sig[open + 1..close].to_string();
    let after = sig[close + 1..].trim();
    let after = after
        .split(['{', '='])
        .next()
        .unwrap_or("")
        .trim_start_matches("->")
        .trim_start_matches(':')
        .trim()
        .trim_end_matches(':')
        .trim();

    let returns = match language {
        // return type precedes the method name
        Language::Java | Language::CSharp => {
            let before = sig[..open].trim_end();
            let before = before
                .char_indices()
                .rev()
                .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
                .map(|(i, c)| &before[..i + c.len_utf8()])
                .unwrap_or("");
            before.to_string()
        }
        _ => after.to_string(),
    };

    (params, returns)
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, ch) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// How a model's declared members are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStyle {
    /// `name: Type` members inside braces (TS, Rust)
    ColonMembers,
    /// GraphQL SDL fields, which may take arguments
    SdlFields,
    /// `Name Type` lines inside braces (Go)
    GoStruct,
    /// `Type name = N;` (protobuf)
    ProtoFields,
    /// Enum variants inside braces
    Variants,
    /// `Type name;` fields and `Type Name { get; set; }` properties
    TypedFields,
    /// Constructor parameters: records, data classes
    Params,
    /// Indented `name: Type` / `name = Column(...)` class attributes
    PythonAttributes,
    /// No field extraction
    Skip,
}

/// Extract declared field names, in order, from a model block
pub fn extract_fields(lines: &[&str], start: usize, end: usize, style: FieldStyle) -> Vec<String> {
    if start >= lines.len() {
        return Vec::new();
    }
    let end = end.min(lines.len() - 1).max(start);
    let block = lines[start..=end].join("\n");

    let fields = match style {
        FieldStyle::Skip => Vec::new(),
        FieldStyle::Params => param_fields(&block),
        FieldStyle::PythonAttributes => python_fields(&lines[start..=end]),
        _ => {
            let members = top_level_members(&block);
            members
                .iter()
                .filter_map(|member| member_field(member, style))
                .collect()
        }
    };

    let mut seen = HashSet::new();
    fields.into_iter().filter(|f| seen.insert(f.clone())).collect()
}

/// Member segments at depth 1 of the first brace block, nested blocks removed
fn top_level_members(block: &str) -> Vec<String> {
    let Some(open) = block.find('{') else {
        return Vec::new();
    };

    let mut members = Vec::new();
    let mut current = String::new();
    let mut depth = 1;
    let mut parens = 0;
    let mut chars = block[open + 1..].chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '(' if depth == 1 => {
                parens += 1;
                current.push(ch);
            }
            ')' if depth == 1 => {
                parens -= 1;
                current.push(ch);
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            '/' if depth == 1 && chars.peek() == Some(&'/') => {
                // drop the rest of a line comment
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                members.push(std::mem::take(&mut current));
            }
            '\n' | ';' | ',' if depth == 1 && parens <= 0 => {
                members.push(std::mem::take(&mut current))
            }
            _ if depth == 1 => current.push(ch),
            _ => {}
        }
    }
    members.push(current);

    members
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .filter(|m| {
            !(m.starts_with("//")
                || m.starts_with("/*")
                || m.starts_with('*')
                || m.starts_with('#')
                || m.starts_with('@')
                || m.starts_with('['))
        })
        .collect()
}

const MEMBER_MODIFIERS: &[&str] = &[
    "pub", "readonly", "public", "private", "protected", "internal", "static", "final",
    "optional", "repeated", "required", "declare", "abstract", "override", "transient",
    "volatile", "virtual", "const", "let", "var", "val",
];

fn member_field(member: &str, style: FieldStyle) -> Option<String> {
    let member = strip_annotations(member);
    let member = member.trim();
    // `pub(crate) name: T`
    let member = member
        .strip_prefix("pub(crate)")
        .or_else(|| member.strip_prefix("pub(super)"))
        .unwrap_or(member)
        .trim();

    match style {
        FieldStyle::ColonMembers => {
            let mut tokens = identifiers(member).peekable();
            let (mut start, mut name) = tokens.next()?;
            while MEMBER_MODIFIERS.contains(&name) {
                (start, name) = tokens.next()?;
            }
            let rest = member[start + name.len()..].trim_start();
            let rest = rest.trim_start_matches(['?', '!']).trim_start();
            if rest.starts_with(':') || rest.is_empty() {
                Some(name.to_string())
            } else {
                None
            }
        }
        FieldStyle::SdlFields => {
            // `user(id: ID!): User` counts as a field
            let (start, name) = identifiers(member).next()?;
            let rest = member[start + name.len()..].trim_start();
            if rest.starts_with(':') || rest.starts_with('(') || rest.is_empty() {
                Some(name.to_string())
            } else {
                None
            }
        }
        FieldStyle::GoStruct => {
            let tokens: Vec<&str> = identifiers(member).map(|(_, t)| t).collect();
            if tokens.len() >= 2 && !member.starts_with('*') {
                Some(tokens[0].to_string())
            } else {
                None
            }
        }
        FieldStyle::ProtoFields => {
            let first = identifiers(member).next()?.1;
            if matches!(
                first,
                "option" | "reserved" | "message" | "enum" | "oneof" | "extensions" | "map"
            ) && !member.contains('=')
            {
                return None;
            }
            let before_eq = member.split('=').next()?;
            if before_eq.len() == member.len() {
                return None;
            }
            identifiers(before_eq).last().map(|(_, t)| t.to_string())
        }
        FieldStyle::Variants => {
            let (_, name) = identifiers(member).next()?;
            if MEMBER_MODIFIERS.contains(&name) {
                return None;
            }
            Some(name.to_string())
        }
        FieldStyle::TypedFields => {
            if member.contains('(') {
                return None;
            }
            let before_eq = member.split('=').next().unwrap_or(member);
            let tokens: Vec<&str> = identifiers(before_eq)
                .map(|(_, t)| t)
                .filter(|t| !MEMBER_MODIFIERS.contains(t))
                .collect();
            if tokens.len() >= 2 {
                tokens.last().map(|t| t.to_string())
            } else {
                None
            }
        }
        FieldStyle::Params | FieldStyle::PythonAttributes | FieldStyle::Skip => None,
    }
}

/// Remove `@Annotation(...)` prefixes from a member or parameter
fn strip_annotations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '@' {
            while chars.peek().is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.') {
                chars.next();
            }
            if chars.peek() == Some(&'(') {
                let mut depth = 0;
                for c in chars.by_ref() {
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}

fn param_fields(block: &str) -> Vec<String> {
    let Some(open) = block.find('(') else {
        return Vec::new();
    };
    let Some(close) = matching_paren(block, open) else {
        return Vec::new();
    };

    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    for ch in block[open + 1..close].chars() {
        match ch {
            '(' | '<' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | '>' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => params.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    params.push(current);

    params
        .iter()
        .filter_map(|param| {
            let param = strip_annotations(param);
            let param = param.split('=').next().unwrap_or("").trim().to_string();
            if param.is_empty() {
                return None;
            }
            if let Some(colon) = param.find(':') {
                identifiers(&param[..colon])
                    .map(|(_, t)| t)
                    .filter(|t| !MEMBER_MODIFIERS.contains(t))
                    .last()
                    .map(|t| t.to_string())
            } else {
                let tokens: Vec<&str> = identifiers(&param).map(|(_, t)| t).collect();
                if tokens.len() >= 2 {
                    tokens.last().map(|t| t.to_string())
                } else {
                    None
                }
            }
        })
        .collect()
}

fn python_fields(lines: &[&str]) -> Vec<String> {
    let Some(header) = lines.iter().position(|l| l.trim_start().starts_with("class ")) else {
        return Vec::new();
    };
    let base = indent_of(lines[header]);
    let mut level: Option<usize> = None;
    let mut in_docstring = false;
    let mut fields = Vec::new();

    for line in &lines[header + 1..] {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indent = indent_of(line);
        if indent <= base {
            break;
        }
        let quotes = trimmed.matches("\"\"\"").count() + trimmed.matches("'''").count();
        if in_docstring {
            if quotes % 2 == 1 {
                in_docstring = false;
            }
            continue;
        }
        if quotes % 2 == 1 {
            in_docstring = true;
            continue;
        }
        let level = *level.get_or_insert(indent);
        if indent != level
            || trimmed.starts_with('#')
            || trimmed.starts_with('@')
            || trimmed.starts_with("def ")
            || trimmed.starts_with("async def ")
            || trimmed.starts_with("class ")
        {
            continue;
        }

        let mut tokens = identifiers(trimmed);
        let Some((start, name)) = tokens.next() else {
            continue;
        };
        if start != 0 {
            continue;
        }
        let rest = trimmed[name.len()..].trim_start();
        let is_annotation = rest.starts_with(':');
        let is_column = rest.starts_with('=')
            && ["models.", "Column", "mapped_column", "Field", "relationship", "fields."]
                .iter()
                .any(|marker| rest[1..].trim_start().starts_with(marker));
        if (is_annotation || is_column) && name != "model_config" && name != "Config" {
            fields.push(name.to_string());
        }
    }

    fields
}

/// Locates function and method declarations by name. Every alternative
/// captures the declared name in its only group.
pub struct DeclarationFinder {
    pattern: Regex,
}

impl DeclarationFinder {
    pub fn new() -> Result<Self, regex::Error> {
        const NAME: &str = r"([A-Za-z_$][\w$]*)";
        let pattern = [
            format!(
                r"^[ \t]*(?:export\s+)?(?:default\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:function\s*\*?\s*{NAME}\b|(?:const|let|var)\s+{NAME}\s*[:=]|def\s+(?:self\.)?{NAME}\b|fn\s+{NAME}\b|func\s+(?:\([^)]*\)\s*)?{NAME}\s*\()"
            ),
            // typed methods need a modifier so call sites never match
            format!(
                r"^[ \t]*(?:(?:public|private|protected|internal|static|override|async|final|virtual)\s+)+(?:[\w<>\[\],.?]+\s+)*{NAME}\s*\("
            ),
            format!(r"^[ \t]*(?:async\s+)?{NAME}\s*\([^)\n]*\)\s*(?::[^{{\n]*)?\{{"),
        ]
        .join("|");
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// 0-based line of the declaration of function `name`, if the file has one
    pub fn find(&self, file: &FileText, name: &str) -> Option<usize> {
        file.lines.iter().position(|line| {
            self.pattern.captures(line).is_some_and(|captures| {
                captures
                    .iter()
                    .skip(1)
                    .flatten()
                    .any(|declared| declared.as_str() == name)
            })
        })
    }
}

/// First line at or after `start` that is not blank or an attribute,
/// searched within a short window
pub fn header_after(lines: &[&str], start: usize) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(start)
        .take(12)
        .find(|(_, line)| {
            let trimmed = line.trim_start();
            !(trimmed.is_empty()
                || trimmed.starts_with('@')
                || trimmed.starts_with("#[")
                || trimmed.starts_with('[')
                || trimmed.starts_with(')'))
        })
        .map(|(i, _)| i)
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn test_line_number_lookup() {
        let text = FileText::new("a.ts", Language::TypeScript, "one\ntwo\nthree\n");
        assert_eq!(text.line_number(0), 1);
        assert_eq!(text.line_number(4), 2);
        assert_eq!(text.line_number(8), 3);
    }

    #[test]
    fn test_brace_block_end() {
        let src = indoc! {r#"
            export interface User {
              id: string;
              profile: { bio: string };
            }
            const x = 1;
        "#};
        assert_eq!(block_end(&lines(src), 0, Language::TypeScript, 100), 3);
    }

    #[test]
    fn test_statement_ends_on_its_line() {
        let src = "router.get(\"/users\", handler)\nfunction handler() {\n}\n";
        assert_eq!(block_end(&lines(src), 0, Language::JavaScript, 100), 0);
        let src = "type Id = string;\n";
        assert_eq!(block_end(&lines(src), 0, Language::TypeScript, 100), 0);
    }

    #[test]
    fn test_attribute_line_extends_to_method() {
        let src = indoc! {r#"
            @GetMapping("/users")
            public List<User> list() {
                return repo.findAll();
            }
        "#};
        assert_eq!(block_end(&lines(src), 0, Language::Java, 100), 3);
    }

    #[test]
    fn test_braces_in_strings_are_ignored() {
        let src = "fn render() {\n    let s = \"}\";\n}\n";
        assert_eq!(block_end(&lines(src), 0, Language::Rust, 100), 2);
    }

    #[test]
    fn test_rust_char_literals_are_not_braces() {
        let src = indoc! {r#"
            pub fn to_token<'a>(s: &'a str) -> Token {
                let open = '{';
                let quote = '\'';
                let close = '\u{7d}';
                Token { open, quote, close }
            }

            pub struct After {
                x: u8,
            }
        "#};
        assert_eq!(block_end(&lines(src), 0, Language::Rust, 100), 5);
        assert_eq!(code_chars("impl<'a> Iterator for Iter<'a> {", Language::Rust).last(), Some(&'{'));
    }

    #[test]
    fn test_python_indent_block() {
        let src = indoc! {r#"
            @app.get("/items")
            async def list_items(db: Session):
                items = db.query(Item)

                return items
            other = 1
        "#};
        assert_eq!(block_end(&lines(src), 0, Language::Python, 100), 4);
    }

    #[test]
    fn test_ts_fields_in_order() {
        let src = indoc! {r#"
            interface User {
              id: string;
              name?: string; // display name
              readonly tags: string[];
              address: { city: string };
              greet(): void;
            }
        "#};
        let l = lines(src);
        let end = block_end(&l, 0, Language::TypeScript, 100);
        assert_eq!(
            extract_fields(&l, 0, end, FieldStyle::ColonMembers),
            vec!["id", "name", "tags", "address"]
        );
    }

    #[test]
    fn test_single_line_bare_members() {
        let l = vec!["interface User { id; name }"];
        assert_eq!(extract_fields(&l, 0, 0, FieldStyle::ColonMembers), vec!["id", "name"]);
    }

    #[test]
    fn test_rust_struct_fields() {
        let src = indoc! {r#"
            pub struct Order {
                #[serde(default)]
                pub id: u64,
                pub(crate) items: Vec<Item>,
                total: f64,
            }
        "#};
        let l = lines(src);
        assert_eq!(
            extract_fields(&l, 0, 5, FieldStyle::ColonMembers),
            vec!["id", "items", "total"]
        );
    }

    #[test]
    fn test_go_and_proto_fields() {
        let go = lines("type User struct {\n\tID   string `json:\"id\"`\n\tName string\n\tBase\n}");
        assert_eq!(extract_fields(&go, 0, 4, FieldStyle::GoStruct), vec!["ID", "Name"]);

        let proto = lines("message User {\n  string id = 1;\n  repeated string tags = 2;\n  reserved 3;\n}");
        assert_eq!(extract_fields(&proto, 0, 4, FieldStyle::ProtoFields), vec!["id", "tags"]);
    }

    #[test]
    fn test_record_params() {
        let java = vec!["public record User(@NotNull String id, List<String> roles) {}"];
        assert_eq!(extract_fields(&java, 0, 0, FieldStyle::Params), vec!["id", "roles"]);

        let kotlin = vec!["data class User(val id: String, var name: String = \"\")"];
        assert_eq!(extract_fields(&kotlin, 0, 0, FieldStyle::Params), vec!["id", "name"]);
    }

    #[test]
    fn test_typed_fields_and_properties() {
        let src = indoc! {r#"
            public class User {
                @Id
                private Long id;
                private String email = "";
                public string Name { get; set; }
                public User() { }
            }
        "#};
        let l = lines(src);
        assert_eq!(
            extract_fields(&l, 0, 6, FieldStyle::TypedFields),
            vec!["id", "email", "Name"]
        );
    }

    #[test]
    fn test_python_attributes() {
        let src = indoc! {r#"
            class Message(BaseModel):
                """A chat message."""
                id: int
                content: str = ""
                author = Column(String)

                def summary(self) -> str:
                    length: int = 3
                    return self.content
        "#};
        let l = lines(src);
        assert_eq!(
            extract_fields(&l, 0, l.len() - 1, FieldStyle::PythonAttributes),
            vec!["id", "content", "author"]
        );
    }

    #[test]
    fn test_enum_variants() {
        let l = lines("enum Role {\n  Admin = \"admin\",\n  Member,\n}");
        assert_eq!(extract_fields(&l, 0, 3, FieldStyle::Variants), vec!["Admin", "Member"]);
    }

    #[test]
    fn test_payload_types() {
        assert_eq!(
            normalize_types("list[schemas.Message] | None"),
            vec!["Message".to_string()]
        );
        assert_eq!(
            payload_types("@RequestBody CreateUser body, Principal who"),
            vec!["CreateUser".to_string()]
        );
        assert_eq!(payload_types("Promise<Array<UserDto>>"), vec!["UserDto".to_string()]);
    }

    #[test]
    fn test_split_signature() {
        let (params, ret) =
            split_signature("async def create(body: NewUser, db: Session) -> User:", Language::Python);
        assert!(params.contains("NewUser"));
        assert_eq!(ret, "User");

        let (params, ret) = split_signature(
            "public ResponseEntity<UserDto> create(@RequestBody CreateUser req) {",
            Language::Java,
        );
        assert!(params.contains("CreateUser"));
        assert!(ret.contains("UserDto"));

        let (params, ret) = split_signature(
            "func (h *Handler) Create(w http.ResponseWriter, in NewOrder) (Order, error) {",
            Language::Go,
        );
        assert!(params.contains("NewOrder"));
        assert!(ret.contains("Order"));
    }

    #[test]
    fn test_split_signature_non_ascii_method_name() {
        let (params, ret) =
            split_signature("public User getRésumé(Ünique id) {", Language::Java);
        assert_eq!(ret, "public User ");
        assert!(params.contains("Ünique"));

        let (_, ret) = split_signature("public Résumé Get() {", Language::CSharp);
        assert_eq!(ret, "public Résumé ");
    }

    #[test]
    fn test_signature_spans_lines() {
        let l = lines("def create(\n    body: NewUser,\n) -> User:\n    pass");
        assert_eq!(signature_from(&l, 0), "def create( body: NewUser, ) -> User:");
    }

    #[test]
    fn test_declaration_finder() {
        let src = indoc! {r#"
            router.get("/users", listUsers);

            export async function listUsers(req, res) {
              res.json([]);
            }
        "#};
        let finder = DeclarationFinder::new().unwrap();
        let file = FileText::new("routes.js", Language::JavaScript, src);
        assert_eq!(finder.find(&file, "listUsers"), Some(2));
        assert_eq!(finder.find(&file, "missing"), None);

        let go = "package h\n\nfunc (h *Handler) List(w http.ResponseWriter) {\n}\n";
        let file = FileText::new("h.go", Language::Go, go);
        assert_eq!(finder.find(&file, "List"), Some(2));

        let java = "class C {\n    String x = list();\n    public List<User> list() {\n    }\n}\n";
        let file = FileText::new("C.java", Language::Java, java);
        assert_eq!(finder.find(&file, "list"), Some(2));
    }

    #[test]
    fn test_header_after_skips_attributes() {
        let l = lines("@Get(':id')\n@UseGuards(AuthGuard)\nasync findOne(id: string) {\n}");
        assert_eq!(header_after(&l, 0), 2);
    }

    #[test]
    fn test_identifiers_skip_numbers() {
        let tokens: Vec<&str> = identifiers("x1 = 0xFF + user_id(2)").map(|(_, t)| t).collect();
        assert_eq!(tokens, vec!["x1", "user_id"]);
    }
}
