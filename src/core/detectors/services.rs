//! Service detection: annotated controllers and injectables, framework view
//! classes, task functions, and a directory-convention fallback.

use regex::Regex;

use super::text::{payload_types, signature_from, split_signature, FileText};
use super::{Candidate, ComponentDetector, DETECTION_KEY, DIRECTORY_CONVENTION};
use crate::config::DetectionConfig;
use crate::core::language::Language;
use crate::core::schema::ComponentKind;
use crate::error::Result;

use Language::*;

const ANNOTATED: &[Language] = &[TypeScript, JavaScript, Java, Kotlin];

/// What a matched rule declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declares {
    Class,
    Function,
}

struct ServiceRule {
    name: &'static str,
    languages: &'static [Language],
    pattern: Regex,
    declares: Declares,
    worker: bool,
}

impl ServiceRule {
    fn new(
        name: &'static str,
        languages: &'static [Language],
        pattern: &str,
        declares: Declares,
    ) -> Result<Self> {
        Ok(Self {
            name,
            languages,
            pattern: Regex::new(pattern)?,
            declares,
            worker: false,
        })
    }

    fn worker(mut self) -> Self {
        self.worker = true;
        self
    }
}

pub struct ServiceDetector {
    explicit: Vec<ServiceRule>,
    conventional: Vec<ServiceRule>,
    service_dirs: Vec<String>,
    worker_dirs: Vec<String>,
    max_lines: usize,
}

impl ServiceDetector {
    pub fn new(config: &DetectionConfig, max_lines: usize) -> Result<Self> {
        let explicit = vec![
            ServiceRule::new(
                "decorator",
                ANNOTATED,
                r"(?m)^[ \t]*@(?:Controller|RestController|Injectable|Service|Component|Repository)\b[^\n]*\n(?:[ \t]*@[^\n]*\n)*[ \t]*(?:export\s+)?(?:default\s+)?(?:(?:public|abstract|open|internal|final)\s+)*class\s+(?P<name>\w+)",
                Declares::Class,
            )?,
            ServiceRule::new(
                "decorator",
                &[Python],
                r"(?m)^[ \t]*class\s+(?P<name>\w+)\s*\([^)]*\b\w*(?:Resource|View|ViewSet)\b[^)]*\)",
                Declares::Class,
            )?,
            ServiceRule::new(
                "decorator",
                &[CSharp],
                r"(?m)^[ \t]*\[ApiController\][^\n]*\n(?:[ \t]*\[[^\n]*\n)*[ \t]*(?:(?:public|internal|sealed|partial|abstract)\s+)*class\s+(?P<name>\w+)",
                Declares::Class,
            )?,
            ServiceRule::new(
                "decorator",
                &[CSharp],
                r"(?m)^[ \t]*(?:(?:public|internal|sealed|partial|abstract)\s+)*class\s+(?P<name>\w+)\s*:\s*(?:ControllerBase|Controller)\b",
                Declares::Class,
            )?,
            ServiceRule::new(
                "decorator",
                &[Ruby],
                r"(?m)^[ \t]*class\s+(?P<name>\w+)\s*<\s*(?:ApplicationController|ActionController::(?:Base|API))\b",
                Declares::Class,
            )?,
            ServiceRule::new(
                "decorator",
                &[Python],
                r"(?m)^[ \t]*@(?:celery\.task|app\.task|shared_task)\b[^\n]*\n(?:[ \t]*@[^\n]*\n)*[ \t]*(?:async\s+)?def\s+(?P<name>\w+)",
                Declares::Function,
            )?
            .worker(),
        ];

        let conventional = vec![
            ServiceRule::new(
                DIRECTORY_CONVENTION,
                &[TypeScript, JavaScript, Python, Java, Kotlin, CSharp, Ruby],
                r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:(?:public|internal|abstract|final|open|sealed|partial|static)\s+)*class\s+(?P<name>[A-Za-z]\w*)",
                Declares::Class,
            )?,
            ServiceRule::new(
                DIRECTORY_CONVENTION,
                &[TypeScript, JavaScript],
                r"(?m)^[ \t]*export\s+(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>\w+)",
                Declares::Function,
            )?,
            ServiceRule::new(
                DIRECTORY_CONVENTION,
                &[TypeScript, JavaScript],
                r"(?m)^[ \t]*export\s+const\s+(?P<name>\w+)\s*(?::[^=\n]+)?=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*(?::[^=\n]+)?=>",
                Declares::Function,
            )?,
            ServiceRule::new(
                DIRECTORY_CONVENTION,
                &[Python],
                r"(?m)^(?:async\s+)?def\s+(?P<name>[A-Za-z]\w*)",
                Declares::Function,
            )?,
            ServiceRule::new(
                DIRECTORY_CONVENTION,
                &[Go],
                r"(?m)^func\s+(?:\([^)]*\)\s*)?(?P<name>[A-Z]\w*)\s*\(",
                Declares::Function,
            )?,
            ServiceRule::new(
                DIRECTORY_CONVENTION,
                &[Rust],
                r"(?m)^[ \t]*pub\s+(?:async\s+)?fn\s+(?P<name>\w+)",
                Declares::Function,
            )?,
        ];

        let lowercase = |dirs: &[String]| dirs.iter().map(|d| d.to_lowercase()).collect();
        Ok(Self {
            explicit,
            conventional,
            service_dirs: lowercase(&config.service_dirs),
            worker_dirs: lowercase(&config.worker_dirs),
            max_lines,
        })
    }

    /// Directory segments of a relative path, lowercased
    fn directories(path: &str) -> Vec<String> {
        let mut segments: Vec<String> = path.split('/').map(str::to_lowercase).collect();
        segments.pop();
        segments
    }

    fn apply(&self, rule: &ServiceRule, file: &FileText, out: &mut Vec<Candidate>) {
        for captures in rule.pattern.captures_iter(file.content) {
            let Some(name) = captures.name("name") else {
                continue;
            };
            let line = file.line_index(name.start());
            let end = file.block_end(line, self.max_lines);

            let mut candidate = Candidate::new(ComponentKind::Service, name.as_str(), file, line)
                .with_meta(DETECTION_KEY, rule.name)
                .with_end(end);

            if rule.declares == Declares::Function {
                let signature = signature_from(&file.lines, line);
                let (params, returns) = split_signature(&signature, file.language);
                candidate = candidate.with_payloads(payload_types(&params), payload_types(&returns));
            }
            if rule.worker {
                candidate = candidate.with_meta("role", "worker");
            }
            out.push(candidate);
        }
    }
}

impl ComponentDetector for ServiceDetector {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Service
    }

    fn detect(&self, file: &FileText) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for rule in self.explicit.iter().filter(|r| r.languages.contains(&file.language)) {
            self.apply(rule, file, &mut candidates);
        }
        if !candidates.is_empty() {
            return candidates;
        }

        let directories = Self::directories(file.path);
        let Some(directory) = directories
            .iter()
            .find(|segment| self.service_dirs.contains(segment))
        else {
            return candidates;
        };
        let is_worker = directories.iter().any(|segment| self.worker_dirs.contains(segment));

        for rule in self.conventional.iter().filter(|r| r.languages.contains(&file.language)) {
            self.apply(rule, file, &mut candidates);
        }
        for candidate in &mut candidates {
            candidate.metadata.insert("directory".to_string(), directory.clone());
            if is_worker {
                candidate.metadata.insert("role".to_string(), "worker".to_string());
            }
        }

        candidates
    }
}
