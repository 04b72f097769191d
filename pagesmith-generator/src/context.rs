//! Generation context: the serializable rendering payload built from a
//! [`GenerationRequest`].

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::attachments;
use crate::error::GenerateError;
use crate::GenerationRequest;

/// Everything the templates can see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    pub identity: IdentityCtx,
    pub brief: BriefCtx,
    /// Checks in the order the caller listed them.
    pub checks: Vec<CheckCtx>,
    /// Elements the checks refer to by `#id`, first mention first.
    pub elements: Vec<ElementCtx>,
    pub attachments: Vec<AttachmentCtx>,
    pub license: LicenseCtx,
    pub meta: MetaCtx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCtx {
    pub task: String,
    pub round: u32,
    /// Human title derived from the task id (`quiz-app` → `Quiz App`).
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefCtx {
    pub text: String,
    pub summary: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckCtx {
    /// 1-based position.
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementCtx {
    pub id: String,
    /// `button`, `input`, or `div`.
    pub tag: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentCtx {
    pub name: String,
    /// Where the page links to: the inlined file, or the original URI.
    pub href: String,
    /// Path inside the artifact set when the attachment was inlined.
    pub inlined_as: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseCtx {
    pub holder: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub generator_version: String,
}

impl GenerationContext {
    /// Build the context for `request`; `license_holder` is named in LICENSE.
    pub fn from_request(request: &GenerationRequest, license_holder: &str) -> Self {
        let checks = request
            .checks
            .iter()
            .enumerate()
            .map(|(i, text)| CheckCtx {
                index: i + 1,
                text: text.trim().to_string(),
            })
            .collect();

        let attachments = request
            .attachments
            .iter()
            .map(|a| {
                let inlined_as = attachments::inline_text(&a.url)
                    .and(attachments::sanitize_name(&a.name));
                AttachmentCtx {
                    name: a.name.clone(),
                    href: inlined_as.clone().unwrap_or_else(|| a.url.clone()),
                    inlined_as,
                }
            })
            .collect();

        GenerationContext {
            identity: IdentityCtx {
                task: request.task.clone(),
                round: request.round,
                title: title_from_task(&request.task),
            },
            brief: BriefCtx {
                text: request.brief.trim().to_string(),
                summary: pagesmith_core::types::summarize(&request.brief, 120),
                paragraphs: paragraphs(&request.brief),
            },
            checks,
            elements: elements_from_checks(&request.checks),
            attachments,
            license: LicenseCtx {
                holder: license_holder.to_string(),
                year: Utc::now().year(),
            },
            meta: MetaCtx {
                generator_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, GenerateError> {
        tera::Context::from_serialize(self).map_err(GenerateError::from)
    }
}

/// Ids the built-in page template already gives its own sections.
pub const RESERVED_IDS: &[&str] = &["brief", "elements", "checks", "attachments", "pagesmith-status"];

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"#([A-Za-z][A-Za-z0-9_-]*)").expect("element id pattern is valid")
    })
}

/// Collect `#id` selectors mentioned in checks, deduplicated in first-seen order.
///
/// Ids in [`RESERVED_IDS`] are left out; the page already has an element
/// with that id.
pub fn elements_from_checks(checks: &[String]) -> Vec<ElementCtx> {
    let mut seen: HashSet<String> = RESERVED_IDS.iter().map(|id| id.to_string()).collect();
    let mut out = Vec::new();
    for check in checks {
        let lower = check.to_ascii_lowercase();
        for cap in id_pattern().captures_iter(check) {
            let id = cap[1].to_string();
            if !seen.insert(id.clone()) {
                continue;
            }
            let tag = if lower.contains("button") {
                "button"
            } else if lower.contains("input") || lower.contains("field") || lower.contains("textbox")
            {
                "input"
            } else {
                "div"
            };
            out.push(ElementCtx {
                label: title_from_task(&id),
                id,
                tag: tag.to_string(),
            });
        }
    }
    out
}

fn title_from_task(task: &str) -> String {
    let words: Vec<String> = task
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Untitled".to_string()
    } else {
        words.join(" ")
    }
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}
