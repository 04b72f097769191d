//! Tera rendering engine: [`ArtifactKind`], [`TemplateEngine`] and the
//! [`TemplateGenerator`] the pipeline uses by default.
//!
//! # Output mapping
//!
//! | Kind       | Template                  | Output path  |
//! |------------|---------------------------|--------------|
//! | EntryPoint | `site/index.html.tera`    | `index.html` |
//! | Readme     | `docs/readme.md.tera`     | `README.md`  |
//! | License    | `docs/license.tera`       | `LICENSE`    |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pagesmith_core::{ArtifactSet, ENTRY_POINT};

use crate::attachments;
use crate::context::GenerationContext;
use crate::error::GenerateError;
use crate::{ArtifactGenerator, GenerationRequest};

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("shared/_checks.tera", include_str!("templates/_partials/checks.tera")),
    ("site/index.html.tera", include_str!("templates/index.html.tera")),
    ("docs/readme.md.tera", include_str!("templates/readme.md.tera")),
    ("docs/license.tera", include_str!("templates/license.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GenerateError {
    GenerateError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), GenerateError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, GenerateError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<tera::Tera, GenerateError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            tracing::debug!(template = %name, "user template override");
            templates.insert(name, content);
        }
    }

    let mut tera = tera::Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// Every file the template generator always emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    EntryPoint,
    Readme,
    License,
}

impl ArtifactKind {
    /// All kinds in a stable order.
    pub fn all() -> &'static [ArtifactKind] {
        &[ArtifactKind::EntryPoint, ArtifactKind::Readme, ArtifactKind::License]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            ArtifactKind::EntryPoint => "site/index.html.tera",
            ArtifactKind::Readme     => "docs/readme.md.tera",
            ArtifactKind::License    => "docs/license.tera",
        }
    }

    /// Path of the rendered file inside the artifact set.
    pub fn output_path(&self) -> &'static str {
        match self {
            ArtifactKind::EntryPoint => ENTRY_POINT,
            ArtifactKind::Readme     => "README.md",
            ArtifactKind::License    => "LICENSE",
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded
/// defaults, addressed by the same relative names (`site/index.html.tera`).
pub struct TemplateEngine {
    tera: tera::Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, GenerateError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render one artifact. Line endings are normalised to LF.
    pub fn render(
        &self,
        ctx: &GenerationContext,
        kind: ArtifactKind,
    ) -> Result<String, GenerateError> {
        let tera_ctx = ctx.to_tera_context()?;
        let content = self.tera.render(kind.template_name(), &tera_ctx)?;
        Ok(content.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// TemplateGenerator
// ---------------------------------------------------------------------------

/// Default [`ArtifactGenerator`]: fills the templates from the brief, checks
/// and attachments, then inlines textual `data:` attachments as files.
pub struct TemplateGenerator {
    engine: TemplateEngine,
    license_holder: String,
}

impl TemplateGenerator {
    pub fn new(
        user_template_dir: Option<&Path>,
        license_holder: impl Into<String>,
    ) -> Result<Self, GenerateError> {
        Ok(TemplateGenerator {
            engine: TemplateEngine::new(user_template_dir)?,
            license_holder: license_holder.into(),
        })
    }

    /// Synchronous core of [`ArtifactGenerator::generate`].
    pub fn render(&self, request: &GenerationRequest) -> Result<ArtifactSet, GenerateError> {
        let ctx = GenerationContext::from_request(request, &self.license_holder);
        let mut files = ArtifactSet::new();

        for kind in ArtifactKind::all() {
            let content = self.engine.render(&ctx, *kind)?;
            files.insert(kind.output_path(), content)?;
        }

        for (attachment, inlined) in request.attachments.iter().zip(&ctx.attachments) {
            let Some(path) = inlined.inlined_as.as_deref() else {
                continue;
            };
            if files.contains(path) {
                tracing::warn!(
                    attachment = %attachment.name,
                    path,
                    "attachment would overwrite a generated file; left as link only",
                );
                continue;
            }
            if let Some(text) = attachments::inline_text(&attachment.url) {
                files.insert(path, text)?;
            }
        }

        if !files.has_entry_point() {
            return Err(GenerateError::MissingFile(ENTRY_POINT));
        }
        Ok(files)
    }
}

#[async_trait]
impl ArtifactGenerator for TemplateGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<ArtifactSet, GenerateError> {
        self.render(request)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
