//! Layered process settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.pagesmith/
//!   config.yaml   (mode 0600, holds the shared secret and hosting token)
//! ```
//!
//! # Layering
//!
//! 1. [`Settings::default`]
//! 2. `config.yaml` (or an explicit path), when present
//! 3. `PAGESMITH_*` environment overrides
//!
//! # API pattern
//!
//! As with every path-touching function here, `fn_at(home, …)` takes an
//! explicit home and `fn(…)` derives it from `dirs::home_dir()`. Tests use
//! the `_at` forms and inject environment lookups through
//! [`Settings::apply_env_from`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const REDACTED: &str = "********";

// ---------------------------------------------------------------------------
// 1. Settings model
// ---------------------------------------------------------------------------

/// Root settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Shared secret every `/deploy` request must carry.
    pub secret: String,
    pub server: ServerSettings,
    pub github: GitHubSettings,
    pub pipeline: PipelineSettings,
    pub notifier: NotifierSettings,
    pub generator: GeneratorSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub token: String,
    pub owner: String,
    pub api_base: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: String::new(),
            api_base: "https://api.github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Branch the publish commit is written to and served from.
    pub branch: String,
    /// Directory within the branch that static hosting serves.
    pub pages_path: String,
    pub readiness_delay_secs: u64,
    /// Pause between deleting a stale repository and recreating it.
    pub settle_delay_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            pages_path: "/".to_string(),
            readiness_delay_secs: 120,
            settle_delay_ms: 3_000,
        }
    }
}

impl PipelineSettings {
    pub fn readiness_delay(&self) -> Duration {
        Duration::from_secs(self.readiness_delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            timeout_secs: 10,
        }
    }
}

impl NotifierSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Directory of `.tera` files overriding the embedded templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
    /// Name printed in the generated LICENSE; falls back to the hosting owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_holder: Option<String>,
}

/// What the settings are about to be used for; decides which fields must be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Intake server: needs the shared secret and hosting credentials.
    Serve,
    /// One foreground pipeline run against the real hosting provider.
    Run,
    /// One foreground run against in-memory hosting; no credentials needed.
    DryRun,
}

// ---------------------------------------------------------------------------
// 2. Paths
// ---------------------------------------------------------------------------

/// `<home>/.pagesmith/config.yaml` (pure, no I/O).
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".pagesmith").join("config.yaml")
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

impl Settings {
    /// Load from `<home>/.pagesmith/config.yaml`, falling back to defaults when
    /// the file is absent. Environment overrides are not applied.
    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        let path = settings_path_at(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit file. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Full layered load: file (explicit or default location), then the
    /// process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match explicit {
            Some(path) => Self::load_from(path)?,
            None => Self::load_at(&home()?)?,
        };
        settings.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply `PAGESMITH_*` overrides using `lookup` to read variables.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PAGESMITH_SECRET") {
            self.secret = v;
        }
        if let Some(v) = lookup("PAGESMITH_GITHUB_TOKEN") {
            self.github.token = v;
        }
        if let Some(v) = lookup("PAGESMITH_GITHUB_OWNER") {
            self.github.owner = v;
        }
        if let Some(v) = lookup("PAGESMITH_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("PAGESMITH_READINESS_DELAY_SECS") {
            self.pipeline.readiness_delay_secs = v.trim().parse().map_err(|_| {
                ConfigError::invalid(
                    "PAGESMITH_READINESS_DELAY_SECS",
                    format!("expected whole seconds, got `{v}`"),
                )
            })?;
        }
        Ok(())
    }

    /// Check that everything `mode` depends on is present.
    pub fn validate(&self, mode: RunMode) -> Result<(), ConfigError> {
        if self.notifier.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "notifier.max_attempts",
                "must be at least 1",
            ));
        }
        if self.pipeline.branch.trim().is_empty() {
            return Err(ConfigError::invalid("pipeline.branch", "must not be empty"));
        }
        if mode == RunMode::Serve && self.secret.is_empty() {
            return Err(ConfigError::invalid("secret", "must be set to accept tasks"));
        }
        if matches!(mode, RunMode::Serve | RunMode::Run) {
            if self.github.token.is_empty() {
                return Err(ConfigError::invalid("github.token", "must be set"));
            }
            if self.github.owner.is_empty() {
                return Err(ConfigError::invalid("github.owner", "must be set"));
            }
            if self.pipeline.readiness_delay_secs == 0 {
                return Err(ConfigError::invalid(
                    "pipeline.readiness_delay_secs",
                    "must be positive outside dry runs",
                ));
            }
        }
        Ok(())
    }

    /// Copy with secret values masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.secret.is_empty() {
            copy.secret = REDACTED.to_string();
        }
        if !copy.github.token.is_empty() {
            copy.github.token = REDACTED.to_string();
        }
        copy
    }
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write `settings` to `<home>/.pagesmith/config.yaml`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<PathBuf, ConfigError> {
    let path = settings_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(ConfigError::invalid("home", "settings path has no parent"));
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        set_dir_permissions(dir)?;
    }
    let tmp = path.with_file_name("config.yaml.tmp");
    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp, yaml)?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, settings)
}

/// `settings_path_at` convenience wrapper.
pub fn settings_path() -> Result<PathBuf, ConfigError> {
    Ok(settings_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.server.bind, "0.0.0.0:8000");
        assert_eq!(s.pipeline.branch, "main");
        assert_eq!(s.pipeline.readiness_delay(), Duration::from_secs(120));
        assert_eq!(s.notifier.max_attempts, 5);
        assert_eq!(s.notifier.base_delay(), Duration::from_secs(1));
        assert_eq!(s.notifier.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        let s = Settings::load_at(home.path()).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let home = TempDir::new().unwrap();
        let mut s = Settings::default();
        s.secret = "hunter2".to_string();
        s.github.owner = "octo".to_string();
        save_at(home.path(), &s).unwrap();
        assert_eq!(Settings::load_at(home.path()).unwrap(), s);

        let tmp = settings_path_at(home.path()).with_file_name("config.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let home = TempDir::new().unwrap();
        let path = save_at(home.path(), &Settings::default()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn env_overrides_file_values() {
        let vars = env(&[
            ("PAGESMITH_SECRET", "from-env"),
            ("PAGESMITH_GITHUB_OWNER", "envowner"),
            ("PAGESMITH_READINESS_DELAY_SECS", " 30 "),
        ]);
        let mut s = Settings::default();
        s.secret = "from-file".to_string();
        s.apply_env_from(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(s.secret, "from-env");
        assert_eq!(s.github.owner, "envowner");
        assert_eq!(s.pipeline.readiness_delay_secs, 30);
    }

    #[test]
    fn bad_numeric_env_is_rejected() {
        let vars = env(&[("PAGESMITH_READINESS_DELAY_SECS", "soon")]);
        let err = Settings::default()
            .apply_env_from(|k| vars.get(k).cloned())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn dry_run_needs_no_credentials() {
        Settings::default().validate(RunMode::DryRun).unwrap();
        let err = Settings::default().validate(RunMode::Serve).unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn redacted_masks_secrets_only() {
        let mut s = Settings::default();
        s.secret = "hunter2".to_string();
        s.github.token = "ghp_x".to_string();
        s.github.owner = "octo".to_string();
        let r = s.redacted();
        assert_eq!(r.secret, REDACTED);
        assert_eq!(r.github.token, REDACTED);
        assert_eq!(r.github.owner, "octo");
    }
}
