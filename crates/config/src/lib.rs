//! Configuration loading, validation, and management for issuewright.
//!
//! Loads configuration from `~/.issuewright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use issuewright_core::RepoCoord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.issuewright/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub API access
    #[serde(default)]
    pub github: GithubConfig,

    /// Rule script defaults
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API base URL (GitHub Enterprise uses `https://host/api/v3`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Personal access or installation token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}
fn default_user_agent() -> String {
    format!("issuewright/{}", env!("CARGO_PKG_VERSION"))
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_url", &self.api_url)
            .field("token", &redact(&self.token))
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Path spec of the root script, fetched from the event's repository
    #[serde(default = "default_script")]
    pub script: String,

    /// `owner/repo` used when a payload carries no repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_repo: Option<String>,

    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// "sequential" or "concurrent"
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_script() -> String {
    ".github/issuewright.js".into()
}
fn default_max_include_depth() -> usize {
    8
}
fn default_mode() -> String {
    "sequential".into()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            script: default_script(),
            default_repo: None,
            max_include_depth: default_max_include_depth(),
            mode: default_mode(),
        }
    }
}

impl RulesConfig {
    /// The configured default repository, if any.
    pub fn default_repo(&self) -> Option<RepoCoord> {
        self.default_repo.as_deref().and_then(RepoCoord::parse)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.issuewright/config.toml).
    ///
    /// Environment variables override the file:
    /// - `ISSUEWRIGHT_TOKEN`, then `GITHUB_TOKEN`
    /// - `ISSUEWRIGHT_API_URL`
    /// - `ISSUEWRIGHT_REPO`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides, reading variables through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("ISSUEWRIGHT_TOKEN").or_else(|| var("GITHUB_TOKEN")) {
            self.github.token = Some(token);
        }
        if let Some(url) = var("ISSUEWRIGHT_API_URL") {
            self.github.api_url = url;
        }
        if let Some(repo) = var("ISSUEWRIGHT_REPO") {
            self.rules.default_repo = Some(repo);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".issuewright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.github.api_url.starts_with("http://") && !self.github.api_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "github.api_url must be an http(s) URL, got '{}'",
                self.github.api_url
            )));
        }

        if self.github.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "github.timeout_secs must be > 0".into(),
            ));
        }

        if let Some(repo) = &self.rules.default_repo {
            if RepoCoord::parse(repo).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "rules.default_repo must look like 'owner/repo', got '{repo}'"
                )));
            }
        }

        if self.rules.script.trim().is_empty() {
            return Err(ConfigError::ValidationError("rules.script must not be empty".into()));
        }

        if self.rules.max_include_depth == 0 {
            return Err(ConfigError::ValidationError(
                "rules.max_include_depth must be > 0".into(),
            ));
        }

        let mode = self.rules.mode.trim().to_ascii_lowercase();
        if !matches!(mode.as_str(), "sequential" | "concurrent") {
            return Err(ConfigError::ValidationError(format!(
                "rules.mode must be 'sequential' or 'concurrent', got '{}'",
                self.rules.mode
            )));
        }

        Ok(())
    }

    /// Check if a GitHub token is available (from config or environment).
    pub fn has_token(&self) -> bool {
        self.github.token.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.rules.script, ".github/issuewright.js");
        assert_eq!(config.rules.max_include_depth, 8);
        assert_eq!(config.rules.mode, "sequential");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.github.api_url, config.github.api_url);
        assert_eq!(parsed.rules.script, config.rules.script);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.rules.mode, "sequential");
        assert!(!config.has_token());
    }

    #[test]
    fn load_from_reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[github]
token = "ghp_secret"

[rules]
default_repo = "bkeepers-inc/test"
mode = "concurrent"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("ghp_secret"));
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.rules.mode, "concurrent");
        assert_eq!(
            config.rules.default_repo(),
            Some(RepoCoord::new("bkeepers-inc", "test"))
        );
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rules\nmode = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn mode_is_case_insensitive() {
        let mut config = AppConfig::default();
        for mode in ["Concurrent", "SEQUENTIAL", " concurrent "] {
            config.rules.mode = mode.into();
            assert!(config.validate().is_ok(), "{mode}");
        }
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.rules.mode = "parallel".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rules.default_repo = Some("not-a-repo".into());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.github.api_url = "api.github.com".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rules.max_include_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GITHUB_TOKEN", "from-github"),
            ("ISSUEWRIGHT_TOKEN", "from-issuewright"),
            ("ISSUEWRIGHT_API_URL", "https://ghe.example.com/api/v3"),
            ("ISSUEWRIGHT_REPO", "acme/widgets"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.github.token.as_deref(), Some("from-issuewright"));
        assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.rules.default_repo.as_deref(), Some("acme/widgets"));

        let mut config = AppConfig::default();
        config.apply_env(|key| (key == "GITHUB_TOKEN").then(|| "fallback".to_string()));
        assert_eq!(config.github.token.as_deref(), Some("fallback"));
    }

    #[test]
    fn debug_output_redacts_token() {
        let mut config = AppConfig::default();
        config.github.token = Some("ghp_secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("api.github.com"));
        assert!(toml_str.contains(".github/issuewright.js"));
        assert!(!toml_str.contains("token"));
    }
}
