//! Configuration loading, validation, and management for mrdigest.
//!
//! Loads configuration from `~/.mrdigest/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.mrdigest/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Token ceiling and safety margins
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Patch rendering options
    #[serde(default)]
    pub diff: DiffConfig,

    /// Files never sent to the model
    #[serde(default)]
    pub ignore: IgnoreConfig,

    /// Extensions of files that carry no reviewable text
    #[serde(default)]
    pub bad_extensions: BadExtensionsConfig,

    /// Language name → file extensions (with leading dot)
    #[serde(default = "default_language_extensions")]
    pub language_extensions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Context window of the downstream model
    #[serde(default = "default_max_model_tokens")]
    pub max_model_tokens: usize,

    /// Margin kept free when deciding whether content fits
    #[serde(default = "default_soft_buffer")]
    pub soft_buffer: usize,

    /// Margin past which no more content is considered at all
    #[serde(default = "default_hard_buffer")]
    pub hard_buffer: usize,
}

fn default_max_model_tokens() -> usize {
    32_000
}
fn default_soft_buffer() -> usize {
    1000
}
fn default_hard_buffer() -> usize {
    600
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_model_tokens: default_max_model_tokens(),
            soft_buffer: default_soft_buffer(),
            hard_buffer: default_hard_buffer(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Extra context lines pulled around each hunk (0 = as provided)
    #[serde(default)]
    pub patch_extra_lines: usize,

    /// Render hunks in the numbered `__new hunk__` / `__old hunk__` layout
    #[serde(default)]
    pub add_line_numbers: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Shell-style globs matched against the whole filename
    #[serde(default)]
    pub glob: Vec<String>,

    /// Regular expressions matched from the start of the filename
    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadExtensionsConfig {
    #[serde(default = "default_bad_extensions")]
    pub default: Vec<String>,

    /// Project-specific additions to `default`
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Default for BadExtensionsConfig {
    fn default() -> Self {
        Self {
            default: default_bad_extensions(),
            extra: vec![],
        }
    }
}

impl BadExtensionsConfig {
    /// All configured extensions, without leading dots.
    pub fn all(&self) -> HashSet<String> {
        self.default
            .iter()
            .chain(self.extra.iter())
            .map(|e| e.trim_start_matches('.').to_string())
            .collect()
    }
}

fn default_bad_extensions() -> Vec<String> {
    [
        "app", "bin", "bmp", "bz2", "class", "csv", "dat", "db", "dll", "dylib", "egg", "eot",
        "exe", "gif", "gitignore", "glif", "gradle", "gz", "ico", "jar", "jpeg", "jpg", "lo",
        "lock", "lockb", "log", "mp3", "mp4", "nar", "o", "ogg", "otf", "p", "pdf", "pickle",
        "pkl", "png", "pyc", "pyd", "pyo", "rkt", "snap", "so", "ss", "svg", "tar", "tgz",
        "tsv", "ttf", "war", "webm", "webp", "woff", "woff2", "xz", "zip", "zst",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_language_extensions() -> BTreeMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("C", &[".c", ".h"]),
        ("C#", &[".cs"]),
        ("C++", &[".cc", ".cpp", ".cxx", ".hpp", ".hh", ".hxx"]),
        ("CSS", &[".css", ".scss", ".sass", ".less"]),
        ("Go", &[".go"]),
        ("HTML", &[".html", ".htm"]),
        ("Java", &[".java"]),
        ("JavaScript", &[".js", ".jsx", ".mjs", ".cjs"]),
        ("Kotlin", &[".kt", ".kts"]),
        ("Perl", &[".pl", ".pm"]),
        ("PHP", &[".php"]),
        ("Python", &[".py", ".pyi"]),
        ("Ruby", &[".rb"]),
        ("Rust", &[".rs"]),
        ("Scala", &[".scala", ".sc"]),
        ("Shell", &[".sh", ".bash", ".zsh"]),
        ("SQL", &[".sql"]),
        ("Swift", &[".swift"]),
        ("TypeScript", &[".ts", ".tsx"]),
        ("Vue", &[".vue"]),
    ];
    table
        .iter()
        .map(|(lang, exts)| {
            (
                (*lang).to_string(),
                exts.iter().map(|e| (*e).to_string()).collect(),
            )
        })
        .collect()
}

impl AppConfig {
    /// Load configuration from the default path (~/.mrdigest/config.toml).
    ///
    /// Environment variables override the file:
    /// - `MRDIGEST_MAX_TOKENS`
    /// - `MRDIGEST_PATCH_EXTRA_LINES`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load `path` and apply the same environment overrides as [`load`](Self::load).
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides()?;
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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mrdigest")
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_usize("MRDIGEST_MAX_TOKENS")? {
            self.budget.max_model_tokens = v;
        }
        if let Some(v) = env_usize("MRDIGEST_PATCH_EXTRA_LINES")? {
            self.diff.patch_extra_lines = v;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let budget = &self.budget;
        if budget.max_model_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "budget.max_model_tokens must be > 0".into(),
            ));
        }

        if budget.soft_buffer >= budget.max_model_tokens
            || budget.hard_buffer >= budget.max_model_tokens
        {
            return Err(ConfigError::ValidationError(format!(
                "budget buffers ({} / {}) leave no room in a {}-token window",
                budget.soft_buffer, budget.hard_buffer, budget.max_model_tokens
            )));
        }

        if let Some((lang, _)) = self
            .language_extensions
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| !e.starts_with('.')))
        {
            return Err(ConfigError::ValidationError(format!(
                "language_extensions.{lang}: extensions must start with '.'"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config show --defaults`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            diff: DiffConfig::default(),
            ignore: IgnoreConfig::default(),
            bad_extensions: BadExtensionsConfig::default(),
            language_extensions: default_language_extensions(),
        }
    }
}

fn env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::ValidationError(format!("{key}={raw:?} is not a number"))),
        Err(_) => Ok(None),
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
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.budget.soft_buffer, 1000);
        assert_eq!(config.budget.hard_buffer, 600);
        assert_eq!(config.diff.patch_extra_lines, 0);
        assert!(config.language_extensions["Rust"].contains(&".rs".to_string()));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.budget.max_model_tokens, config.budget.max_model_tokens);
        assert_eq!(parsed.language_extensions, config.language_extensions);
    }

    #[test]
    fn buffers_larger_than_window_rejected() {
        let config = AppConfig {
            budget: BudgetConfig {
                max_model_tokens: 800,
                soft_buffer: 1000,
                hard_buffer: 600,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn extension_without_dot_rejected() {
        let mut config = AppConfig::default();
        config
            .language_extensions
            .insert("Zig".into(), vec!["zig".into()]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Zig"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().budget.max_model_tokens, 32_000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[budget]
max_model_tokens = 8000

[diff]
patch_extra_lines = 3
add_line_numbers = true

[ignore]
glob = ["*.lock", "docs/**"]
regex = ["^vendor/"]

[bad_extensions]
extra = ["parquet"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.budget.max_model_tokens, 8000);
        assert_eq!(config.budget.soft_buffer, 1000);
        assert_eq!(config.diff.patch_extra_lines, 3);
        assert!(config.diff.add_line_numbers);
        assert_eq!(config.ignore.glob.len(), 2);
        assert!(config.bad_extensions.all().contains("parquet"));
        assert!(config.bad_extensions.all().contains("png"));
        assert!(config.language_extensions.contains_key("Python"));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[budget\nmax_model_tokens = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn bad_extensions_strip_leading_dot() {
        let cfg = BadExtensionsConfig {
            default: vec![".png".into()],
            extra: vec!["zip".into()],
        };
        let all = cfg.all();
        assert!(all.contains("png"));
        assert!(all.contains("zip"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_model_tokens"));
        assert!(toml_str.contains("soft_buffer"));
    }
}
