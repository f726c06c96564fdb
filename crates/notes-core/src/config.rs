//! Configuration for the notes system.
//!
//! Loaded from YAML, then environment overrides, tilde expansion and
//! validation. Every section has full defaults so an absent file is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::allowed_html::AllowedHtml;

pub const ENV_DATABASE_PATH: &str = "PLUGIN_NOTES_DB";
pub const ENV_LOG_LEVEL: &str = "PLUGIN_NOTES_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "PLUGIN_NOTES_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub global: GlobalConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub allowed_html: AllowedHtmlConfig,
}

impl Config {
    /// Parse a YAML document. Missing sections keep their defaults.
    pub fn from_yaml(source: &str, path: &Path) -> Result<Self, ConfigError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(source).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Read and parse `path`, without overrides or validation.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&source, path)
    }

    /// Full load: explicit path or search path, environment overrides, tilde
    /// expansion, validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };
        let mut cfg = match path {
            Some(path) => Self::load_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.expand_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `PLUGIN_NOTES_*` overrides through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(path) = non_empty(ENV_DATABASE_PATH) {
            self.database.path = path.trim().to_string();
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.logging.level = level.trim().to_lowercase();
        }
        if let Some(format) = non_empty(ENV_LOG_FORMAT) {
            self.logging.format = format.trim().to_lowercase();
        }
    }

    pub fn expand_paths(&mut self) {
        self.global.data_dir = expand_tilde(&self.global.data_dir);
        self.database.path = expand_tilde(&self.database.path);
    }

    /// Returns the effective database path (explicit or derived from data_dir).
    pub fn database_path(&self) -> PathBuf {
        if !self.database.path.is_empty() {
            return PathBuf::from(&self.database.path);
        }
        Path::new(&self.global.data_dir).join("plugin-notes.db")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global.data_dir.trim().is_empty() && self.database.path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "global.data_dir is required when database.path is unset".into(),
            ));
        }
        if self.database.busy_timeout_ms < 0 {
            return Err(ConfigError::Invalid(
                "database.busy_timeout_ms must be zero or greater".into(),
            ));
        }

        match self.logging.level.to_lowercase().trim() {
            "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "logging.level must be one of debug, info, warn, error".into(),
                ))
            }
        }
        match self.logging.format.to_lowercase().trim() {
            "console" | "json" => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "logging.format must be one of console, json".into(),
                ))
            }
        }

        for tag in self
            .allowed_html
            .extra
            .keys()
            .chain(self.allowed_html.remove.iter())
        {
            if !is_valid_name(tag) {
                return Err(ConfigError::Invalid(format!(
                    "allowed_html: invalid tag name {tag:?}"
                )));
            }
        }
        for (tag, attrs) in &self.allowed_html.extra {
            if let Some(bad) = attrs.iter().find(|attr| !is_valid_name(attr)) {
                return Err(ConfigError::Invalid(format!(
                    "allowed_html.extra.{tag}: invalid attribute name {bad:?}"
                )));
            }
        }
        Ok(())
    }

    /// The allow-list policy filter described by `allowed_html`.
    pub fn allowed_html_filter(&self) -> impl FnOnce(AllowedHtml) -> AllowedHtml {
        let section = self.allowed_html.clone();
        move |allowed| section.apply(allowed)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub data_dir: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            data_dir: home_dir()
                .join(".local/share/plugin-notes")
                .display()
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: i64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "console".into(),
        }
    }
}

/// Adjustments to the default note allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AllowedHtmlConfig {
    /// Tags to permit, with the attributes each may carry.
    pub extra: BTreeMap<String, Vec<String>>,
    /// Tags to drop. Applied after `extra`.
    pub remove: Vec<String>,
}

impl AllowedHtmlConfig {
    pub fn apply(&self, mut allowed: AllowedHtml) -> AllowedHtml {
        for (tag, attrs) in &self.extra {
            let attrs: Vec<&str> = attrs.iter().map(String::as_str).collect();
            allowed = allowed.allow_tag(tag, &attrs);
        }
        for tag in &self.remove {
            allowed = allowed.remove_tag(tag);
        }
        allowed
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path.is_empty() {
        return path.to_string();
    }
    if path == "~" {
        return home_dir().display().to_string();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home_dir().join(rest).display().to_string();
    }
    path.to_string()
}

/// Search for `config.yaml` in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths()
        .into_iter()
        .map(|dir| dir.join("config.yaml"))
        .find(|candidate| candidate.is_file())
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(Path::new(&xdg).join("plugin-notes"));
    }

    let home = home_dir();
    if home.as_os_str() != "" {
        paths.push(home.join(".config/plugin-notes"));
    }

    paths.push(PathBuf::from("."));
    paths
}

/// Get the user's home directory, falling back to `/` on failure.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
