//! # Configuration Module
//!
//! Configuration for headerkit: keywords, separator lines, concurrency,
//! additional languages, inline header templates and additional tokens.
//!
//! Configuration can be specified in a `.headerkit.toml` file or via the
//! `HEADERKIT_CONFIG` environment variable.
//!
//! ```toml
//! keywords = ["copyright", "license"]
//! separator-lines = 1
//! jobs = 8
//! user-display-name = "Jane Doe"
//!
//! [[languages]]
//! name = "Zig"
//! extensions = [".zig"]
//! line-comment = "//"
//!
//! [headers]
//! ".zig" = ["// Copyright %CurrentYear% Acme"]
//!
//! [tokens]
//! "%Company%" = "Acme"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::languages::{Language, LanguageRegistry};
use crate::templates::{HeaderTemplates, normalize_extension};
use crate::verbose_log;

/// The default config file name.
pub const DEFAULT_CONFIG_FILENAME: &str = ".headerkit.toml";

/// Environment variable for specifying config file path.
pub const CONFIG_ENV_VAR: &str = "HEADERKIT_CONFIG";

const fn default_separator_lines() -> usize {
  1
}

/// Main configuration struct for headerkit.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
  /// Only comment regions containing one of these words count as license
  /// headers
  #[serde(default)]
  pub keywords: Option<Vec<String>>,

  /// Blank lines between an inserted header and the rest of the file
  #[serde(default = "default_separator_lines")]
  pub separator_lines: usize,

  /// Maximum number of files processed concurrently
  #[serde(default)]
  pub jobs: Option<usize>,

  /// Value of `%UserDisplayName%`
  #[serde(default)]
  pub user_display_name: Option<String>,

  /// Use only the languages below instead of appending them to the built-in
  /// table
  #[serde(default)]
  pub replace_builtin_languages: bool,

  #[serde(default)]
  pub languages: Vec<Language>,

  /// Header templates by extension
  #[serde(default)]
  pub headers: BTreeMap<String, Vec<String>>,

  /// Additional tokens by name
  #[serde(default)]
  pub tokens: BTreeMap<String, String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      keywords: None,
      separator_lines: default_separator_lines(),
      jobs: None,
      user_display_name: None,
      replace_builtin_languages: false,
      languages: Vec::new(),
      headers: BTreeMap::new(),
      tokens: BTreeMap::new(),
    }
  }
}

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("Failed to read config file '{path}': {source}")]
  ReadError { path: PathBuf, source: std::io::Error },

  /// The config file contains invalid TOML.
  #[error("Failed to parse config file '{path}': {source}")]
  ParseError { path: PathBuf, source: toml::de::Error },

  /// A language definition is invalid.
  #[error("Invalid language '{name}': {message}")]
  InvalidLanguage { name: String, message: String },

  /// A setting has an invalid value.
  #[error("Invalid value for '{key}': {message}")]
  InvalidValue { key: String, message: String },
}

impl Config {
  /// Load configuration from a file.
  ///
  /// # Arguments
  ///
  /// * `path` - Path to the configuration file
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    verbose_log!("Loading config from: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
      path: path.to_path_buf(),
      source: e,
    })?;

    let config = Self::parse(&content).map_err(|e| match e {
      ConfigError::ParseError { source, .. } => ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })?;

    verbose_log!(
      "Loaded {} languages and {} header templates",
      config.languages.len(),
      config.headers.len()
    );

    Ok(config)
  }

  /// Parse, validate and normalize configuration text.
  pub fn parse(content: &str) -> Result<Self, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
      path: PathBuf::new(),
      source: e,
    })?;

    config.validate()?;
    Ok(config.normalize())
  }

  /// Validate the configuration.
  ///
  /// Checks that:
  /// - Every language has a line marker or a complete pair of block markers
  /// - No language has only one block marker
  /// - Extensions are non-empty
  /// - Skip expressions compile
  /// - `jobs` is positive
  fn validate(&self) -> Result<(), ConfigError> {
    for language in &self.languages {
      let invalid = |message: &str| ConfigError::InvalidLanguage {
        name: language.name.clone(),
        message: message.to_string(),
      };

      if language.extensions.is_empty() {
        return Err(invalid("at least one extension is required"));
      }
      if language.extensions.iter().any(|ext| ext.trim().is_empty()) {
        return Err(invalid("extensions cannot be empty"));
      }

      let has_start = language.block_start.as_deref().is_some_and(|m| !m.is_empty());
      let has_end = language.block_end.as_deref().is_some_and(|m| !m.is_empty());
      if has_start != has_end {
        return Err(invalid("block-start and block-end must be given together"));
      }
      if language.line_marker().is_none() && !has_start {
        return Err(invalid("a line-comment or block comment markers are required"));
      }

      if let Err(err) = language.skip_regex() {
        return Err(invalid(&format!("invalid skip-expression: {}", err)));
      }
    }

    if self.headers.keys().any(|ext| ext.trim().is_empty()) {
      return Err(ConfigError::InvalidValue {
        key: "headers".to_string(),
        message: "extensions cannot be empty".to_string(),
      });
    }

    if self.jobs == Some(0) {
      return Err(ConfigError::InvalidValue {
        key: "jobs".to_string(),
        message: "must be at least 1".to_string(),
      });
    }

    Ok(())
  }

  /// Give every extension a leading dot.
  fn normalize(self) -> Self {
    let languages = self
      .languages
      .into_iter()
      .map(|language| Language {
        extensions: language.extensions.iter().map(|ext| normalize_extension(ext.trim())).collect(),
        ..language
      })
      .collect();

    let headers = self
      .headers
      .into_iter()
      .map(|(ext, lines)| (normalize_extension(ext.trim()), lines))
      .collect();

    Self {
      languages,
      headers,
      ..self
    }
  }

  /// The language registry described by this configuration.
  pub fn registry(&self) -> LanguageRegistry {
    let mut registry = if self.replace_builtin_languages {
      LanguageRegistry::new(Vec::new())
    } else {
      LanguageRegistry::builtin()
    };
    for language in &self.languages {
      registry.register(language.clone());
    }
    registry
  }

  /// Inline header templates, or `None` when there are none.
  pub fn header_templates(&self) -> Option<HeaderTemplates> {
    if self.headers.is_empty() {
      return None;
    }
    Some(
      self
        .headers
        .iter()
        .map(|(ext, lines)| (ext.clone(), Some(lines.clone())))
        .collect(),
    )
  }
}

/// Discover the configuration file path.
///
/// The configuration file is discovered in the following order:
/// 1. Path specified via `--config` flag (passed as `explicit_path`)
/// 2. Path specified via `HEADERKIT_CONFIG` environment variable
/// 3. `.headerkit.toml` in the working directory
///
/// An explicit path is returned even when it does not exist so loading it
/// reports the error.
pub fn discover_config_path(explicit_path: Option<&Path>, root: &Path) -> Option<PathBuf> {
  if let Some(path) = explicit_path {
    verbose_log!("Using explicit config path: {}", path.display());
    return Some(path.to_path_buf());
  }

  if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR)
    && !env_path.is_empty()
  {
    let path = PathBuf::from(&env_path);
    if path.exists() {
      verbose_log!("Using config from {}: {}", CONFIG_ENV_VAR, path.display());
      return Some(path);
    }
    verbose_log!("{} path does not exist: {}", CONFIG_ENV_VAR, env_path);
  }

  let local_config = root.join(DEFAULT_CONFIG_FILENAME);
  if local_config.exists() {
    verbose_log!("Using config: {}", local_config.display());
    return Some(local_config);
  }

  verbose_log!("No config file found");
  None
}

/// Load configuration from the discovered path.
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path from CLI flag
/// * `root` - Directory searched for `.headerkit.toml`
/// * `no_config` - Skip discovery entirely
///
/// # Returns
///
/// The loaded configuration, or `None` if no config file is found.
pub fn load_config(explicit_path: Option<&Path>, root: &Path, no_config: bool) -> Result<Option<Config>> {
  if no_config {
    verbose_log!("Config file discovery disabled (--no-config)");
    return Ok(None);
  }

  match discover_config_path(explicit_path, root) {
    Some(path) => {
      let config = Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))?;
      Ok(Some(config))
    }
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use tempfile::TempDir;

  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(concat!(
      "keywords = [\"Copyright\"]\n",
      "separator-lines = 2\n",
      "jobs = 3\n",
      "user-display-name = \"Jane\"\n",
      "[[languages]]\n",
      "name = \"Zig\"\n",
      "extensions = [\"zig\"]\n",
      "line-comment = \"//\"\n",
      "[headers]\n",
      "zig = [\"// Copyright %CurrentYear%\"]\n",
      "[tokens]\n",
      "\"%Company%\" = \"Acme\"\n",
    ))
    .expect("valid config");

    assert_eq!(config.keywords, Some(vec!["Copyright".to_string()]));
    assert_eq!(config.separator_lines, 2);
    assert_eq!(config.jobs, Some(3));
    assert_eq!(config.user_display_name.as_deref(), Some("Jane"));
    assert_eq!(config.languages[0].extensions, [".zig"]);
    assert!(config.headers.contains_key(".zig"));
    assert_eq!(config.tokens.get("%Company%").map(String::as_str), Some("Acme"));

    let registry = config.registry();
    assert!(registry.resolve(Path::new("main.zig")).is_some());
    assert!(registry.resolve(Path::new("main.rs")).is_some());
    assert!(config.header_templates().is_some());
  }

  #[test]
  fn test_defaults() {
    let config = Config::parse("").expect("empty config");
    assert_eq!(config, Config::default());
    assert_eq!(config.separator_lines, 1);
    assert!(config.header_templates().is_none());
  }

  #[test]
  fn test_replace_builtin_languages() {
    let config = Config::parse(concat!(
      "replace-builtin-languages = true\n",
      "[[languages]]\n",
      "name = \"Only\"\n",
      "extensions = [\".only\"]\n",
      "line-comment = \"#\"\n",
    ))
    .expect("valid config");
    let registry = config.registry();
    assert_eq!(registry.languages().len(), 1);
    assert!(registry.resolve(Path::new("main.rs")).is_none());
  }

  #[test]
  fn test_rejects_language_without_syntax() {
    let err = Config::parse("[[languages]]\nname = \"X\"\nextensions = [\".x\"]\n").expect_err("invalid");
    assert!(matches!(err, ConfigError::InvalidLanguage { .. }));
  }

  #[test]
  fn test_rejects_half_block_markers() {
    let err = Config::parse("[[languages]]\nname = \"X\"\nextensions = [\".x\"]\nblock-start = \"/*\"\n")
      .expect_err("invalid");
    assert!(err.to_string().contains("block-start and block-end"));
  }

  #[test]
  fn test_rejects_empty_extension() {
    let err = Config::parse("[[languages]]\nname = \"X\"\nextensions = [\"\"]\nline-comment = \"#\"\n")
      .expect_err("invalid");
    assert!(matches!(err, ConfigError::InvalidLanguage { .. }));
  }

  #[test]
  fn test_rejects_bad_skip_expression() {
    let err = Config::parse(
      "[[languages]]\nname = \"X\"\nextensions = [\".x\"]\nline-comment = \"#\"\nskip-expression = \"(\"\n",
    )
    .expect_err("invalid");
    assert!(err.to_string().contains("skip-expression"));
  }

  #[test]
  fn test_rejects_zero_jobs() {
    assert!(matches!(
      Config::parse("jobs = 0\n"),
      Err(ConfigError::InvalidValue { .. })
    ));
  }

  #[test]
  fn test_rejects_unknown_keys() {
    assert!(matches!(Config::parse("colour = true\n"), Err(ConfigError::ParseError { .. })));
  }

  #[test]
  fn test_load_missing_explicit_path() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("nope.toml");
    assert!(load_config(Some(&missing), dir.path(), false).is_err());
  }

  #[test]
  fn test_discover_in_root_and_no_config() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join(DEFAULT_CONFIG_FILENAME), "separator-lines = 0\n").expect("write");

    let config = load_config(None, dir.path(), false).expect("load");
    // HEADERKIT_CONFIG may point elsewhere in the test environment
    if std::env::var(CONFIG_ENV_VAR).is_err() {
      assert_eq!(config.map(|c| c.separator_lines), Some(0));
    }

    assert!(load_config(None, dir.path(), true).expect("load").is_none());
  }
}
