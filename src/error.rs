//! # Error Module
//!
//! Structured errors produced while replacing headers. Every failure that
//! reaches a caller carries the path of the file it belongs to, a machine
//! readable [`ErrorKind`] and a human readable message.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Category of a header replacement failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
  /// No registered comment syntax claims the file's extension.
  LanguageNotFound,
  /// A template map was supplied but none of its keys matches the path.
  NoHeaderFound,
  /// The leading comment region is malformed (e.g. an unterminated block).
  ParsingError,
  /// The header contains text outside comments and the caller declined.
  NonCommentText,
  /// Invalid input or I/O failure.
  Miscellaneous,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ErrorKind::LanguageNotFound => "language not found",
      ErrorKind::NoHeaderFound => "no header found",
      ErrorKind::ParsingError => "parsing error",
      ErrorKind::NonCommentText => "non-comment text",
      ErrorKind::Miscellaneous => "miscellaneous",
    };
    f.write_str(name)
  }
}

/// A failure tied to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}: {message}", path.display())]
pub struct ReplacerError {
  /// Path of the file the error belongs to
  pub path: PathBuf,
  /// What went wrong
  pub kind: ErrorKind,
  /// Human readable description
  pub message: String,
}

impl ReplacerError {
  pub fn new(path: impl Into<PathBuf>, kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      kind,
      message: message.into(),
    }
  }

  pub fn language_not_found(path: &Path) -> Self {
    Self::new(
      path,
      ErrorKind::LanguageNotFound,
      format!(
        "No comment syntax is registered for files with extension '{}'",
        display_extension(path)
      ),
    )
  }

  pub fn no_header_found(path: &Path) -> Self {
    Self::new(
      path,
      ErrorKind::NoHeaderFound,
      "No header definition matches this file's extension",
    )
  }

  pub fn miscellaneous(path: &Path, error: &anyhow::Error) -> Self {
    // `{:#}` keeps the whole context chain on one line
    Self::new(path, ErrorKind::Miscellaneous, format!("{:#}", error))
  }
}

/// Lower-cased final extension of a path including the leading dot, or an
/// empty string for extensionless files.
pub fn display_extension(path: &Path) -> String {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| format!(".{}", ext.to_lowercase()))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_includes_path_and_message() {
    let err = ReplacerError::new("src/a.rs", ErrorKind::ParsingError, "unterminated block comment");
    assert_eq!(err.to_string(), "src/a.rs: unterminated block comment");
  }

  #[test]
  fn test_display_extension() {
    assert_eq!(display_extension(Path::new("Foo.CS")), ".cs");
    assert_eq!(display_extension(Path::new("Makefile")), "");
    assert_eq!(display_extension(Path::new("a.designer.cs")), ".cs");
  }

  #[test]
  fn test_kind_serializes_kebab_case() {
    let json = serde_json::to_string(&ErrorKind::NonCommentText).expect("serialize");
    assert_eq!(json, "\"non-comment-text\"");
  }
}
