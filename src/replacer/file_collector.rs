//! # File Collector Module
//!
//! Expands command-line patterns into the list of files to process. A pattern
//! is a file, a directory (walked recursively, honoring `.gitignore`, `.ignore`
//! and hidden-file rules) or a glob.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use tracing::{debug, warn};

/// How a single pattern is resolved.
#[derive(Debug)]
pub enum PatternMatcher {
  /// A specific file
  File(PathBuf),
  /// All files under a directory
  Dir(PathBuf),
  /// Files matching a glob
  Glob(glob::Pattern),
}

impl PatternMatcher {
  /// Classify a pattern. Existing paths win over glob interpretation.
  pub fn parse(pattern: &str) -> Result<Self> {
    let path = PathBuf::from(pattern);
    if path.is_dir() {
      return Ok(PatternMatcher::Dir(path));
    }
    if path.is_file() {
      return Ok(PatternMatcher::File(path));
    }
    let glob = glob::Pattern::new(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
    Ok(PatternMatcher::Glob(glob))
  }
}

/// File collector for pattern matching and directory traversal.
#[derive(Debug, Default)]
pub struct FileCollector {
  /// Also visit hidden files and directories
  include_hidden: bool,
}

impl FileCollector {
  pub const fn new() -> Self {
    Self { include_hidden: false }
  }

  pub const fn with_hidden(mut self, include_hidden: bool) -> Self {
    self.include_hidden = include_hidden;
    self
  }

  /// Collect the files named by `patterns`, sorted and without duplicates.
  ///
  /// # Parameters
  ///
  /// * `patterns` - File paths, directory paths or glob patterns
  ///
  /// # Returns
  ///
  /// The collected file paths, or an error when a pattern is not a valid
  /// glob.
  pub fn collect(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let start_time = std::time::Instant::now();
    let mut files = BTreeSet::new();

    for pattern in patterns {
      match PatternMatcher::parse(pattern)? {
        PatternMatcher::File(path) => {
          files.insert(path);
        }
        PatternMatcher::Dir(dir) => files.extend(self.traverse_directory(&dir)),
        PatternMatcher::Glob(glob) => {
          let matched = self.expand_glob(glob.as_str())?;
          if matched.is_empty() {
            warn!("Pattern matched no files: {}", pattern);
          }
          files.extend(matched);
        }
      }
    }

    debug!(
      "Collected {} files in {}ms",
      files.len(),
      start_time.elapsed().as_millis()
    );
    Ok(files.into_iter().collect())
  }

  /// Walk a directory recursively and return all regular files.
  pub fn traverse_directory(&self, dir: &Path) -> Vec<PathBuf> {
    debug!("Scanning directory: {}", dir.display());

    WalkBuilder::new(dir)
      .hidden(!self.include_hidden)
      .require_git(false)
      .build()
      .filter_map(|entry| match entry {
        Ok(entry) => Some(entry),
        Err(err) => {
          warn!("Skipping unreadable entry: {}", err);
          None
        }
      })
      .filter(|entry| entry.file_type().is_some_and(|file_type| file_type.is_file()))
      .map(|entry| entry.into_path())
      .collect()
  }

  fn expand_glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
    Ok(
      entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter(|path| self.include_hidden || !is_hidden(path))
        .collect(),
    )
  }
}

fn is_hidden(path: &Path) -> bool {
  path
    .file_name()
    .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Express `path` relative to `base` for display, falling back to the path
/// itself.
pub fn display_relative(path: &Path, base: &Path) -> PathBuf {
  if let Ok(stripped) = path.strip_prefix(base) {
    return stripped.to_path_buf();
  }
  if path.is_absolute()
    && let Some(relative) = pathdiff::diff_paths(path, base)
  {
    return relative;
  }
  path.to_path_buf()
}
