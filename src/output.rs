//! # Output Module
//!
//! User-facing output for the headerkit CLI: start message, changed files,
//! errors and the final summary.
//!
//! - Normal mode prints counts and truncated file lists
//! - `-v` prints every file
//! - `-q` prints only paths, one per line, for scripting

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use crate::error::{ErrorKind, ReplacerError};
use crate::logging::{is_quiet, is_verbose};
use crate::replacer::{BatchResult, FileChange, display_relative};

/// Symbols used in output
pub mod symbols {
  /// Success
  pub const SUCCESS: &str = "\u{2713}"; // ✓
  /// Failure
  pub const FAILURE: &str = "\u{2717}"; // ✗
  /// Header rewritten
  pub const UPDATED: &str = "\u{21bb}"; // ↻
}

/// Maximum number of files to show in the default output before truncating
const DEFAULT_FILE_LIST_LIMIT: usize = 20;

fn plural(count: usize) -> &'static str {
  if count == 1 { "file" } else { "files" }
}

/// Print "Processing N files..." or "Checking N files...".
pub fn print_start_message(file_count: usize, modify_mode: bool) {
  if is_quiet() {
    return;
  }
  let verb = if modify_mode { "Processing" } else { "Checking" };
  println!("{} {} {}...", verb, file_count, plural(file_count));
}

/// Print the files whose header was (or would be) rewritten.
pub fn print_changed_files(changes: &[FileChange], root: &Path, modify_mode: bool) {
  if changes.is_empty() {
    return;
  }

  if is_quiet() {
    for change in changes {
      println!("{}", display_relative(&change.path, root).display());
    }
    return;
  }

  let count = changes.len();
  let verb = if modify_mode { "updated" } else { "need a header update" };
  println!(
    "{} {} {} {}:",
    symbols::UPDATED.if_supports_color(Stream::Stdout, |s| s.yellow()),
    count,
    plural(count),
    verb
  );

  let limit = if is_verbose() { count } else { DEFAULT_FILE_LIST_LIMIT };
  for change in changes.iter().take(limit) {
    println!("  {}", display_relative(&change.path, root).display());
  }
  if count > limit {
    println!("  ... and {} more (use -v to see all)", count - limit);
  }
}

/// Print the captured errors grouped by kind. Errors go to stderr.
pub fn print_errors(errors: &[ReplacerError], root: &Path) {
  if errors.is_empty() {
    return;
  }

  let mut by_kind: BTreeMap<String, Vec<&ReplacerError>> = BTreeMap::new();
  for error in errors {
    by_kind.entry(error.kind.to_string()).or_default().push(error);
  }

  for (kind, group) in by_kind {
    eprintln!(
      "{} {} {} with {}:",
      symbols::FAILURE.if_supports_color(Stream::Stderr, |s| s.red()),
      group.len(),
      plural(group.len()),
      kind
    );
    for error in group {
      eprintln!("  {}: {}", display_relative(&error.path, root).display(), error.message);
    }
  }
}

/// Print the summary line.
pub fn print_summary(result: &BatchResult, elapsed: Duration, modify_mode: bool) {
  if is_quiet() {
    return;
  }

  let changed = result.changes.len();
  let mut parts = vec![format!("{} processed", result.processed)];
  if changed > 0 {
    parts.push(format!("{} {}", changed, if modify_mode { "updated" } else { "to update" }));
  }
  if !result.errors.is_empty() {
    parts.push(format!("{} failed", result.errors.len()));
  }

  println!();
  println!(
    "{} in {:.2}s",
    parts.join(", ").if_supports_color(Stream::Stdout, |s| s.bold()),
    elapsed.as_secs_f64()
  );
}

/// Print the line shown when nothing needs to change.
pub fn print_all_files_ok() {
  if is_quiet() {
    return;
  }
  println!(
    "{} All files have the expected header",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green())
  );
}

/// Print a dimmed hint.
pub fn print_hint(message: &str) {
  if is_quiet() {
    return;
  }
  println!("{}", message.if_supports_color(Stream::Stdout, |s| s.dimmed()));
}

/// Count errors per kind.
pub fn count_by_kind(errors: &[ReplacerError]) -> BTreeMap<String, usize> {
  let mut counts = BTreeMap::new();
  for error in errors {
    *counts.entry(kebab(error.kind)).or_insert(0) += 1;
  }
  counts
}

fn kebab(kind: ErrorKind) -> String {
  serde_json::to_value(kind)
    .ok()
    .and_then(|value| value.as_str().map(str::to_string))
    .unwrap_or_else(|| kind.to_string())
}

/// Write the batch errors as JSON.
pub fn write_json_report(path: &Path, result: &BatchResult) -> Result<()> {
  let report = serde_json::json!({
    "processed": result.processed,
    "changed": result.changes,
    "errors": result.errors,
    "error_counts": count_by_kind(&result.errors),
  });
  let text = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
  std::fs::write(path, text).with_context(|| format!("Failed to write report: {}", path.display()))
}
