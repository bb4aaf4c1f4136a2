//! # Diff Module
//!
//! Renders the difference between a file's current content and the content a
//! header job would give it. Used by `--show-diff`.

use std::path::Path;

use owo_colors::{OwoColorize, Stream};
use similar::{ChangeTag, TextDiff};

/// Renders diffs for header changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffManager {
  /// Lines of unchanged context around each change
  context_lines: usize,
}

impl DiffManager {
  pub const fn new(context_lines: usize) -> Self {
    Self { context_lines }
  }

  /// Render a unified diff without colors.
  ///
  /// # Parameters
  ///
  /// * `path` - Path shown in the diff header
  /// * `original` - Original file content
  /// * `new` - New file content
  pub fn render(&self, path: &Path, original: &str, new: &str) -> String {
    if original == new {
      return String::new();
    }
    let name = path.display().to_string();
    TextDiff::from_lines(original, new)
      .unified_diff()
      .context_radius(self.context_lines)
      .header(&format!("a/{}", name), &format!("b/{}", name))
      .to_string()
  }

  /// Print a colored diff to stderr.
  pub fn display_diff(&self, path: &Path, original: &str, new: &str) {
    let diff = TextDiff::from_lines(original, new);

    eprintln!("{}", format!("--- a/{}", path.display()).if_supports_color(Stream::Stderr, |s| s.bold()));
    eprintln!("{}", format!("+++ b/{}", path.display()).if_supports_color(Stream::Stderr, |s| s.bold()));

    for group in diff.grouped_ops(self.context_lines) {
      for op in group {
        for change in diff.iter_changes(&op) {
          let line = format!("{}{}", sign(change.tag()), change.value().trim_end_matches(['\r', '\n']));
          match change.tag() {
            ChangeTag::Delete => eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.red())),
            ChangeTag::Insert => eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.green())),
            ChangeTag::Equal => eprintln!("{}", line),
          }
        }
      }
    }
    eprintln!();
  }
}

const fn sign(tag: ChangeTag) -> &'static str {
  match tag {
    ChangeTag::Delete => "-",
    ChangeTag::Insert => "+",
    ChangeTag::Equal => " ",
  }
}
