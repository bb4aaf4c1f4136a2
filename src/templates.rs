//! # Templates Module
//!
//! Header templates keyed by file extension, the longest-suffix resolver that
//! picks a template for a path, and the header definition file format.
//!
//! A header definition file looks like this:
//!
//! ```text
//! extensions: .cs .designer.cs
//! // Copyright (c) %CurrentYear% Example Corp.
//! // Licensed under the MIT license.
//!
//! extensions: .xml .config
//! <!-- Copyright (c) %CurrentYear% Example Corp. -->
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::path::Path;
//!
//! use headerkit::templates::{HeaderTemplates, TemplateResolution, parse_definition};
//!
//! let templates = parse_definition("extensions: .rs\n// Copyright %CurrentYear%\n");
//! match templates.resolve(Path::new("src/main.rs")) {
//!   TemplateResolution::Template(lines) => assert_eq!(lines, ["// Copyright %CurrentYear%"]),
//!   other => panic!("unexpected {:?}", other),
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};

use crate::verbose_log;

/// Extension of header definition files. Paths ending in it are never
/// rewritten.
pub const DEFINITION_EXTENSION: &str = ".licenseheader";

const EXTENSIONS_DIRECTIVE: &str = "extensions:";

/// Whether a path names a header definition file.
pub fn is_definition_file(path: &Path) -> bool {
  path.to_string_lossy().to_lowercase().ends_with(DEFINITION_EXTENSION)
}

/// Ordered map from extension to template lines.
///
/// Insertion order is significant: when two keys of equal length match a
/// path, the one inserted first wins. A `None` value stands for an empty
/// template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTemplates {
  entries: Vec<(String, Option<Vec<String>>)>,
}

/// Result of resolving a template for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateResolution<'a> {
  /// A template with at least one non-blank line
  Template(&'a [String]),
  /// The matching template is blank; remove any existing header
  EmptyHeader,
  /// No key matches the path
  NoHeaderFound,
}

impl HeaderTemplates {
  pub const fn new() -> Self {
    Self { entries: Vec::new() }
  }

  /// Insert or replace the template for an extension. Replacing keeps the
  /// original position.
  pub fn insert(&mut self, extension: impl Into<String>, lines: Option<Vec<String>>) {
    let extension = extension.into();
    if let Some(entry) = self
      .entries
      .iter_mut()
      .find(|(existing, _)| existing.eq_ignore_ascii_case(&extension))
    {
      entry.1 = lines;
    } else {
      self.entries.push((extension, lines));
    }
  }

  /// Builder-style [`insert`](Self::insert) taking string slices.
  pub fn with(mut self, extension: &str, lines: &[&str]) -> Self {
    self.insert(extension, Some(lines.iter().map(|line| line.to_string()).collect()));
    self
  }

  /// Builder-style insert of an empty (`None`) template.
  pub fn with_empty(mut self, extension: &str) -> Self {
    self.insert(extension, None);
    self
  }

  pub const fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub const fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn extensions(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(ext, _)| ext.as_str())
  }

  /// Merge another set of templates into this one; entries of `other` win.
  pub fn merge(&mut self, other: HeaderTemplates) {
    for (extension, lines) in other.entries {
      self.insert(extension, lines);
    }
  }

  /// Select the template for a path by longest case-insensitive suffix.
  pub fn resolve(&self, path: &Path) -> TemplateResolution<'_> {
    let lowered = path.to_string_lossy().to_lowercase();

    let mut best: Option<(usize, &Option<Vec<String>>)> = None;
    for (extension, lines) in &self.entries {
      if extension.is_empty() || !lowered.ends_with(&extension.to_lowercase()) {
        continue;
      }
      if best.is_none_or(|(len, _)| extension.len() > len) {
        best = Some((extension.len(), lines));
      }
    }

    match best {
      None => TemplateResolution::NoHeaderFound,
      Some((_, None)) => TemplateResolution::EmptyHeader,
      Some((_, Some(lines))) if is_blank(lines) => TemplateResolution::EmptyHeader,
      Some((_, Some(lines))) => TemplateResolution::Template(lines),
    }
  }
}

impl<K: Into<String>> FromIterator<(K, Option<Vec<String>>)> for HeaderTemplates {
  fn from_iter<T: IntoIterator<Item = (K, Option<Vec<String>>)>>(iter: T) -> Self {
    let mut templates = HeaderTemplates::new();
    for (extension, lines) in iter {
      templates.insert(extension, lines);
    }
    templates
  }
}

/// Whether every line of a template is empty or whitespace.
pub fn is_blank(lines: &[String]) -> bool {
  lines.iter().all(|line| line.trim().is_empty())
}

/// Resolve a template in an optional map. `None` means removal-only mode, in
/// which no resolution happens and the caller removes existing headers.
pub fn resolve_template<'a>(path: &Path, templates: Option<&'a HeaderTemplates>) -> Option<TemplateResolution<'a>> {
  templates.map(|templates| templates.resolve(path))
}

/// Parse the text of a header definition file.
///
/// Each `extensions:` line starts a block; every following line until the
/// next `extensions:` line is copied verbatim into the block's template.
/// Trailing blank lines of a block only separate blocks and are dropped.
/// Lines before the first directive are ignored.
pub fn parse_definition(text: &str) -> HeaderTemplates {
  let mut templates = HeaderTemplates::new();
  let mut current: Option<(Vec<String>, Vec<String>)> = None;

  for line in text.lines() {
    if let Some(rest) = strip_directive(line) {
      if let Some((extensions, lines)) = current.take() {
        push_block(&mut templates, extensions, lines);
      }
      let extensions = rest.split_whitespace().map(normalize_extension).collect();
      current = Some((extensions, Vec::new()));
    } else if let Some((_, lines)) = current.as_mut() {
      lines.push(line.to_string());
    }
  }

  if let Some((extensions, lines)) = current {
    push_block(&mut templates, extensions, lines);
  }

  templates
}

/// Read and parse a header definition file.
pub fn load_definition(path: &Path) -> Result<HeaderTemplates> {
  verbose_log!("Loading header definition from: {}", path.display());

  let text = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read header definition file: {}", path.display()))?;

  let templates = parse_definition(&text);
  if templates.is_empty() {
    anyhow::bail!(
      "Header definition file {} does not contain any '{}' block",
      path.display(),
      EXTENSIONS_DIRECTIVE
    );
  }

  verbose_log!("Loaded templates for {} extensions", templates.len());
  Ok(templates)
}

fn strip_directive(line: &str) -> Option<&str> {
  let trimmed = line.trim_start();
  let head = trimmed.get(..EXTENSIONS_DIRECTIVE.len())?;
  if head.eq_ignore_ascii_case(EXTENSIONS_DIRECTIVE) {
    trimmed.get(EXTENSIONS_DIRECTIVE.len()..)
  } else {
    None
  }
}

/// Extensions in definition files may be written with or without the dot.
pub fn normalize_extension(extension: &str) -> String {
  if extension.starts_with('.') {
    extension.to_string()
  } else {
    format!(".{}", extension)
  }
}

fn push_block(templates: &mut HeaderTemplates, extensions: Vec<String>, mut lines: Vec<String>) {
  while lines.last().is_some_and(|line| line.trim().is_empty()) {
    lines.pop();
  }
  for extension in extensions {
    templates.insert(extension, Some(lines.clone()));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolve_longest_suffix() {
    let templates = HeaderTemplates::new()
      .with(".cs", &["// generic"])
      .with(".designer.cs", &["// designer"]);

    assert_eq!(
      templates.resolve(Path::new("Form.Designer.cs")),
      TemplateResolution::Template(&["// designer".to_string()])
    );
    assert_eq!(
      templates.resolve(Path::new("Program.CS")),
      TemplateResolution::Template(&["// generic".to_string()])
    );
  }

  #[test]
  fn test_resolve_no_match() {
    let templates = HeaderTemplates::new().with(".cs", &["// x"]);
    assert_eq!(templates.resolve(Path::new("a.rs")), TemplateResolution::NoHeaderFound);
  }

  #[test]
  fn test_resolve_blank_template_is_empty_header() {
    let templates = HeaderTemplates::new().with(".cs", &["", "   "]).with_empty(".txt");
    assert_eq!(templates.resolve(Path::new("a.cs")), TemplateResolution::EmptyHeader);
    assert_eq!(templates.resolve(Path::new("a.txt")), TemplateResolution::EmptyHeader);
  }

  #[test]
  fn test_removal_mode_skips_resolution() {
    assert_eq!(resolve_template(Path::new("a.cs"), None), None);
  }

  #[test]
  fn test_insert_replaces_in_place() {
    let mut templates = HeaderTemplates::new().with(".a", &["1"]).with(".b", &["2"]);
    templates.insert(".A", Some(vec!["3".to_string()]));
    let order: Vec<&str> = templates.extensions().collect();
    assert_eq!(order, [".a", ".b"]);
    assert_eq!(
      templates.resolve(Path::new("x.a")),
      TemplateResolution::Template(&["3".to_string()])
    );
  }

  #[test]
  fn test_parse_definition_blocks() {
    let text = concat!(
      "ignored preamble\n",
      "extensions: .cs designer.cs\n",
      "// Copyright %CurrentYear%\n",
      "//\n",
      "// Licensed under MIT\n",
      "\n",
      "\n",
      "Extensions: .xml\n",
      "<!-- Copyright -->\n",
    );

    let templates = parse_definition(text);
    assert_eq!(templates.len(), 3);

    let cs = vec![
      "// Copyright %CurrentYear%".to_string(),
      "//".to_string(),
      "// Licensed under MIT".to_string(),
    ];
    assert_eq!(templates.resolve(Path::new("a.cs")), TemplateResolution::Template(&cs));
    assert_eq!(templates.resolve(Path::new("a.designer.cs")), TemplateResolution::Template(&cs));
    assert_eq!(
      templates.resolve(Path::new("a.xml")),
      TemplateResolution::Template(&["<!-- Copyright -->".to_string()])
    );
  }

  #[test]
  fn test_parse_definition_keeps_interior_blank_lines() {
    let templates = parse_definition("extensions: .rs\n// a\n\n// b\n\n");
    assert_eq!(
      templates.resolve(Path::new("x.rs")),
      TemplateResolution::Template(&["// a".to_string(), String::new(), "// b".to_string()])
    );
  }

  #[test]
  fn test_parse_definition_empty_block_requests_removal() {
    let templates = parse_definition("extensions: .txt\n\nextensions: .rs\n// x\n");
    assert_eq!(templates.resolve(Path::new("notes.txt")), TemplateResolution::EmptyHeader);
  }

  #[test]
  fn test_is_definition_file() {
    assert!(is_definition_file(Path::new("solution.licenseheader")));
    assert!(is_definition_file(Path::new("dir/Project.LicenseHeader")));
    assert!(!is_definition_file(Path::new("main.rs")));
  }

  #[test]
  fn test_load_definition_rejects_empty_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.licenseheader");
    std::fs::write(&path, "no directives here\n").expect("write");
    assert!(load_definition(&path).is_err());
  }
}
