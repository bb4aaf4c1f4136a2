//! # Languages Module
//!
//! The comment syntax registry. A [`Language`] ties a set of file extensions
//! to the comment markers used by that language, and the
//! [`LanguageRegistry`] resolves a file path to the language that claims it.
//!
//! ## Example
//!
//! ```rust
//! use std::path::Path;
//!
//! use headerkit::languages::LanguageRegistry;
//!
//! let registry = LanguageRegistry::builtin();
//! let language = registry.resolve(Path::new("Form1.Designer.cs")).expect("C# is builtin");
//! assert_eq!(language.line_comment.as_deref(), Some("//"));
//! ```

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

/// A language definition: extensions plus comment syntax.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Language {
  /// Display name of the language
  pub name: String,

  /// Extensions claimed by the language, including the leading dot
  /// (e.g. ".cs", ".designer.cs"). Compared case-insensitively.
  pub extensions: Vec<String>,

  /// Marker that starts a line comment (e.g. "//")
  #[serde(default)]
  pub line_comment: Option<String>,

  /// Marker that opens a block comment (e.g. "/*")
  #[serde(default)]
  pub block_start: Option<String>,

  /// Marker that closes a block comment (e.g. "*/")
  #[serde(default)]
  pub block_end: Option<String>,

  /// Regular expression for a preamble that must stay above the header,
  /// matched at the start of the file (e.g. a shebang).
  #[serde(default)]
  pub skip_expression: Option<String>,
}

impl Language {
  /// Create a language that only has line comments.
  pub fn line(name: &str, extensions: &[&str], marker: &str) -> Self {
    Self {
      name: name.to_string(),
      extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
      line_comment: Some(marker.to_string()),
      block_start: None,
      block_end: None,
      skip_expression: None,
    }
  }

  /// Create a language that only has block comments.
  pub fn block(name: &str, extensions: &[&str], start: &str, end: &str) -> Self {
    Self {
      name: name.to_string(),
      extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
      line_comment: None,
      block_start: Some(start.to_string()),
      block_end: Some(end.to_string()),
      skip_expression: None,
    }
  }

  /// Add block comment markers to a language.
  pub fn with_block(mut self, start: &str, end: &str) -> Self {
    self.block_start = Some(start.to_string());
    self.block_end = Some(end.to_string());
    self
  }

  /// Add a skip expression to a language.
  pub fn with_skip(mut self, expression: &str) -> Self {
    self.skip_expression = Some(expression.to_string());
    self
  }

  /// The block comment markers, if both are defined.
  pub fn block_markers(&self) -> Option<(&str, &str)> {
    match (self.block_start.as_deref(), self.block_end.as_deref()) {
      (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => Some((start, end)),
      _ => None,
    }
  }

  /// The line comment marker, if defined and non-empty.
  pub fn line_marker(&self) -> Option<&str> {
    self.line_comment.as_deref().filter(|marker| !marker.is_empty())
  }

  /// Compile the skip expression, anchored to the start of the text.
  pub fn skip_regex(&self) -> Result<Option<Regex>, regex::Error> {
    match self.skip_expression.as_deref() {
      Some(expr) if !expr.is_empty() => Regex::new(&format!(r"\A(?:{})", expr)).map(Some),
      _ => Ok(None),
    }
  }

  /// Length of the longest extension of this language that is a suffix of
  /// `lowered_path`.
  fn longest_match(&self, lowered_path: &str) -> Option<usize> {
    self
      .extensions
      .iter()
      .filter(|ext| !ext.is_empty() && lowered_path.ends_with(&ext.to_lowercase()))
      .map(|ext| ext.len())
      .max()
  }
}

/// Ordered collection of language definitions.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
  languages: Vec<Language>,
}

impl LanguageRegistry {
  /// Create a registry from an explicit list. Registration order is the
  /// order of the list.
  pub const fn new(languages: Vec<Language>) -> Self {
    Self { languages }
  }

  /// Create a registry with the built-in language table.
  pub fn builtin() -> Self {
    Self::new(builtin_languages())
  }

  /// Append a language. It loses ties to every language registered before it.
  pub fn register(&mut self, language: Language) {
    self.languages.push(language);
  }

  pub fn languages(&self) -> &[Language] {
    &self.languages
  }

  /// Resolve the language for a path.
  ///
  /// Among all extensions of all languages that are case-insensitive
  /// suffixes of the path, the longest wins. Equal lengths resolve to the
  /// language registered first.
  pub fn resolve(&self, path: &Path) -> Option<&Language> {
    resolve_language(&path.to_string_lossy(), &self.languages)
  }
}

/// Resolve the language claiming `path` by longest extension suffix.
pub fn resolve_language<'a>(path: &str, languages: &'a [Language]) -> Option<&'a Language> {
  let lowered = path.to_lowercase();
  let mut best: Option<(usize, &Language)> = None;

  for language in languages {
    if let Some(len) = language.longest_match(&lowered)
      && best.is_none_or(|(best_len, _)| len > best_len)
    {
      best = Some((len, language));
    }
  }

  best.map(|(_, language)| language)
}

const XML_PREAMBLE: &str = r"(?s:<\?xml.*?\?>)(?:\s*(?i:<!doctype[^>]*>))?|(?i:<!doctype[^>]*>)";
const SCRIPT_PREAMBLE: &str =
  r"#!.*(?:\r?\n#.*\b(?:coding|frozen_string_literal)[:=].*)?|#.*\b(?:coding|frozen_string_literal)[:=].*";

/// The built-in language table.
///
/// Mirrors the most common extension families. `.txt` is registered with
/// `//` line comments so plain text files can carry a header too.
pub fn builtin_languages() -> Vec<Language> {
  vec![
    Language::line("C#", &[".cs", ".designer.cs", ".xaml.cs", ".cshtml.cs"], "//").with_block("/*", "*/"),
    Language::line("C/C++", &[".c", ".h", ".cc", ".cpp", ".cxx", ".hh", ".hpp", ".hxx"], "//")
      .with_block("/*", "*/"),
    Language::line(
      "Java/Kotlin/Scala",
      &[".java", ".kt", ".kts", ".scala", ".groovy", ".gradle"],
      "//",
    )
    .with_block("/*", "*/"),
    Language::line(
      "JavaScript/TypeScript",
      &[".js", ".mjs", ".cjs", ".jsx", ".ts", ".tsx"],
      "//",
    )
    .with_block("/*", "*/")
    .with_skip(r"#!.*"),
    Language::line("Rust", &[".rs"], "//").with_block("/*", "*/"),
    Language::line("Go", &[".go"], "//").with_block("/*", "*/"),
    Language::line("Swift/Dart", &[".swift", ".dart", ".m", ".mm", ".proto"], "//").with_block("/*", "*/"),
    Language::line("F#", &[".fs", ".fsi", ".fsx"], "//").with_block("(*", "*)"),
    Language::line("PHP", &[".php"], "//")
      .with_block("/*", "*/")
      .with_skip(r"<\?php"),
    Language::line("SCSS/Less", &[".scss", ".less"], "//").with_block("/*", "*/"),
    Language::block("CSS", &[".css"], "/*", "*/"),
    Language::line(
      "Script",
      &[
        ".py", ".sh", ".bash", ".zsh", ".rb", ".pl", ".pm", ".r", ".yaml", ".yml", ".toml", ".tf", ".bzl", ".cmake",
      ],
      "#",
    )
    .with_skip(SCRIPT_PREAMBLE),
    Language::line("PowerShell", &[".ps1", ".psm1", ".psd1"], "#").with_block("<#", "#>"),
    Language::line("SQL/Haskell/Lua", &[".sql", ".hs", ".lua", ".ada", ".adb", ".ads"], "--"),
    Language::line("Lisp", &[".el", ".lisp", ".clj", ".cljs", ".scm"], ";;"),
    Language::line("Erlang", &[".erl", ".hrl", ".tex"], "%"),
    Language::line("Visual Basic", &[".vb", ".bas", ".vbs"], "'"),
    Language::block(
      "XML",
      &[
        ".xml", ".html", ".htm", ".xhtml", ".xaml", ".config", ".csproj", ".props", ".targets", ".resx", ".vue", ".svg",
      ],
      "<!--",
      "-->",
    )
    .with_skip(XML_PREAMBLE),
    Language::block("OCaml", &[".ml", ".mli", ".mll", ".mly"], "(*", "*)"),
    Language::line("Text", &[".txt"], "//"),
  ]
}
