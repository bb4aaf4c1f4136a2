//! # Document Module
//!
//! The header engine for a single file. A [`Document`] combines the file
//! content, its language and the expanded header, and computes the minimal
//! rewrite that puts the header in place.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{Local, TimeZone};
//! use headerkit::document::Document;
//! use headerkit::languages::Language;
//! use headerkit::tokens::DocumentContext;
//!
//! let language = Language::line("C#", &[".cs"], "//").with_block("/*", "*/");
//! let now = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid date");
//! let ctx = DocumentContext::for_content("Program.cs").with_now(now);
//! let template = vec!["// Copyright %CurrentYear%".to_string()];
//!
//! let document = Document::new("using System;\n", &language, Some(&template), &ctx).expect("valid language");
//! let rewritten = document.replace_header_if_necessary().expect("parses");
//! assert_eq!(rewritten.as_deref(), Some("// Copyright 2024\nusing System;\n"));
//! ```

pub mod parser;
pub mod prefix;

use regex::Regex;
use tracing::trace;

pub use self::parser::{CommentSyntax, HeaderParseError, Region, parse_region};
use crate::languages::Language;
use crate::templates::is_blank;
use crate::tokens::{DocumentContext, expand};

/// The language's skip expression is not a valid regular expression.
#[derive(Debug, thiserror::Error)]
#[error("invalid skip expression for language '{language}'")]
pub struct InvalidSkipExpression {
  pub language: String,
  #[source]
  pub source: regex::Error,
}

/// One file's content prepared for header replacement.
#[derive(Debug)]
pub struct Document<'a> {
  content: &'a str,
  language: &'a Language,
  /// Expanded header wrapped in comment syntax; `None` removes the header
  header: Option<Vec<String>>,
  keywords: Option<&'a [String]>,
  separator_lines: usize,
  skip: Option<Regex>,
}

impl<'a> Document<'a> {
  /// Prepare a document.
  ///
  /// # Parameters
  ///
  /// * `content` - Current file content
  /// * `language` - Comment syntax of the file
  /// * `template` - Raw template lines; `None` or an all-blank template means
  ///   the existing header is removed
  /// * `ctx` - Context the template tokens are expanded against
  pub fn new(
    content: &'a str,
    language: &'a Language,
    template: Option<&[String]>,
    ctx: &DocumentContext,
  ) -> Result<Self, InvalidSkipExpression> {
    let skip = language.skip_regex().map_err(|source| InvalidSkipExpression {
      language: language.name.clone(),
      source,
    })?;

    let header = template
      .filter(|lines| !is_blank(lines))
      .map(|lines| wrap_template(&expand(lines, ctx), language));

    Ok(Self {
      content,
      language,
      header,
      keywords: None,
      separator_lines: 0,
      skip,
    })
  }

  /// Only treat existing comment regions containing one of these keywords
  /// (case-insensitive) as license headers. An empty list disables the filter.
  pub fn with_keywords(mut self, keywords: Option<&'a [String]>) -> Self {
    self.keywords = keywords.filter(|keywords| !keywords.is_empty());
    self
  }

  /// Blank lines written between a freshly inserted header and the rest of
  /// the file when the template does not end with blank lines itself.
  pub const fn with_separator_lines(mut self, lines: usize) -> Self {
    self.separator_lines = lines;
    self
  }

  fn syntax(&self) -> CommentSyntax<'a> {
    CommentSyntax::of(self.language)
  }

  /// Whether the header to be written consists of comments only.
  ///
  /// The header is parsed like the top of a file; anything left after the
  /// comment region (code, text after a block end marker, an unterminated
  /// block) makes it invalid. Removal is always valid.
  pub fn validate_header(&self) -> bool {
    let Some(header) = &self.header else {
      return true;
    };
    let text = format!("{}\n", header.join("\n"));
    match parse_region(&text, self.syntax()) {
      Ok(region) => region.body.trim().is_empty(),
      Err(err) => {
        trace!("Header does not parse as a comment: {}", err);
        false
      }
    }
  }

  /// Compute the new content, or `None` when the file already has the
  /// expected header (or, when removing, has no header).
  ///
  /// A leading byte order mark stays the first thing in the file.
  ///
  /// # Errors
  ///
  /// Fails when the file's leading comment region does not parse.
  pub fn replace_header_if_necessary(&self) -> Result<Option<String>, HeaderParseError> {
    let (bom, text) = split_bom(self.content);
    let (preamble, rest) = prefix::split_preamble(text, self.skip.as_ref());
    let newline = detect_newline(self.content);

    if let Some(header) = &self.header {
      let (core, _) = split_trailing_blank(header);
      // The parser only reads back the comment part of a header with code in it
      if !self.validate_header() && starts_with_lines(&rest[leading_blank(rest).len()..], core, newline) {
        return Ok(None);
      }
    }

    let region = parse_region(rest, self.syntax())?;
    let body = if region.has_comments() && !region.comments.ends_with('\n') {
      // Block comment closed mid-line
      region.body.strip_prefix([' ', '\t']).unwrap_or(region.body)
    } else {
      region.body
    };

    let Some(header) = &self.header else {
      if !region.has_comments() || !self.is_license_header(region.comments) {
        return Ok(None);
      }
      return Ok(Some(format!("{}{}{}{}", bom, preamble, region.leading, body)));
    };

    let (core, template_blank_lines) = split_trailing_blank(header);
    let existing = region.comment_lines();

    if region.has_comments() {
      if lines_equal(&existing, core) || self.header_above_foreign_comment(&existing, core) {
        return Ok(None);
      }

      if self.is_license_header(region.comments) {
        // Trailing blank lines and body are contiguous at the end of the text
        let after_comments = &rest[rest.len() - region.trailing.len() - body.len()..];
        let tail = self.non_comment_tail(core);
        let mut out = String::with_capacity(self.content.len());
        out.push_str(bom);
        out.push_str(preamble);
        out.push_str(region.leading);
        push_lines(&mut out, core, newline);
        match strip_lines(after_comments, tail, newline) {
          Some(remainder) => out.push_str(remainder),
          None => out.push_str(after_comments),
        }
        return Ok(Some(out));
      }
    }

    let remainder = region.after_leading(rest);
    let mut separator = if template_blank_lines > 0 {
      template_blank_lines
    } else {
      self.separator_lines
    };
    // A comment directly below the header would be read as part of it
    if region.has_comments() {
      separator = separator.max(1);
    }
    if remainder.is_empty() {
      separator = 0;
    }

    let mut out = String::with_capacity(self.content.len() + core.len() * 80);
    out.push_str(bom);
    out.push_str(preamble);
    if !preamble.is_empty() && !preamble.ends_with('\n') {
      out.push_str(newline);
    }
    out.push_str(region.leading);
    push_lines(&mut out, core, newline);
    for _ in 0..separator {
      out.push_str(newline);
    }
    out.push_str(remainder);
    Ok(Some(out))
  }

  fn is_license_header(&self, comments: &str) -> bool {
    match self.keywords {
      None => true,
      Some(keywords) => contains_keyword(comments, keywords),
    }
  }

  /// The lines of a header that follow its comment region, such as code
  /// accepted into an invalid header. Empty for a comment-only header.
  fn non_comment_tail<'h>(&self, core: &'h [String]) -> &'h [String] {
    let text = core.join("\n") + "\n";
    let Ok(region) = parse_region(&text, self.syntax()) else {
      return &[];
    };
    if !region.comments.ends_with('\n') {
      return &[];
    }
    let consumed = region.leading.lines().count() + region.comments.lines().count();
    &core[consumed.min(core.len())..]
  }

  /// With keywords configured, a header inserted above an unrelated comment
  /// reads back as header, blank line, unrelated comment.
  fn header_above_foreign_comment(&self, existing: &[&str], core: &[String]) -> bool {
    let Some(keywords) = self.keywords else {
      return false;
    };
    if existing.len() <= core.len() || !lines_equal(&existing[..core.len()], core) {
      return false;
    }
    if !existing[core.len()].trim().is_empty() {
      return false;
    }
    !contains_keyword(&existing[core.len()..].join("\n"), keywords)
  }
}

/// Wrap template lines in a language's comment syntax.
///
/// Templates whose first non-blank line already starts with a comment marker
/// are returned as they are. Otherwise line comment languages get one marker
/// per line and block-only languages get a single block. Trailing blank lines
/// stay outside the comment.
pub fn wrap_template(lines: &[String], language: &Language) -> Vec<String> {
  let (core, blank_lines) = split_trailing_blank(lines);

  let first = core.iter().map(|line| line.trim_start()).find(|line| !line.is_empty());
  let already_commented = first.is_some_and(|line| {
    language.line_marker().is_some_and(|marker| line.starts_with(marker))
      || language.block_markers().is_some_and(|(start, _)| line.starts_with(start))
  });

  let mut wrapped: Vec<String> = if already_commented {
    core.to_vec()
  } else if let Some(marker) = language.line_marker() {
    core
      .iter()
      .map(|line| {
        if line.trim().is_empty() {
          marker.to_string()
        } else {
          format!("{} {}", marker, line)
        }
      })
      .collect()
  } else if let Some((start, end)) = language.block_markers() {
    match core {
      [single] => vec![format!("{} {} {}", start, single, end)],
      _ => std::iter::once(start.to_string())
        .chain(core.iter().cloned())
        .chain(std::iter::once(end.to_string()))
        .collect(),
    }
  } else {
    core.to_vec()
  };

  wrapped.extend(std::iter::repeat_n(String::new(), blank_lines));
  wrapped
}

fn split_bom(content: &str) -> (&str, &str) {
  match content.strip_prefix('\u{feff}') {
    Some(text) => (&content[..content.len() - text.len()], text),
    None => ("", content),
  }
}

/// The blank lines at the start of `text`.
fn leading_blank(text: &str) -> &str {
  let mut end = 0;
  for line in text.split_inclusive('\n') {
    if !line.ends_with('\n') || !line.trim().is_empty() {
      break;
    }
    end += line.len();
  }
  &text[..end]
}

/// Whether `text` starts with `lines`, each terminated by `newline` except
/// possibly the last one at the end of the text.
fn starts_with_lines(text: &str, lines: &[String], newline: &str) -> bool {
  strip_lines(text, lines, newline).is_some()
}

/// `text` without its leading `lines`, or `None` when it does not start with
/// them. An empty `lines` never matches.
fn strip_lines<'t>(text: &'t str, lines: &[String], newline: &str) -> Option<&'t str> {
  if lines.is_empty() {
    return None;
  }
  let joined = lines.join(newline);
  let rest = text.strip_prefix(joined.as_str())?;
  if rest.is_empty() {
    Some(rest)
  } else {
    rest.strip_prefix(newline)
  }
}

/// Split off trailing blank lines. Returns the remaining lines and how many
/// blank lines were removed.
fn split_trailing_blank(lines: &[String]) -> (&[String], usize) {
  let keep = lines
    .iter()
    .rposition(|line| !line.trim().is_empty())
    .map_or(0, |idx| idx + 1);
  (&lines[..keep], lines.len() - keep)
}

fn lines_equal(existing: &[&str], expected: &[String]) -> bool {
  existing.len() == expected.len() && existing.iter().zip(expected).all(|(a, b)| *a == b.as_str())
}

fn push_lines(out: &mut String, lines: &[String], newline: &str) {
  for line in lines {
    out.push_str(line);
    out.push_str(newline);
  }
}

/// Whether `text` contains any keyword, ignoring case.
pub fn contains_keyword(text: &str, keywords: &[String]) -> bool {
  let lowered = text.to_lowercase();
  keywords
    .iter()
    .filter(|keyword| !keyword.is_empty())
    .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

/// The newline convention of a text: `\r\n` when its first line break is
/// one, `\n` otherwise.
pub fn detect_newline(text: &str) -> &'static str {
  match text.find('\n') {
    Some(idx) if text[..idx].ends_with('\r') => "\r\n",
    _ => "\n",
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Local, TimeZone};

  use super::*;

  fn csharp() -> Language {
    Language::line("C#", &[".cs"], "//").with_block("/*", "*/")
  }

  fn ctx() -> DocumentContext {
    let now = Local
      .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
      .single()
      .expect("unambiguous local time");
    DocumentContext::for_content("File.cs").with_now(now)
  }

  fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(|line| line.to_string()).collect()
  }

  fn replace(content: &str, language: &Language, template: Option<&[String]>) -> Option<String> {
    Document::new(content, language, template, &ctx())
      .expect("skip expression compiles")
      .replace_header_if_necessary()
      .expect("parses")
  }

  #[test]
  fn test_insert_into_file_without_header() {
    let template = lines(&["// Copyright %CurrentYear%"]);
    assert_eq!(
      replace("using System;\n", &csharp(), Some(&template)).as_deref(),
      Some("// Copyright 2024\nusing System;\n")
    );
  }

  #[test]
  fn test_remove_header() {
    let text = Language::line("Text", &[".txt"], "//");
    assert_eq!(replace("// old header\nbody\n", &text, None).as_deref(), Some("body\n"));
  }

  #[test]
  fn test_remove_takes_separator_with_it() {
    assert_eq!(
      replace("// old\n// header\n\n\nbody\n", &csharp(), None).as_deref(),
      Some("body\n")
    );
  }

  #[test]
  fn test_remove_without_header_is_noop() {
    assert_eq!(replace("body\n", &csharp(), None), None);
    assert_eq!(replace("", &csharp(), None), None);
  }

  #[test]
  fn test_blank_template_removes() {
    let template = lines(&["", "  "]);
    assert_eq!(replace("// x\ncode", &csharp(), Some(&template)).as_deref(), Some("code"));
  }

  #[test]
  fn test_matching_header_is_unchanged() {
    let template = lines(&["// Copyright %CurrentYear%"]);
    assert_eq!(replace("// Copyright 2024\n\ncode\n", &csharp(), Some(&template)), None);
  }

  #[test]
  fn test_replace_keeps_separator_and_body() {
    let template = lines(&["// Copyright %CurrentYear%", "// All rights reserved"]);
    assert_eq!(
      replace("// Copyright 2019\n\n\ncode\n", &csharp(), Some(&template)).as_deref(),
      Some("// Copyright 2024\n// All rights reserved\n\n\ncode\n")
    );
  }

  #[test]
  fn test_replace_block_header() {
    let template = lines(&["/* Copyright %CurrentYear% */"]);
    assert_eq!(
      replace("/*\n * Copyright 2019\n */\nclass A {}\n", &csharp(), Some(&template)).as_deref(),
      Some("/* Copyright 2024 */\nclass A {}\n")
    );
  }

  #[test]
  fn test_second_run_is_idempotent() {
    let template = lines(&["// Copyright %CurrentYear%", ""]);
    let first = replace("namespace A;\n", &csharp(), Some(&template)).expect("inserted");
    assert_eq!(first, "// Copyright 2024\n\nnamespace A;\n");
    assert_eq!(replace(&first, &csharp(), Some(&template)), None);
  }

  #[test]
  fn test_separator_lines_option() {
    let language = csharp();
    let template = lines(&["// Copyright"]);
    let document = Document::new("code\n", &language, Some(&template), &ctx())
      .expect("document")
      .with_separator_lines(2);
    assert_eq!(
      document.replace_header_if_necessary().expect("parses").as_deref(),
      Some("// Copyright\n\n\ncode\n")
    );
  }

  #[test]
  fn test_parse_error_is_reported() {
    let template = lines(&["// Copyright"]);
    let language = csharp();
    let document = Document::new("/* open\ncode\n", &language, Some(&template), &ctx()).expect("document");
    assert!(matches!(
      document.replace_header_if_necessary(),
      Err(HeaderParseError::UnterminatedBlockComment { line: 1, .. })
    ));
  }

  #[test]
  fn test_keywords_keep_foreign_comment() {
    let language = csharp();
    let template = lines(&["// Copyright %CurrentYear%"]);
    let keywords = lines(&["copyright"]);

    let content = "// Helper utilities\nclass A {}\n";
    let document = Document::new(content, &language, Some(&template), &ctx())
      .expect("document")
      .with_keywords(Some(&keywords));
    let first = document
      .replace_header_if_necessary()
      .expect("parses")
      .expect("inserted");
    assert_eq!(first, "// Copyright 2024\n\n// Helper utilities\nclass A {}\n");

    let document = Document::new(&first, &language, Some(&template), &ctx())
      .expect("document")
      .with_keywords(Some(&keywords));
    assert_eq!(document.replace_header_if_necessary().expect("parses"), None);
  }

  #[test]
  fn test_keywords_replace_license_comment() {
    let language = csharp();
    let template = lines(&["// Copyright %CurrentYear% Acme"]);
    let keywords = lines(&["COPYRIGHT"]);
    let document = Document::new("// copyright 2001 Old Corp\ncode\n", &language, Some(&template), &ctx())
      .expect("document")
      .with_keywords(Some(&keywords));
    assert_eq!(
      document.replace_header_if_necessary().expect("parses").as_deref(),
      Some("// Copyright 2024 Acme\ncode\n")
    );
  }

  #[test]
  fn test_keywords_protect_comment_from_removal() {
    let language = csharp();
    let keywords = lines(&["license"]);
    let document = Document::new("// just a note\ncode\n", &language, None, &ctx())
      .expect("document")
      .with_keywords(Some(&keywords));
    assert_eq!(document.replace_header_if_necessary().expect("parses"), None);
  }

  #[test]
  fn test_preamble_stays_on_top() {
    let shell = Language::line("Shell", &[".sh"], "#").with_skip(r"#!.*");
    let template = lines(&["# Copyright %CurrentYear%"]);
    assert_eq!(
      replace("#!/bin/sh\n# old\necho hi\n", &shell, Some(&template)).as_deref(),
      Some("#!/bin/sh\n# Copyright 2024\necho hi\n")
    );
    assert_eq!(
      replace("#!/bin/sh\necho hi\n", &shell, Some(&template)).as_deref(),
      Some("#!/bin/sh\n# Copyright 2024\necho hi\n")
    );
    assert_eq!(
      replace("#!/bin/sh", &shell, Some(&template)).as_deref(),
      Some("#!/bin/sh\n# Copyright 2024\n")
    );
  }

  #[test]
  fn test_crlf_is_preserved() {
    let template = lines(&["// Copyright %CurrentYear%", "// Acme"]);
    assert_eq!(
      replace("using System;\r\n", &csharp(), Some(&template)).as_deref(),
      Some("// Copyright 2024\r\n// Acme\r\nusing System;\r\n")
    );
    assert_eq!(
      replace("// Copyright 2024\r\n// Acme\r\nusing System;\r\n", &csharp(), Some(&template)),
      None
    );
  }

  #[test]
  fn test_plain_template_is_wrapped() {
    let template = lines(&["Copyright %CurrentYear%", "", "Licensed under MIT"]);
    assert_eq!(
      replace("code\n", &csharp(), Some(&template)).as_deref(),
      Some("// Copyright 2024\n//\n// Licensed under MIT\ncode\n")
    );
  }

  #[test]
  fn test_block_only_language_wraps_in_single_block() {
    let css = Language::block("CSS", &[".css"], "/*", "*/");
    assert_eq!(
      wrap_template(&lines(&["Copyright", "Acme", ""]), &css),
      ["/*", "Copyright", "Acme", "*/", ""]
    );
    assert_eq!(wrap_template(&lines(&["Copyright"]), &css), ["/* Copyright */"]);
  }

  #[test]
  fn test_validate_header() {
    let language = csharp();
    let valid = lines(&["// Copyright", "/* more */", ""]);
    let code = lines(&["// Copyright", "int x;"]);
    let trailing_text = lines(&["/* Copyright */ int x;"]);
    let open_block = lines(&["/* Copyright"]);

    let check = |template: &[String]| {
      Document::new("", &language, Some(template), &ctx())
        .expect("document")
        .validate_header()
    };
    assert!(check(&valid));
    assert!(!check(&code));
    assert!(!check(&trailing_text));
    assert!(!check(&open_block));

    let removal = Document::new("x", &language, None, &ctx()).expect("document");
    assert!(removal.validate_header());
  }

  #[test]
  fn test_accepted_code_in_header_is_written_once() {
    let template = lines(&["// Copyright", "not a comment"]);
    let first = replace("class A {}\n", &csharp(), Some(&template)).expect("inserted");
    assert_eq!(first, "// Copyright\nnot a comment\nclass A {}\n");
    assert_eq!(replace(&first, &csharp(), Some(&template)), None);

    let template = lines(&["// Copyright %CurrentYear%", "not a comment"]);
    assert_eq!(
      replace("// Copyright 2019\nnot a comment\nclass A {}\n", &csharp(), Some(&template)).as_deref(),
      Some("// Copyright 2024\nnot a comment\nclass A {}\n")
    );
  }

  #[test]
  fn test_byte_order_mark_stays_first() {
    let template = lines(&["// Copyright %CurrentYear%"]);
    assert_eq!(
      replace("\u{feff}// Copyright 2019 Old\nclass A {}\n", &csharp(), Some(&template)).as_deref(),
      Some("\u{feff}// Copyright 2024\nclass A {}\n")
    );
    assert_eq!(
      replace("\u{feff}class A {}\n", &csharp(), Some(&template)).as_deref(),
      Some("\u{feff}// Copyright 2024\nclass A {}\n")
    );
    assert_eq!(
      replace("\u{feff}// Copyright 2024\nclass A {}\n", &csharp(), Some(&template)),
      None
    );
    assert_eq!(
      replace("\u{feff}// Copyright 2019 Old\nclass A {}\n", &csharp(), None).as_deref(),
      Some("\u{feff}class A {}\n")
    );
  }

  #[test]
  fn test_block_closing_mid_line_is_replaced() {
    let template = lines(&["// new"]);
    assert_eq!(
      replace("/* old */ int x;\n", &csharp(), Some(&template)).as_deref(),
      Some("// new\nint x;\n")
    );
    assert_eq!(replace("/* old */ int x;\n", &csharp(), None).as_deref(), Some("int x;\n"));
  }

  #[test]
  fn test_invalid_skip_expression() {
    let language = csharp().with_skip("(");
    let err = Document::new("", &language, None, &ctx()).expect_err("must fail");
    assert_eq!(err.language, "C#");
  }

  #[test]
  fn test_detect_newline() {
    assert_eq!(detect_newline("a\r\nb"), "\r\n");
    assert_eq!(detect_newline("a\nb\r\n"), "\n");
    assert_eq!(detect_newline("single line"), "\n");
  }
}
