//! Leading comment region parser.
//!
//! Splits text into four consecutive slices: blank lines before the first
//! comment, the comment region itself, the blank lines after it, and the
//! body. The slices always concatenate back to the input.

use crate::languages::Language;

/// Failure to parse a leading comment region.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderParseError {
  #[error("block comment opened with '{marker}' on line {line} is never closed")]
  UnterminatedBlockComment { marker: String, line: usize },
}

/// Comment markers used while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax<'a> {
  pub line: Option<&'a str>,
  pub block: Option<(&'a str, &'a str)>,
}

impl<'a> CommentSyntax<'a> {
  pub fn of(language: &'a Language) -> Self {
    Self {
      line: language.line_marker(),
      block: language.block_markers(),
    }
  }
}

/// The leading region of a text, split at byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region<'a> {
  /// Blank lines before the first comment
  pub leading: &'a str,
  /// From the first comment up to the end of the last one. Ends with the
  /// newline of the last line, unless a block comment closed mid-line or
  /// the text ended.
  pub comments: &'a str,
  /// Blank lines after the last comment
  pub trailing: &'a str,
  /// Everything else
  pub body: &'a str,
}

impl<'a> Region<'a> {
  pub const fn has_comments(&self) -> bool {
    !self.comments.is_empty()
  }

  /// The comment region split into lines, without line terminators.
  pub fn comment_lines(&self) -> Vec<&'a str> {
    self.comments.lines().collect()
  }

  /// Everything from the first comment on.
  pub fn after_leading(&self, text: &'a str) -> &'a str {
    &text[self.leading.len()..]
  }
}

/// Parse the leading comment region of `text`.
///
/// The region is the longest prefix made of blank lines, lines starting with
/// the line marker, and block comments. A block comment may span several lines
/// and several may follow each other. When a block comment closes with more
/// text on the same line, the region ends right after the end marker.
pub fn parse_region<'a>(text: &'a str, syntax: CommentSyntax<'_>) -> Result<Region<'a>, HeaderParseError> {
  let mut pos = 0;
  let mut first_comment: Option<usize> = None;
  let mut comments_end = 0;

  while pos < text.len() {
    let next_line = line_end(text, pos);
    let line = &text[pos..next_line];
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();

    if trimmed.trim().is_empty() {
      pos = next_line;
      if first_comment.is_none() {
        comments_end = pos;
      }
      continue;
    }

    if let Some((start, end)) = syntax.block
      && trimmed.starts_with(start)
    {
      let open = pos + indent;
      let search_from = open + start.len();
      let Some(found) = text[search_from..].find(end) else {
        return Err(HeaderParseError::UnterminatedBlockComment {
          marker: start.to_string(),
          line: line_number(text, open),
        });
      };
      let close = search_from + found + end.len();
      first_comment.get_or_insert(pos);

      let close_line_end = line_end(text, close);
      if text[close..close_line_end].trim().is_empty() {
        pos = close_line_end;
        comments_end = pos;
        continue;
      }
      comments_end = close;
      pos = close;
      break;
    }

    if let Some(marker) = syntax.line
      && trimmed.starts_with(marker)
    {
      first_comment.get_or_insert(pos);
      pos = next_line;
      comments_end = pos;
      continue;
    }

    break;
  }

  let Some(first) = first_comment else {
    // Only blank lines (or nothing) before the body
    return Ok(Region {
      leading: &text[..comments_end],
      comments: "",
      trailing: "",
      body: &text[comments_end..],
    });
  };

  // Between the last comment and the stopping point there are only blank lines
  Ok(Region {
    leading: &text[..first],
    comments: &text[first..comments_end],
    trailing: &text[comments_end..pos],
    body: &text[pos..],
  })
}

/// Offset just past the next newline at or after `pos`, or the end of the
/// text.
fn line_end(text: &str, pos: usize) -> usize {
  text[pos..].find('\n').map_or(text.len(), |idx| pos + idx + 1)
}

fn line_number(text: &str, offset: usize) -> usize {
  text[..offset].matches('\n').count() + 1
}
