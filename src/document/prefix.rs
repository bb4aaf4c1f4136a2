//! Preamble extraction.
//!
//! Some files must start with a line that cannot move below a header: a
//! shebang, an XML declaration, a `<?php` tag. Each language describes its
//! preamble with a skip expression; the matched text is kept in place and the
//! header goes after it.

use regex::Regex;

/// Split `content` into the preamble matched by `skip` and the rest.
///
/// The match must start at offset 0 and be non-empty. It is extended to the
/// end of the line it ends on, so the preamble always consists of whole lines.
///
/// # Returns
///
/// A tuple of the preamble (possibly empty) and the remaining content.
pub fn split_preamble<'a>(content: &'a str, skip: Option<&Regex>) -> (&'a str, &'a str) {
  let Some(found) = skip.and_then(|regex| regex.find(content)) else {
    return ("", content);
  };
  if found.start() != 0 || found.is_empty() {
    return ("", content);
  }

  let end = if content[..found.end()].ends_with('\n') {
    found.end()
  } else {
    content[found.end()..]
      .find('\n')
      .map_or(content.len(), |idx| found.end() + idx + 1)
  };

  content.split_at(end)
}
