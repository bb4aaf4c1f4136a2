#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use headerkit::languages::LanguageRegistry;
use headerkit::replacer::{HeaderReplacer, ReplacerOptions};
use headerkit::templates::HeaderTemplates;

/// The reference time used by every test: 1 May 2024, 08:30 local time.
pub fn fixed_now() -> DateTime<Local> {
  Local
    .with_ymd_and_hms(2024, 5, 1, 8, 30, 0)
    .single()
    .expect("unambiguous local time")
}

/// A replacer over the built-in languages with a fixed clock.
pub fn replacer() -> HeaderReplacer {
  replacer_with(None, 0)
}

/// A replacer with keywords and a separator.
pub fn replacer_with(keywords: Option<&[&str]>, separator_lines: usize) -> HeaderReplacer {
  HeaderReplacer::new(
    LanguageRegistry::builtin(),
    keywords.map(|words| words.iter().map(|word| word.to_string()).collect()),
    ReplacerOptions {
      separator_lines,
      max_concurrency: 4,
      now: Some(fixed_now()),
      ..ReplacerOptions::default()
    },
  )
}

/// Templates with one entry.
pub fn templates(extension: &str, lines: &[&str]) -> Arc<HeaderTemplates> {
  Arc::new(HeaderTemplates::new().with(extension, lines))
}

/// Write `content` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
  let path = dir.join(name);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(path)
}

pub fn read_file(path: &Path) -> Result<String> {
  fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
