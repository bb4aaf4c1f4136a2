//! # Replacer Module
//!
//! Runs header jobs. [`HeaderReplacer::process_one`] handles a single file;
//! [`HeaderReplacer::process_many`] runs a batch concurrently, isolates
//! per-file failures, asks at most once per extension whether to accept a
//! header containing non-comment text, and reports progress after every job.
//!
//! The module is organized into:
//! - [`file_io`] - Reading files and atomic write-back
//! - [`file_collector`] - Expanding path and glob patterns into file lists
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use headerkit::languages::LanguageRegistry;
//! use headerkit::replacer::{HeaderReplacer, Job, ProgressReport, ReplacerOptions};
//! use headerkit::templates::HeaderTemplates;
//!
//! # async fn run() {
//! let templates = Arc::new(HeaderTemplates::new().with(".rs", &["// Copyright %CurrentYear% Acme"]));
//! let replacer = HeaderReplacer::new(LanguageRegistry::builtin(), None, ReplacerOptions::default());
//!
//! let jobs = vec![
//!   Job::new("src/lib.rs", Some(templates.clone())),
//!   Job::new("src/main.rs", Some(templates)),
//! ];
//! let result = replacer
//!   .process_many(jobs, &|report: ProgressReport| println!("{}/{}", report.processed, report.total), None)
//!   .await;
//! assert!(result.errors.is_empty());
//! # }
//! ```

pub mod file_collector;
pub mod file_io;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Local};
pub use file_collector::{FileCollector, PatternMatcher, display_relative};
pub use file_io::{FileIO, LoadedFile};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, trace, warn};

use crate::document::Document;
use crate::error::{ErrorKind, ReplacerError, display_extension};
use crate::languages::LanguageRegistry;
use crate::templates::{HeaderTemplates, TemplateResolution, is_definition_file, resolve_template};
use crate::tokens::{DocumentContext, UserIdentity};

/// Tuning for a [`HeaderReplacer`].
#[derive(Debug, Clone)]
pub struct ReplacerOptions {
  /// Blank lines after a freshly inserted header when the template does not
  /// end with blank lines itself
  pub separator_lines: usize,
  /// Maximum number of jobs in flight during a batch
  pub max_concurrency: usize,
  /// Compute changes without writing them
  pub dry_run: bool,
  /// Identity used by the `%UserName%` and `%UserDisplayName%` tokens
  pub user: UserIdentity,
  /// Fixed reference time for the `%Current...%` tokens; the wall clock is
  /// used when unset
  pub now: Option<DateTime<Local>>,
}

impl Default for ReplacerOptions {
  fn default() -> Self {
    Self {
      separator_lines: 0,
      max_concurrency: num_cpus::get(),
      dry_run: false,
      user: UserIdentity::default(),
      now: None,
    }
  }
}

/// One unit of batch work.
#[derive(Debug, Clone)]
pub struct Job {
  pub path: PathBuf,
  /// Content to process instead of reading `path`. Such jobs are never
  /// written back and have no file metadata.
  pub content: Option<String>,
  /// Templates by extension; `None` removes existing headers
  pub templates: Option<Arc<HeaderTemplates>>,
  /// Additional `(token, value)` pairs
  pub tokens: Vec<(String, String)>,
}

impl Job {
  /// A job for a file on disk.
  pub fn new(path: impl Into<PathBuf>, templates: Option<Arc<HeaderTemplates>>) -> Self {
    Self {
      path: path.into(),
      content: None,
      templates,
      tokens: Vec::new(),
    }
  }

  /// A job for content that is not read from disk.
  pub fn from_content(
    path: impl Into<PathBuf>,
    content: impl Into<String>,
    templates: Option<Arc<HeaderTemplates>>,
  ) -> Self {
    Self {
      content: Some(content.into()),
      ..Self::new(path, templates)
    }
  }

  /// A job that removes the header of a file on disk.
  pub fn removal(path: impl Into<PathBuf>) -> Self {
    Self::new(path, None)
  }

  pub fn with_tokens<I, N, V>(mut self, tokens: I) -> Self
  where
    I: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: Into<String>,
  {
    self
      .tokens
      .extend(tokens.into_iter().map(|(name, value)| (name.into(), value.into())));
    self
  }
}

/// Result of processing one job without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// The file already has the expected header
  Unchanged,
  /// The file needs this new content
  Replaced(String),
  /// No language claims the file's extension
  LanguageNotFound,
  /// No template matches the file's extension
  NoHeaderFound,
  /// The matching template is blank and there was nothing to remove
  EmptyHeader,
  /// The path is a header definition file
  DefinitionFile,
}

impl Outcome {
  /// The error an interactive caller should show for this outcome, if any.
  pub fn user_error(&self, path: &Path) -> Option<ReplacerError> {
    match self {
      Outcome::LanguageNotFound => Some(ReplacerError::language_not_found(path)),
      Outcome::NoHeaderFound => Some(ReplacerError::no_header_found(path)),
      _ => None,
    }
  }

  pub const fn is_replaced(&self) -> bool {
    matches!(self, Outcome::Replaced(_))
  }
}

/// Number of jobs settled so far in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
  pub total: usize,
  pub processed: usize,
}

/// Receives one report per settled job.
pub trait ProgressSink: Send + Sync {
  fn report(&self, progress: ProgressReport);
}

impl<F> ProgressSink for F
where
  F: Fn(ProgressReport) + Send + Sync,
{
  fn report(&self, progress: ProgressReport) {
    self(progress)
  }
}

/// Asked whether to write a header that contains non-comment text. May block
/// waiting for a human.
pub trait ConfirmInvalidHeader: Send + Sync {
  fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmInvalidHeader for F
where
  F: Fn(&str) -> bool + Send + Sync,
{
  fn confirm(&self, message: &str) -> bool {
    self(message)
  }
}

/// A rewrite computed by a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
  pub path: PathBuf,
  #[serde(skip)]
  pub original: String,
  #[serde(skip)]
  pub updated: String,
  /// Whether the new content was written to disk
  pub written: bool,
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
  /// Every captured error; empty means full success
  pub errors: Vec<ReplacerError>,
  /// Files that got (or, in dry-run mode, would get) new content
  pub changes: Vec<FileChange>,
  /// Number of settled jobs
  pub processed: usize,
}

impl BatchResult {
  pub const fn is_success(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn replaced_paths(&self) -> impl Iterator<Item = &Path> {
    self.changes.iter().map(|change| change.path.as_path())
  }
}

/// Per-run answers to the non-comment-text question, keyed by extension.
#[derive(Debug, Default)]
struct DecisionCache {
  answers: Mutex<HashMap<String, Arc<OnceCell<bool>>>>,
}

impl DecisionCache {
  async fn cell(&self, extension: &str) -> Arc<OnceCell<bool>> {
    let mut answers = self.answers.lock().await;
    answers.entry(extension.to_string()).or_default().clone()
  }
}

/// How a job decides whether to accept an invalid header.
struct Decider<'a> {
  confirm: Option<&'a Arc<dyn ConfirmInvalidHeader>>,
  cache: Option<&'a DecisionCache>,
}

impl Decider<'_> {
  async fn decide(&self, extension: &str, message: String) -> bool {
    let Some(confirm) = self.confirm else {
      return true;
    };
    match self.cache {
      None => ask(confirm.clone(), message).await,
      Some(cache) => {
        let cell = cache.cell(extension).await;
        *cell.get_or_init(|| ask(confirm.clone(), message)).await
      }
    }
  }
}

async fn ask(confirm: Arc<dyn ConfirmInvalidHeader>, message: String) -> bool {
  match tokio::task::spawn_blocking(move || confirm.confirm(&message)).await {
    Ok(answer) => answer,
    Err(err) => {
      warn!("Confirmation callback failed: {}", err);
      false
    }
  }
}

/// The header replacement engine.
#[derive(Debug, Clone)]
pub struct HeaderReplacer {
  languages: LanguageRegistry,
  keywords: Option<Vec<String>>,
  options: ReplacerOptions,
}

impl HeaderReplacer {
  /// Creates a new replacer.
  ///
  /// # Parameters
  ///
  /// * `languages` - Comment syntax registry
  /// * `keywords` - When set, only comment regions containing one of these
  ///   words are treated as license headers
  /// * `options` - Separator, concurrency and dry-run settings
  pub const fn new(languages: LanguageRegistry, keywords: Option<Vec<String>>, options: ReplacerOptions) -> Self {
    Self {
      languages,
      keywords,
      options,
    }
  }

  pub const fn options(&self) -> &ReplacerOptions {
    &self.options
  }

  pub const fn languages(&self) -> &LanguageRegistry {
    &self.languages
  }

  /// Process one job without writing anything.
  ///
  /// `confirm` is asked when the header contains non-comment text; without a
  /// callback such headers are accepted.
  ///
  /// # Errors
  ///
  /// `ParsingError` when the file's leading comment region is malformed,
  /// `NonCommentText` when the callback declines, `Miscellaneous` for I/O
  /// failures and invalid language definitions.
  pub async fn process_one(
    &self,
    job: &Job,
    confirm: Option<Arc<dyn ConfirmInvalidHeader>>,
  ) -> Result<Outcome, ReplacerError> {
    let decider = Decider {
      confirm: confirm.as_ref(),
      cache: None,
    };
    self.evaluate(job, &decider).await.map(|(outcome, _)| outcome)
  }

  /// Process a batch of jobs concurrently.
  ///
  /// Every job settles exactly once and triggers exactly one progress report.
  /// The confirmation callback is asked at most once per extension; its
  /// answer applies to every later job with that extension. Path jobs whose
  /// content changed are written back atomically unless the replacer is in
  /// dry-run mode.
  pub async fn process_many<P>(
    &self,
    jobs: Vec<Job>,
    progress: &P,
    confirm: Option<Arc<dyn ConfirmInvalidHeader>>,
  ) -> BatchResult
  where
    P: ProgressSink + ?Sized,
  {
    let total = jobs.len();
    let processed = AtomicUsize::new(0);
    let cache = DecisionCache::default();
    let decider = Decider {
      confirm: confirm.as_ref(),
      cache: Some(&cache),
    };

    debug!("Processing {} jobs with concurrency {}", total, self.options.max_concurrency);

    let settled: Vec<Result<Option<FileChange>, ReplacerError>> = stream::iter(jobs)
      .map(|job| {
        let decider = &decider;
        let processed = &processed;
        async move {
          let result = self.settle(&job, decider).await;
          let count = processed.fetch_add(1, Ordering::SeqCst) + 1;
          progress.report(ProgressReport {
            total,
            processed: count,
          });
          result
        }
      })
      .buffer_unordered(self.options.max_concurrency.max(1))
      .collect()
      .await;

    let mut result = BatchResult {
      processed: processed.load(Ordering::SeqCst),
      ..BatchResult::default()
    };
    for entry in settled {
      match entry {
        Ok(Some(change)) => result.changes.push(change),
        Ok(None) => {}
        Err(err) => result.errors.push(err),
      }
    }
    result.errors.sort_by(|a, b| a.path.cmp(&b.path));
    result.changes.sort_by(|a, b| a.path.cmp(&b.path));
    result
  }

  /// Run one batch job to completion, including the write.
  async fn settle(&self, job: &Job, decider: &Decider<'_>) -> Result<Option<FileChange>, ReplacerError> {
    let (outcome, original) = self.evaluate(job, decider).await?;

    let updated = match outcome {
      Outcome::Replaced(updated) => updated,
      Outcome::Unchanged => {
        trace!("Header already up to date: {}", job.path.display());
        return Ok(None);
      }
      skipped => {
        debug!("Skipping {}: {:?}", job.path.display(), skipped);
        return Ok(None);
      }
    };

    let written = job.content.is_none() && !self.options.dry_run;
    if written {
      FileIO::write_atomic(&job.path, updated.clone())
        .await
        .map_err(|err| ReplacerError::miscellaneous(&job.path, &err))?;
      debug!("Rewrote {}", job.path.display());
    }

    Ok(Some(FileChange {
      path: job.path.clone(),
      original,
      updated,
      written,
    }))
  }

  /// Compute the outcome of a job. Also returns the original content, empty
  /// when the content was never loaded.
  async fn evaluate(&self, job: &Job, decider: &Decider<'_>) -> Result<(Outcome, String), ReplacerError> {
    let path = job.path.as_path();

    if is_definition_file(path) {
      return Ok((Outcome::DefinitionFile, String::new()));
    }

    let Some(language) = self.languages.resolve(path) else {
      return Ok((Outcome::LanguageNotFound, String::new()));
    };

    let (template, empty_header) = match resolve_template(path, job.templates.as_deref()) {
      None => (None, false),
      Some(TemplateResolution::NoHeaderFound) => return Ok((Outcome::NoHeaderFound, String::new())),
      Some(TemplateResolution::EmptyHeader) => (None, true),
      Some(TemplateResolution::Template(lines)) => (Some(lines), false),
    };

    let (content, info) = match &job.content {
      Some(content) => (content.clone(), None),
      None => {
        let loaded = FileIO::read(path)
          .await
          .map_err(|err| ReplacerError::miscellaneous(path, &err))?;
        (loaded.content, loaded.info)
      }
    };

    let mut ctx = DocumentContext::for_content(path)
      .with_user(self.options.user.clone())
      .with_tokens(job.tokens.iter().cloned());
    ctx.file = info;
    if let Some(now) = self.options.now {
      ctx = ctx.with_now(now);
    }

    let document = Document::new(&content, language, template, &ctx)
      .map_err(|err| ReplacerError::new(path, ErrorKind::Miscellaneous, format!("{:#}", anyhow::Error::new(err))))?
      .with_keywords(self.keywords.as_deref())
      .with_separator_lines(self.options.separator_lines);

    if !document.validate_header() {
      let extension = display_extension(path);
      let message = format!(
        "The header for '{}' files contains text outside of comments. Insert it anyway?",
        extension
      );
      if !decider.decide(&extension, message).await {
        return Err(ReplacerError::new(
          path,
          ErrorKind::NonCommentText,
          "The header contains text outside of comments",
        ));
      }
    }

    let outcome = match document.replace_header_if_necessary() {
      Ok(Some(updated)) => Outcome::Replaced(updated),
      Ok(None) if empty_header => Outcome::EmptyHeader,
      Ok(None) => Outcome::Unchanged,
      Err(err) => return Err(ReplacerError::new(path, ErrorKind::ParsingError, err.to_string())),
    };

    Ok((outcome, content))
  }
}
