//! # Apply Command
//!
//! Shared implementation of `add` and `remove`: load configuration and
//! templates, collect files, run the batch and report.

use std::collections::BTreeMap;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use clap::builder::RangedU64ValueParser;
use tracing::debug;

use crate::config::{Config, load_config};
use crate::diff::DiffManager;
use crate::logging::{ColorMode, init_tracing, set_quiet, set_verbose};
use crate::output::{
  print_all_files_ok, print_changed_files, print_errors, print_hint, print_start_message, print_summary,
  write_json_report,
};
use crate::replacer::{
  BatchResult, ConfirmInvalidHeader, FileCollector, HeaderReplacer, Job, ProgressReport, ReplacerOptions,
  display_relative,
};
use crate::templates::{HeaderTemplates, load_definition};
use crate::tokens::{UserIdentity, normalize_token_name};
use crate::{info_log, verbose_log};

/// Lines of context around each diff hunk
const DIFF_CONTEXT_LINES: usize = 3;

/// Arguments shared by every subcommand
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
  /// File, directory or glob patterns to process. Directories are processed
  /// recursively and honor `.gitignore` files.
  #[arg(required = true)]
  pub patterns: Vec<String>,

  /// Path to config file (default: .headerkit.toml in the current directory)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Ignore config file even if present
  #[arg(long)]
  pub no_config: bool,

  /// Only report files that would change; exit with status 1 if any would
  #[arg(long)]
  pub check: bool,

  /// Show a diff of every change
  #[arg(long)]
  pub show_diff: bool,

  /// Save the diff of every change to a file
  #[arg(long, short = 'o', value_name = "FILE")]
  pub save_diff: Option<PathBuf>,

  /// Number of files processed concurrently (default: number of CPUs)
  #[arg(long, short = 'j', value_name = "N", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
  pub jobs: Option<usize>,

  /// Blank lines between an inserted header and the code after it
  #[arg(long, value_name = "N")]
  pub separator_lines: Option<usize>,

  /// Also process hidden files and directories
  #[arg(long)]
  pub hidden: bool,

  /// Write the errors of the run to a JSON file
  #[arg(long, value_name = "FILE")]
  pub json: Option<PathBuf>,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Control when to use colored output (auto, never, always)
  #[arg(
    long,
    value_name = "WHEN",
    num_args = 0..=1,
    default_value_t = ColorMode::Auto,
    default_missing_value = "always",
    value_enum
  )]
  pub colors: ColorMode,
}

/// Arguments for `headerkit add`
#[derive(Args, Debug)]
pub struct AddArgs {
  /// Header definition file (`*.licenseheader`)
  #[arg(long, short = 'd', value_name = "FILE")]
  pub definition: PathBuf,

  /// Additional token, repeatable (format: NAME=VALUE)
  #[arg(long, value_name = "NAME=VALUE", value_parser = parse_token)]
  pub token: Vec<(String, String)>,

  /// Value of %UserDisplayName% (default: config, then GIT_AUTHOR_NAME, then
  /// the login name)
  #[arg(long, value_name = "NAME")]
  pub user_display_name: Option<String>,

  /// Insert headers that contain non-comment text without asking
  #[arg(long, short = 'y', conflicts_with = "no")]
  pub yes: bool,

  /// Skip files whose header contains non-comment text without asking
  #[arg(long)]
  pub no: bool,

  #[command(flatten)]
  pub common: CommonArgs,
}

impl AddArgs {
  /// The preset answer to the non-comment-text question, if any.
  pub const fn answer(&self) -> Option<bool> {
    match (self.yes, self.no) {
      (true, _) => Some(true),
      (_, true) => Some(false),
      _ => None,
    }
  }
}

/// Arguments for `headerkit remove`
#[derive(Args, Debug)]
pub struct RemoveArgs {
  #[command(flatten)]
  pub common: CommonArgs,
}

/// What a run does to the collected files.
#[derive(Debug, Clone)]
pub enum Action {
  Add {
    definition: PathBuf,
    tokens: Vec<(String, String)>,
    answer: Option<bool>,
    user_display_name: Option<String>,
  },
  Remove,
}

/// Parse a `NAME=VALUE` token argument.
pub fn parse_token(arg: &str) -> Result<(String, String), String> {
  let Some((name, value)) = arg.split_once('=') else {
    return Err(format!("expected NAME=VALUE, got '{}'", arg));
  };
  if name.trim().trim_matches('%').is_empty() {
    return Err("token name cannot be empty".to_string());
  }
  Ok((normalize_token_name(name), value.to_string()))
}

/// Run `add` or `remove`.
///
/// # Returns
///
/// Exit status 1 when any file failed, or when `--check` found files that
/// would change.
pub async fn run_apply(args: CommonArgs, action: Action) -> Result<ExitCode> {
  init_tracing(args.quiet, args.verbose);

  if args.verbose > 0 {
    set_verbose();
  } else if args.quiet {
    set_quiet();
  }
  args.colors.apply();

  let start_time = Instant::now();
  let cwd = std::env::current_dir().context("Failed to determine the current directory")?;

  let config = load_config(args.config.as_deref(), &cwd, args.no_config)?.unwrap_or_default();
  if !config.languages.is_empty() {
    debug!("Config defines {} languages", config.languages.len());
  }

  let (templates, tokens, answer, display_name) = match action {
    Action::Add {
      definition,
      tokens,
      answer,
      user_display_name,
    } => {
      let templates = merged_templates(&config, &definition)?;
      (Some(Arc::new(templates)), merged_tokens(&config, tokens), answer, user_display_name)
    }
    Action::Remove => (None, Vec::new(), None, None),
  };
  let removal = templates.is_none();

  let files = FileCollector::new()
    .with_hidden(args.hidden)
    .collect(&args.patterns)
    .context("Failed to collect files")?;

  if files.is_empty() {
    info_log!("No files matched the given patterns");
    return Ok(ExitCode::SUCCESS);
  }

  let modify_mode = !args.check;
  print_start_message(files.len(), modify_mode);

  let options = ReplacerOptions {
    separator_lines: args.separator_lines.unwrap_or(config.separator_lines),
    max_concurrency: args.jobs.or(config.jobs).unwrap_or_else(num_cpus::get),
    dry_run: args.check,
    user: UserIdentity::from_env(display_name.or_else(|| config.user_display_name.clone())),
    now: None,
  };
  let replacer = HeaderReplacer::new(config.registry(), config.keywords.clone(), options);

  let jobs: Vec<Job> = files
    .into_iter()
    .map(|path| Job::new(path, templates.clone()).with_tokens(tokens.iter().cloned()))
    .collect();

  let confirm = (!removal).then(|| confirmation(answer));
  let progress = |report: ProgressReport| {
    if report.processed == report.total || report.processed % 100 == 0 {
      verbose_log!("[{}/{}] files processed", report.processed, report.total);
    }
  };

  let result = replacer.process_many(jobs, &progress, confirm).await;

  report(&args, &result, &cwd, start_time, modify_mode)?;

  let failed = !result.is_success() || (args.check && !result.changes.is_empty());
  Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Definition file templates layered over the config's inline headers.
fn merged_templates(config: &Config, definition: &std::path::Path) -> Result<HeaderTemplates> {
  let mut templates = config.header_templates().unwrap_or_default();
  let loaded = load_definition(definition)
    .with_context(|| format!("Failed to load header definition from {}", definition.display()))?;
  templates.merge(loaded);
  Ok(templates)
}

/// Config tokens overridden by CLI tokens of the same name.
fn merged_tokens(config: &Config, cli: Vec<(String, String)>) -> Vec<(String, String)> {
  let mut tokens: BTreeMap<String, String> = config
    .tokens
    .iter()
    .map(|(name, value)| (normalize_token_name(name), value.clone()))
    .collect();
  tokens.extend(cli);
  tokens.into_iter().collect()
}

fn confirmation(answer: Option<bool>) -> Arc<dyn ConfirmInvalidHeader> {
  match answer {
    Some(answer) => Arc::new(move |_: &str| answer),
    None if std::io::stdin().is_terminal() => Arc::new(prompt),
    None => Arc::new(|message: &str| {
      debug!("Declining without a terminal: {}", message);
      false
    }),
  }
}

/// Ask on the terminal. Anything other than `y`/`yes` declines.
fn prompt(message: &str) -> bool {
  let mut stderr = std::io::stderr().lock();
  if write!(stderr, "{} [y/N] ", message).and_then(|()| stderr.flush()).is_err() {
    return false;
  }
  drop(stderr);

  let mut line = String::new();
  match std::io::stdin().lock().read_line(&mut line) {
    Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
    Err(_) => false,
  }
}

fn report(
  args: &CommonArgs,
  result: &BatchResult,
  cwd: &std::path::Path,
  start_time: Instant,
  modify_mode: bool,
) -> Result<()> {
  let diff = DiffManager::new(DIFF_CONTEXT_LINES);
  if args.show_diff {
    for change in &result.changes {
      diff.display_diff(&change.path, &change.original, &change.updated);
    }
  }
  if let Some(path) = &args.save_diff {
    let rendered: String = result
      .changes
      .iter()
      .map(|change| diff.render(&display_relative(&change.path, cwd), &change.original, &change.updated))
      .collect();
    std::fs::write(path, rendered).with_context(|| format!("Failed to write diff file: {}", path.display()))?;
    info_log!("Diff saved to {}", path.display());
  }

  print_changed_files(&result.changes, cwd, modify_mode);
  print_errors(&result.errors, cwd);

  if result.changes.is_empty() && result.is_success() {
    print_all_files_ok();
  }
  print_summary(result, start_time.elapsed(), modify_mode);

  if !modify_mode && !result.changes.is_empty() {
    print_hint("Run again without --check to apply these changes.");
  }

  if let Some(path) = &args.json {
    write_json_report(path, result)?;
    verbose_log!("Report written to {}", path.display());
  }
  Ok(())
}
