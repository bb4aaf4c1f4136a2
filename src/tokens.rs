//! # Tokens Module
//!
//! Placeholder expansion for header templates. A [`Token`] is a plain data
//! record: the placeholder text, a [`TokenCondition`] that decides whether it
//! may be replaced in a given [`DocumentContext`], and a [`TokenValue`] that
//! produces the replacement.
//!
//! Tokens whose condition does not hold stay in the text verbatim, so a header
//! expanded from content alone still shows `%CreationYear%` rather than a
//! made-up date.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{Local, TimeZone};
//! use headerkit::tokens::{DocumentContext, expand};
//!
//! let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).single().expect("valid date");
//! let ctx = DocumentContext::for_content("Program.cs").with_now(now);
//! let lines = vec!["// Copyright %CurrentYear% (%FileName%)".to_string()];
//! assert_eq!(expand(&lines, &ctx), ["// Copyright 2024 (%FileName%)"]);
//! ```

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local};

/// Metadata of a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
  /// Birth time of the file, or its modification time where the platform
  /// does not record birth times
  pub created: DateTime<Local>,
  /// The path as the file system resolves it, with its on-disk spelling
  pub resolved_path: Option<PathBuf>,
}

impl FileInfo {
  pub const fn new(created: DateTime<Local>) -> Self {
    Self {
      created,
      resolved_path: None,
    }
  }

  pub fn with_resolved_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.resolved_path = Some(path.into());
    self
  }

  /// Build file info from metadata. Returns `None` when the platform exposes
  /// neither a birth time nor a modification time.
  pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
    let created = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(Self::new(DateTime::<Local>::from(created)))
  }
}

/// The operating user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
  /// Login name
  pub login: Option<String>,
  /// Human readable name
  pub display_name: Option<String>,
}

impl UserIdentity {
  /// Read the identity from the environment.
  ///
  /// The login comes from `USER`, `USERNAME` or `LOGNAME`. The display name is
  /// `display_name` when given, else `GIT_AUTHOR_NAME`, else the login.
  pub fn from_env(display_name: Option<String>) -> Self {
    let login = ["USER", "USERNAME", "LOGNAME"].iter().find_map(|key| non_empty_var(key));

    let display_name = display_name
      .filter(|name| !name.trim().is_empty())
      .or_else(|| non_empty_var("GIT_AUTHOR_NAME"))
      .or_else(|| login.clone());

    Self { login, display_name }
  }
}

fn non_empty_var(key: &str) -> Option<String> {
  std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Everything token expansion may look at for one document.
#[derive(Debug, Clone)]
pub struct DocumentContext {
  /// Path exactly as supplied by the caller
  pub path: PathBuf,
  /// File metadata; absent when only content was supplied
  pub file: Option<FileInfo>,
  /// Reference time for the `%Current...%` tokens
  pub now: DateTime<Local>,
  pub user: UserIdentity,
  /// Caller-supplied tokens; they shadow built-ins of the same name
  pub additional: Vec<Token>,
}

impl DocumentContext {
  /// Context for a document known only by path and content.
  pub fn for_content(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      file: None,
      now: Local::now(),
      user: UserIdentity::default(),
      additional: Vec::new(),
    }
  }

  /// Context for a document that exists on disk.
  pub fn for_file(path: impl Into<PathBuf>, file: FileInfo) -> Self {
    Self {
      file: Some(file),
      ..Self::for_content(path)
    }
  }

  pub fn with_now(mut self, now: DateTime<Local>) -> Self {
    self.now = now;
    self
  }

  pub fn with_user(mut self, user: UserIdentity) -> Self {
    self.user = user;
    self
  }

  /// Add literal `(name, value)` tokens.
  pub fn with_tokens<I, N, V>(mut self, tokens: I) -> Self
  where
    I: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: Into<String>,
  {
    self
      .additional
      .extend(tokens.into_iter().map(|(name, value)| Token::literal(name, value)));
    self
  }

  /// The path with its on-disk spelling when the file info carries one,
  /// else the path as supplied.
  pub fn resolved_path(&self) -> &Path {
    self
      .file
      .as_ref()
      .and_then(|file| file.resolved_path.as_deref())
      .unwrap_or(&self.path)
  }
}

/// When a token may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCondition {
  Always,
  /// The document exists on disk and its metadata was read
  FileMetadata,
  /// The user's login name is known
  UserName,
  /// The user's display name is known
  UserDisplayName,
}

impl TokenCondition {
  pub const fn holds(self, ctx: &DocumentContext) -> bool {
    match self {
      TokenCondition::Always => true,
      TokenCondition::FileMetadata => ctx.file.is_some(),
      TokenCondition::UserName => ctx.user.login.is_some(),
      TokenCondition::UserDisplayName => ctx.user.display_name.is_some(),
    }
  }
}

/// What a token is replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValue {
  FullFileName,
  FileName,
  CreationYear,
  CreationMonth,
  CreationDay,
  CreationTime,
  CurrentYear,
  CurrentMonth,
  CurrentDay,
  CurrentTime,
  UserName,
  UserDisplayName,
  Literal(String),
}

impl TokenValue {
  /// Produce the replacement text. Values whose inputs are missing from the
  /// context resolve to an empty string; callers check the token's condition
  /// first.
  pub fn resolve(&self, ctx: &DocumentContext) -> String {
    let created = ctx.file.as_ref().map(|file| file.created);
    match self {
      TokenValue::FullFileName => ctx.resolved_path().display().to_string(),
      TokenValue::FileName => file_name(ctx.resolved_path())
        .or_else(|| file_name(&ctx.path))
        .unwrap_or_default(),
      TokenValue::CreationYear => created.map(|t| t.year().to_string()).unwrap_or_default(),
      TokenValue::CreationMonth => created.map(|t| t.month().to_string()).unwrap_or_default(),
      TokenValue::CreationDay => created.map(|t| t.day().to_string()).unwrap_or_default(),
      TokenValue::CreationTime => created.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
      TokenValue::CurrentYear => ctx.now.year().to_string(),
      TokenValue::CurrentMonth => ctx.now.month().to_string(),
      TokenValue::CurrentDay => ctx.now.day().to_string(),
      TokenValue::CurrentTime => ctx.now.format("%H:%M").to_string(),
      TokenValue::UserName => ctx.user.login.clone().unwrap_or_default(),
      TokenValue::UserDisplayName => ctx.user.display_name.clone().unwrap_or_default(),
      TokenValue::Literal(value) => value.clone(),
    }
  }
}

fn file_name(path: &Path) -> Option<String> {
  path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// A placeholder with its condition and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub name: String,
  pub condition: TokenCondition,
  pub value: TokenValue,
}

impl Token {
  pub fn new(name: impl Into<String>, condition: TokenCondition, value: TokenValue) -> Self {
    Self {
      name: name.into(),
      condition,
      value,
    }
  }

  /// A caller-supplied token that always applies.
  pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self::new(name, TokenCondition::Always, TokenValue::Literal(value.into()))
  }
}

/// Token name as written in templates. Bare names get `%` delimiters.
pub fn normalize_token_name(name: &str) -> String {
  let name = name.trim();
  if name.len() >= 2 && name.starts_with('%') && name.ends_with('%') {
    name.to_string()
  } else {
    format!("%{}%", name.trim_matches('%'))
  }
}

/// The built-in tokens, in evaluation order.
pub fn builtin_tokens() -> Vec<Token> {
  use TokenCondition as C;
  use TokenValue as V;

  vec![
    Token::new("%FullFileName%", C::FileMetadata, V::FullFileName),
    Token::new("%FileName%", C::FileMetadata, V::FileName),
    Token::new("%CreationYear%", C::FileMetadata, V::CreationYear),
    Token::new("%CreationMonth%", C::FileMetadata, V::CreationMonth),
    Token::new("%CreationDay%", C::FileMetadata, V::CreationDay),
    Token::new("%CreationTime%", C::FileMetadata, V::CreationTime),
    Token::new("%CurrentYear%", C::Always, V::CurrentYear),
    Token::new("%CurrentMonth%", C::Always, V::CurrentMonth),
    Token::new("%CurrentDay%", C::Always, V::CurrentDay),
    Token::new("%CurrentTime%", C::Always, V::CurrentTime),
    Token::new("%UserName%", C::UserName, V::UserName),
    Token::new("%UserDisplayName%", C::UserDisplayName, V::UserDisplayName),
  ]
}

/// Expand template lines with the built-in tokens and the context's
/// additional tokens.
pub fn expand(lines: &[String], ctx: &DocumentContext) -> Vec<String> {
  expand_with(lines, ctx, &builtin_tokens(), &ctx.additional)
}

/// Expand template lines with an explicit token set.
///
/// `additional` tokens come after `builtins`; one whose name equals a built-in
/// replaces it. Each line is scanned left to right and every occurrence of an
/// applicable token is replaced. Replacement text is never rescanned.
pub fn expand_with(lines: &[String], ctx: &DocumentContext, builtins: &[Token], additional: &[Token]) -> Vec<String> {
  let tokens: Vec<&Token> = builtins
    .iter()
    .filter(|builtin| !additional.iter().any(|token| token.name == builtin.name))
    .chain(additional.iter())
    .filter(|token| !token.name.is_empty() && token.condition.holds(ctx))
    .collect();

  // Values are resolved at most once per expansion and only when used
  let mut values: Vec<Option<String>> = vec![None; tokens.len()];

  lines
    .iter()
    .map(|line| expand_line(line, ctx, &tokens, &mut values))
    .collect()
}

fn expand_line(line: &str, ctx: &DocumentContext, tokens: &[&Token], values: &mut [Option<String>]) -> String {
  let mut out = String::with_capacity(line.len());
  let mut rest = line;

  loop {
    // Earliest occurrence wins; on equal positions the longer name wins
    let next = tokens
      .iter()
      .enumerate()
      .filter_map(|(index, token)| rest.find(token.name.as_str()).map(|pos| (pos, index)))
      .min_by(|(a_pos, a_idx), (b_pos, b_idx)| {
        a_pos
          .cmp(b_pos)
          .then_with(|| tokens[*b_idx].name.len().cmp(&tokens[*a_idx].name.len()))
      });

    let Some((pos, index)) = next else {
      out.push_str(rest);
      return out;
    };

    out.push_str(&rest[..pos]);
    let value = values[index].get_or_insert_with(|| tokens[index].value.resolve(ctx));
    out.push_str(value);
    rest = &rest[pos + tokens[index].name.len()..];
  }
}
