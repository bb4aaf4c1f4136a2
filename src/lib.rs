//! # headerkit
//!
//! A license header engine. Given a file's path and content and a template
//! keyed by extension, headerkit decides whether the file already carries the
//! expected header, computes the replaced content, and writes it back.
//!
//! * Comment syntax is looked up per extension, longest suffix first
//! * Preambles such as shebangs and XML declarations stay on top
//! * `%Token%` placeholders expand to dates, file names and user names
//! * Batches run concurrently; one file's failure never stops the others
//! * A `None` template map removes existing headers instead
//!
//! ## Usage as a Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use headerkit::languages::LanguageRegistry;
//! use headerkit::replacer::{HeaderReplacer, Job, Outcome, ReplacerOptions};
//! use headerkit::templates::HeaderTemplates;
//!
//! # async fn run() -> Result<(), headerkit::error::ReplacerError> {
//! let templates = Arc::new(HeaderTemplates::new().with(".cs", &["// Copyright %CurrentYear%"]));
//! let replacer = HeaderReplacer::new(LanguageRegistry::builtin(), None, ReplacerOptions::default());
//!
//! let job = Job::from_content("Program.cs", "using System;\n", Some(templates));
//! if let Outcome::Replaced(content) = replacer.process_one(&job, None).await? {
//!   print!("{}", content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! * [`replacer`] - Single-file and batch processing
//! * [`document`] - Header detection and replacement for one document
//! * [`languages`] - Comment syntax registry
//! * [`templates`] - Header templates and definition files
//! * [`tokens`] - Token expansion
//! * [`config`] - `.headerkit.toml` loading
//!
//! [`replacer`]: crate::replacer
//! [`document`]: crate::document
//! [`languages`]: crate::languages
//! [`templates`]: crate::templates
//! [`tokens`]: crate::tokens
//! [`config`]: crate::config

pub mod cli;
pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod languages;
pub mod logging;
pub mod output;
pub mod replacer;
pub mod templates;
pub mod tokens;

pub use document::{Document, HeaderParseError};
pub use error::{ErrorKind, ReplacerError};
pub use languages::{Language, LanguageRegistry};
pub use replacer::{BatchResult, HeaderReplacer, Job, Outcome, ReplacerOptions};
pub use templates::HeaderTemplates;
pub use tokens::DocumentContext;
