//! # headerkit
//!
//! Inserts, replaces and removes license headers in source files.

use std::process::ExitCode;

use anyhow::Result;
use headerkit::cli::{Cli, run_apply};

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let (common, action) = Cli::parse_args().into_action();
  run_apply(common, action).await
}
