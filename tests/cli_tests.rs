#![allow(clippy::unwrap_used)]

mod common;

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use common::{read_file, write_file};
use predicates::prelude::*;
use tempfile::tempdir;

const DEFINITION: &str = "extensions: .rs\n// Copyright Acme\n";

fn headerkit(dir: &Path) -> Result<Command> {
  let mut cmd = Command::cargo_bin("headerkit")?;
  cmd
    .current_dir(dir)
    .env_remove("HEADERKIT_CONFIG")
    .env_remove("RUST_LOG");
  Ok(cmd)
}

#[test]
fn test_add_inserts_headers() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "My.licenseheader", DEFINITION)?;
  let main = write_file(dir.path(), "src/main.rs", "fn main() {}\n")?;

  Command::cargo_bin("headerkit")?
    .current_dir(dir.path())
    .env_remove("HEADERKIT_CONFIG")
    .args(["add", "--no-config", "--colors=never", "--definition", "My.licenseheader", "src"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1 file updated"));

  assert_eq!(read_file(&main)?, "// Copyright Acme\n\nfn main() {}\n");
  Ok(())
}

#[test]
fn test_check_reports_without_writing() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "My.licenseheader", DEFINITION)?;
  let main = write_file(dir.path(), "src/main.rs", "fn main() {}\n")?;

  let mut cmd = Command::cargo_bin("headerkit")?;
  cmd
    .current_dir(dir.path())
    .env_remove("HEADERKIT_CONFIG")
    .args(["add", "--no-config", "--check", "-q", "--definition", "My.licenseheader", "src"])
    .assert()
    .failure()
    .code(1)
    .stdout(predicate::str::contains("main.rs"));

  assert_eq!(read_file(&main)?, "fn main() {}\n");
  Ok(())
}

#[test]
fn test_check_passes_when_headers_are_current() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "My.licenseheader", DEFINITION)?;
  write_file(dir.path(), "src/main.rs", "// Copyright Acme\n\nfn main() {}\n")?;

  Command::cargo_bin("headerkit")?
    .current_dir(dir.path())
    .env_remove("HEADERKIT_CONFIG")
    .args(["add", "--no-config", "--check", "--definition", "My.licenseheader", "src"])
    .assert()
    .success()
    .stdout(predicate::str::contains("All files have the expected header"));
  Ok(())
}

#[test]
fn test_remove_strips_headers() -> Result<()> {
  let dir = tempdir()?;
  let main = write_file(dir.path(), "src/main.rs", "// Copyright Acme\n\nfn main() {}\n")?;

  Command::cargo_bin("headerkit")?
    .current_dir(dir.path())
    .env_remove("HEADERKIT_CONFIG")
    .args(["remove", "--no-config", "src/main.rs"])
    .assert()
    .success();

  assert_eq!(read_file(&main)?, "fn main() {}\n");
  Ok(())
}

#[test]
fn test_config_file_is_discovered() -> Result<()> {
  let dir = tempdir()?;
  write_file(
    dir.path(),
    ".headerkit.toml",
    "separator-lines = 0\n[tokens]\nOwner = \"Config Owner\"\n",
  )?;
  write_file(dir.path(), "My.licenseheader", "extensions: .rs\n// %Owner%\n")?;
  let main = write_file(dir.path(), "main.rs", "fn main() {}\n")?;

  Command::cargo_bin("headerkit")?
    .current_dir(dir.path())
    .env_remove("HEADERKIT_CONFIG")
    .args(["add", "--definition", "My.licenseheader", "main.rs"])
    .assert()
    .success();

  assert_eq!(read_file(&main)?, "// Config Owner\nfn main() {}\n");
  Ok(())
}

#[test]
fn test_cli_token_overrides_config() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), ".headerkit.toml", "[tokens]\nOwner = \"Config Owner\"\n")?;
  write_file(dir.path(), "My.licenseheader", "extensions: .rs\n// %Owner%\n")?;
  let main = write_file(dir.path(), "main.rs", "fn main() {}\n")?;

  Command::cargo_bin("headerkit")?
    .current_dir(dir.path())
    .env_remove("HEADERKIT_CONFIG")
    .args(["add", "--definition", "My.licenseheader", "--token", "Owner=Cli Owner", "main.rs"])
    .assert()
    .success();

  assert_eq!(read_file(&main)?, "// Cli Owner\n\nfn main() {}\n");
  Ok(())
}

#[test]
fn test_parse_errors_fail_the_run_and_write_json() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "My.licenseheader", DEFINITION)?;
  let good = write_file(dir.path(), "src/good.rs", "fn good() {}\n")?;
  write_file(dir.path(), "src/bad.rs", "/* unterminated\nfn bad() {}\n")?;

  headerkit(dir.path())?
    .args([
      "add",
      "--no-config",
      "--json",
      "report.json",
      "--definition",
      "My.licenseheader",
      "src",
    ])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("parsing error"));

  assert_eq!(read_file(&good)?, "// Copyright Acme\n\nfn good() {}\n");

  let report: serde_json::Value = serde_json::from_str(&read_file(&dir.path().join("report.json"))?)?;
  assert_eq!(report["processed"], 2);
  assert_eq!(report["errors"][0]["kind"], "parsing-error");
  assert_eq!(report["error_counts"]["parsing-error"], 1);
  Ok(())
}

#[test]
fn test_no_answers_non_comment_headers() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "Bad.licenseheader", "extensions: .rs\n// Copyright\nnot a comment\n")?;
  let main = write_file(dir.path(), "main.rs", "fn main() {}\n")?;

  headerkit(dir.path())?
    .args(["add", "--no-config", "--no", "--definition", "Bad.licenseheader", "main.rs"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("non-comment text"));
  assert_eq!(read_file(&main)?, "fn main() {}\n");

  headerkit(dir.path())?
    .args(["add", "--no-config", "--yes", "--definition", "Bad.licenseheader", "main.rs"])
    .assert()
    .success();
  assert_eq!(read_file(&main)?, "// Copyright\nnot a comment\n\nfn main() {}\n");
  Ok(())
}

#[test]
fn test_show_diff() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "My.licenseheader", DEFINITION)?;
  write_file(dir.path(), "lib.rs", "pub fn f() {}\n")?;

  headerkit(dir.path())?
    .args([
      "add",
      "--no-config",
      "--check",
      "--show-diff",
      "--definition",
      "My.licenseheader",
      "lib.rs",
    ])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("+// Copyright Acme"));
  Ok(())
}

#[test]
fn test_missing_definition_fails() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "main.rs", "fn main() {}\n")?;

  headerkit(dir.path())?
    .args(["add", "--no-config", "--definition", "nope.licenseheader", "main.rs"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope.licenseheader"));
  Ok(())
}

#[test]
fn test_save_diff() -> Result<()> {
  let dir = tempdir()?;
  write_file(dir.path(), "My.licenseheader", DEFINITION)?;
  write_file(dir.path(), "lib.rs", "pub fn f() {}\n")?;

  headerkit(dir.path())?
    .args([
      "add",
      "--no-config",
      "--check",
      "--save-diff",
      "changes.diff",
      "--definition",
      "My.licenseheader",
      "lib.rs",
    ])
    .assert()
    .code(1);

  let diff = read_file(&dir.path().join("changes.diff"))?;
  assert!(diff.contains("--- a/lib.rs"));
  assert!(diff.contains("+// Copyright Acme"));
  Ok(())
}
