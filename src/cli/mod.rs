//! # CLI Module
//!
//! This module contains the command-line interface implementation.
//! It uses clap for argument parsing with one subcommand per action:
//! `add` inserts or replaces headers, `remove` strips them.

mod apply;

pub use apply::{Action, AddArgs, CommonArgs, RemoveArgs, parse_token, run_apply};
use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Parser, Subcommand};

const CUSTOM_STYLES: Styles = Styles::styled()
  .header(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .usage(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))).bold())
  .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
  .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))).bold())
  .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
  .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))));

/// Top-level CLI arguments
#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about,
  styles = CUSTOM_STYLES,
  after_help = "Examples:
  # Add or update headers from a definition file
  headerkit add --definition MyProject.licenseheader src/

  # Report files whose header would change, without writing
  headerkit add --check --definition MyProject.licenseheader src/

  # Show what would change
  headerkit add --check --show-diff --definition MyProject.licenseheader \"src/**/*.cs\"

  # Fill in a custom token
  headerkit add --definition MyProject.licenseheader --token Company=\"Acme Inc.\" src/

  # Strip existing license headers
  headerkit remove src/
",
  help_template = "{before-help}{name} v{version}
{about-section}
{usage-heading} {usage}

{all-args}{after-help}
"
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
  /// Insert or replace license headers
  Add(AddArgs),
  /// Remove existing license headers
  Remove(RemoveArgs),
}

impl Cli {
  /// Parse CLI arguments and return the Cli struct
  pub fn parse_args() -> Self {
    Self::parse()
  }

  /// Split the command into its shared arguments and action.
  pub fn into_action(self) -> (CommonArgs, Action) {
    match self.command {
      Command::Add(args) => {
        let answer = args.answer();
        let action = Action::Add {
          definition: args.definition,
          tokens: args.token,
          answer,
          user_display_name: args.user_display_name,
        };
        (args.common, action)
      }
      Command::Remove(args) => (args.common, Action::Remove),
    }
  }
}
