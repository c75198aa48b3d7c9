//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - lint: run checks against an exported template
//! - list-checks: print every registered check

use adflint::report::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// adflint - Governance linter for Azure Data Factory templates
#[derive(Parser, Debug)]
#[command(name = "adflint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lint an exported ARM template
    Lint {
        /// Path to the template JSON file
        template: PathBuf,

        /// Only run these checks (repeatable)
        #[arg(short = 'k', long = "check")]
        checks: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Exit successfully even when findings are reported
        #[arg(long)]
        no_assert: bool,
    },

    /// List all available checks
    ListChecks,
}
