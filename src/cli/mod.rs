//! CLI module for adflint - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for linting a template
//! and listing the available checks.

pub mod commands;

pub use commands::Cli;
