//! CLI module for lgnet - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running tasks,
//! dry-run evaluation and result lookup.

pub mod commands;

pub use commands::Cli;
