//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: process task files through the queue and worker pool
//! - eval: evaluate networks without persisting anything
//! - result: look up a stored result by task id
//! - history: list recent results and their statistics

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lgnet - adaptive LG-unit network evaluator
#[derive(Parser, Debug)]
#[command(name = "lgnet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Result database path (overrides config)
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

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
    /// Queue tasks from JSON files and process them
    Run {
        /// Task files (one task object or an array per file)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of workers (overrides config)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },

    /// Evaluate networks without persisting results
    Eval {
        /// Task file to evaluate
        file: PathBuf,
    },

    /// Show the stored result for a task
    Result {
        /// Task ID to look up
        task_id: String,
    },

    /// List recent results
    History {
        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["lgnet"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["lgnet", "-v", "-c", "/etc/lg.yml", "history"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/etc/lg.yml")));
        assert!(cli.store.is_none());
    }

    #[test]
    fn test_run_with_files_and_concurrency() {
        let cli = Cli::try_parse_from(["lgnet", "run", "a.json", "b.json", "-j", "4"]).unwrap();
        match cli.command {
            Commands::Run { files, concurrency } => {
                assert_eq!(files, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
                assert_eq!(concurrency, Some(4));
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_requires_files() {
        assert!(Cli::try_parse_from(["lgnet", "run"]).is_err());
    }

    #[test]
    fn test_result_command() {
        let cli = Cli::try_parse_from(["lgnet", "--store", "/tmp/r.db", "result", "task-1"]).unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/r.db")));
        match cli.command {
            Commands::Result { task_id } => assert_eq!(task_id, "task-1"),
            _ => panic!("Expected result command"),
        }
    }

    #[test]
    fn test_history_default_limit() {
        let cli = Cli::try_parse_from(["lgnet", "history"]).unwrap();
        match cli.command {
            Commands::History { limit } => assert_eq!(limit, 10),
            _ => panic!("Expected history command"),
        }

        let cli = Cli::try_parse_from(["lgnet", "history", "-n", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::History { limit: 3 }));
    }

    #[test]
    fn test_eval_command() {
        let cli = Cli::try_parse_from(["lgnet", "eval", "net.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Eval { ref file } if file == &PathBuf::from("net.json")));
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
