//! CLI argument parsing for the index admin tool.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Posting index admin
///
/// Write, inspect and reconcile document postings in a local index.
#[derive(Parser, Debug)]
#[command(name = "index-admin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/posting-index/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Admin commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a document version and reconcile older versions
    Index {
        /// Document identifier
        doc_id: String,

        /// Doc number assigned to this version (must be non-zero)
        doc_num: u64,

        /// Terms to index
        #[arg(required = true)]
        terms: Vec<String>,

        /// Field number the terms belong to
        #[arg(short, long, default_value_t = 0)]
        field: u16,
    },

    /// Delete a document by retiring all of its postings
    Delete {
        /// Document identifier
        doc_id: String,
    },

    /// Replay a notification for postings that are already stored
    ///
    /// Refused unless an older version is stored, since a replay that
    /// retires nothing would count the document again.
    Reconcile {
        /// Document identifier
        doc_id: String,

        /// Target doc number (0 deletes)
        doc_num: u64,
    },

    /// Show the stored doc numbers of a document
    Inspect {
        /// Document identifier
        doc_id: String,

        /// Also show which doc numbers a notification for this target would retire
        #[arg(short, long)]
        target: Option<u64>,
    },

    /// Show storage statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_index() {
        let cli = Cli::parse_from(["index-admin", "index", "doc-1", "7", "alpha", "beta"]);
        match cli.command {
            Commands::Index {
                doc_id,
                doc_num,
                terms,
                field,
            } => {
                assert_eq!(doc_id, "doc-1");
                assert_eq!(doc_num, 7);
                assert_eq!(terms, vec!["alpha", "beta"]);
                assert_eq!(field, 0);
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_cli_index_requires_terms() {
        let result = Cli::try_parse_from(["index-admin", "index", "doc-1", "7"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_index_with_field() {
        let cli = Cli::parse_from(["index-admin", "index", "doc-1", "3", "x", "--field", "4"]);
        match cli.command {
            Commands::Index { field, .. } => assert_eq!(field, 4),
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_cli_delete() {
        let cli = Cli::parse_from(["index-admin", "delete", "doc-1"]);
        assert!(matches!(cli.command, Commands::Delete { doc_id } if doc_id == "doc-1"));
    }

    #[test]
    fn test_cli_reconcile() {
        let cli = Cli::parse_from(["index-admin", "reconcile", "doc-1", "0"]);
        match cli.command {
            Commands::Reconcile { doc_id, doc_num } => {
                assert_eq!(doc_id, "doc-1");
                assert_eq!(doc_num, 0);
            }
            _ => panic!("Expected Reconcile command"),
        }
    }

    #[test]
    fn test_cli_inspect_with_target() {
        let cli = Cli::parse_from(["index-admin", "inspect", "doc-1", "-t", "9"]);
        match cli.command {
            Commands::Inspect { target, .. } => assert_eq!(target, Some(9)),
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "index-admin",
            "stats",
            "--config",
            "/path/to/config.toml",
            "--db-path",
            "/tmp/index",
            "-l",
            "debug",
        ]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.db_path, Some("/tmp/index".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Stats { json: false }));
    }
}
