//! Index admin library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (index, delete, reconcile, inspect, stats)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    delete_document, index_document, init_logging, inspect_document, load_settings,
    reconcile_document, show_stats, DocumentReport, ReconcileReport, StatsReport,
};
