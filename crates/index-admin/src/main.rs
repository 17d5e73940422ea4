//! Posting Index Admin
//!
//! # Usage
//!
//! ```bash
//! index-admin index <DOC_ID> <DOC_NUM> <TERMS>... [--field N]
//! index-admin delete <DOC_ID>
//! index-admin reconcile <DOC_ID> <DOC_NUM>
//! index-admin inspect <DOC_ID> [--target N]
//! index-admin stats [--json]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/posting-index/config.toml)
//! 3. Environment variables (INDEX_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use index_admin::{
    delete_document, index_document, init_logging, inspect_document, load_settings,
    reconcile_document, show_stats, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.db_path.as_deref(),
        cli.log_level.as_deref(),
    )?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Index {
            doc_id,
            doc_num,
            terms,
            field,
        } => {
            let report = index_document(&settings, &doc_id, doc_num, field, &terms).await?;
            println!("{}", report);
        }
        Commands::Delete { doc_id } => {
            let report = delete_document(&settings, &doc_id).await?;
            println!("{}", report);
        }
        Commands::Reconcile { doc_id, doc_num } => {
            let report = reconcile_document(&settings, &doc_id, doc_num).await?;
            println!("{}", report);
        }
        Commands::Inspect { doc_id, target } => {
            let report = inspect_document(&settings, &doc_id, target)?;
            println!("{}", report);
        }
        Commands::Stats { json } => {
            let stats = show_stats(&settings)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats);
            }
        }
    }

    Ok(())
}
