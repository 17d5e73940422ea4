//! Command implementations for the index admin tool.
//!
//! Every mutating command runs one notification through a short-lived
//! [`Lookuper`] with a [`PostingPruner`] sink, waits for it to drain, and
//! persists the resulting live document count.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use index_reconcile::{
    obsolete_doc_nums, DocCount, DrainWait, Lookuper, PostingPruner, Reconciler,
};
use index_storage::{PostingReader, Storage, TermFreqKey, TermFreqRow};
use index_types::{DocNumber, DocNumberList, Settings, DELETED_DOC_NUM};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn open_storage(settings: &Settings) -> Result<Arc<Storage>> {
    let db_path = settings.expanded_db_path();
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("Failed to create database directory {:?}", db_path))?;
    let storage = Storage::open(Path::new(&db_path))
        .with_context(|| format!("Failed to open storage at {:?}", db_path))?;
    Ok(Arc::new(storage))
}

/// Persisted count if one was saved, otherwise the documents currently stored.
fn seed_doc_count(storage: &Storage) -> Result<DocCount> {
    match storage.get_doc_count()? {
        Some(count) => Ok(DocCount::new(count)),
        None => Ok(DocCount::from_storage(storage)?),
    }
}

/// Result of one reconciled notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub doc_id: String,
    pub doc_num: DocNumber,
    pub doc_count_before: u64,
    pub doc_count_after: u64,
    pub remaining_doc_nums: DocNumberList,
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Document:      {}", self.doc_id)?;
        writeln!(f, "Doc number:    {}", self.doc_num)?;
        writeln!(
            f,
            "Live docs:     {} -> {}",
            self.doc_count_before, self.doc_count_after
        )?;
        write!(f, "Remaining:     {:?}", self.remaining_doc_nums)
    }
}

async fn reconcile_once(
    settings: &Settings,
    storage: Arc<Storage>,
    doc_count: DocCount,
    doc_id: &str,
    doc_num: DocNumber,
) -> Result<ReconcileReport> {
    let doc_count_before = doc_count.get();
    let sink = Arc::new(PostingPruner::new(Arc::clone(&storage)));
    let reconciler = Reconciler::new(storage.clone(), sink, doc_count.clone());
    let mut lookuper = Lookuper::new(reconciler, settings.reconciler.clone())?;
    lookuper.start()?;

    let drained = match lookuper.notify(doc_num, doc_id).await {
        Ok(()) => {
            lookuper
                .drain_hook()
                .wait_tasks_done(settings.reconciler.drain_timeout())
                .await
        }
        Err(e) => Err(e),
    };
    lookuper.stop().await?;
    drained.with_context(|| format!("Reconciliation of {} did not complete", doc_id))?;

    storage.put_doc_count(doc_count.get())?;
    storage.flush()?;

    let report = ReconcileReport {
        doc_id: doc_id.to_string(),
        doc_num,
        doc_count_before,
        doc_count_after: doc_count.get(),
        remaining_doc_nums: stored_doc_nums(&storage, doc_id)?.0,
    };
    info!(
        doc_id,
        doc_num,
        before = report.doc_count_before,
        after = report.doc_count_after,
        "Reconciled document"
    );
    Ok(report)
}

/// Write `terms` as version `doc_num` of `doc_id`, then retire older versions.
pub async fn index_document(
    settings: &Settings,
    doc_id: &str,
    doc_num: DocNumber,
    field: u16,
    terms: &[String],
) -> Result<ReconcileReport> {
    if doc_num == DELETED_DOC_NUM {
        bail!("Doc number {} is reserved for deletes", DELETED_DOC_NUM);
    }
    if terms.is_empty() {
        bail!("At least one term is required");
    }

    let storage = open_storage(settings)?;
    // Seed before writing so the new version is counted by reconciliation only.
    let doc_count = seed_doc_count(&storage)?;

    let mut term_freqs: Vec<(&str, u64)> = Vec::new();
    for term in terms {
        match term_freqs.iter_mut().find(|(t, _)| *t == term.as_str()) {
            Some((_, freq)) => *freq += 1,
            None => term_freqs.push((term.as_str(), 1)),
        }
    }
    // Length norm shared by every row of this version.
    let norm = 1.0 / (terms.len() as f32).sqrt();
    let rows: Vec<TermFreqRow> = term_freqs
        .into_iter()
        .map(|(term, freq)| {
            TermFreqRow::new(doc_id.as_bytes().to_vec(), field, term, doc_num, freq)
                .with_norm(norm)
        })
        .collect();
    storage
        .put_postings(&rows)
        .with_context(|| format!("Failed to write postings for {}", doc_id))?;
    debug!(doc_id, doc_num, rows = rows.len(), "Wrote postings");

    reconcile_once(settings, storage, doc_count, doc_id, doc_num).await
}

/// Retire every posting of `doc_id`.
pub async fn delete_document(settings: &Settings, doc_id: &str) -> Result<ReconcileReport> {
    reconcile_document(settings, doc_id, DELETED_DOC_NUM).await
}

/// Run a notification for postings that are already stored.
///
/// A non-zero `doc_num` with nothing older stored is refused: the worker
/// would count it as a new document, and replaying the current version of
/// an existing one would inflate the persisted live count.
pub async fn reconcile_document(
    settings: &Settings,
    doc_id: &str,
    doc_num: DocNumber,
) -> Result<ReconcileReport> {
    let storage = open_storage(settings)?;
    if doc_num != DELETED_DOC_NUM {
        let (stored, _) = stored_doc_nums(&storage, doc_id)?;
        if obsolete_doc_nums(&stored, doc_num).is_empty() {
            bail!(
                "Nothing older than doc number {} is stored for {} (stored: {:?})",
                doc_num,
                doc_id,
                stored
            );
        }
    }
    let doc_count = seed_doc_count(&storage)?;
    reconcile_once(settings, storage, doc_count, doc_id, doc_num).await
}

/// Stored versions of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub doc_id: String,
    pub posting_count: u64,
    pub doc_nums: DocNumberList,
    pub target: Option<DocNumber>,
    pub obsolete: Option<DocNumberList>,
}

impl std::fmt::Display for DocumentReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Document:      {}", self.doc_id)?;
        writeln!(f, "Postings:      {}", self.posting_count)?;
        write!(f, "Doc numbers:   {:?}", self.doc_nums)?;
        if let (Some(target), Some(obsolete)) = (self.target, &self.obsolete) {
            write!(f, "\nObsolete at {}: {:?}", target, obsolete)?;
        }
        Ok(())
    }
}

/// Sorted distinct doc numbers of `doc_id` and its row count.
fn stored_doc_nums(storage: &Storage, doc_id: &str) -> Result<(DocNumberList, u64)> {
    let prefix = TermFreqKey::doc_prefix(doc_id.as_bytes())?;
    let reader = storage.reader()?;

    let mut doc_nums = DocNumberList::new();
    let mut rows = 0u64;
    reader.visit_prefix(&prefix, &mut |key: &[u8], value: &[u8]| {
        doc_nums.push(TermFreqRow::from_kv(key, value)?.doc_num());
        rows += 1;
        Ok(true)
    })?;
    Box::new(reader).close()?;

    doc_nums.sort_unstable();
    doc_nums.dedup();
    Ok((doc_nums, rows))
}

/// Show what is stored for `doc_id`, and optionally what a notification
/// for `target` would retire.
pub fn inspect_document(
    settings: &Settings,
    doc_id: &str,
    target: Option<DocNumber>,
) -> Result<DocumentReport> {
    let storage = open_storage(settings)?;
    let (doc_nums, posting_count) = stored_doc_nums(&storage, doc_id)?;
    let obsolete = target.map(|target| obsolete_doc_nums(&doc_nums, target));

    Ok(DocumentReport {
        doc_id: doc_id.to_string(),
        posting_count,
        doc_nums,
        target,
        obsolete,
    })
}

/// Store-wide totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub db_path: String,
    pub posting_count: u64,
    pub document_count: u64,
    pub live_doc_count: Option<u64>,
}

impl std::fmt::Display for StatsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database:      {}", self.db_path)?;
        writeln!(f, "Postings:      {}", self.posting_count)?;
        writeln!(f, "Documents:     {}", self.document_count)?;
        match self.live_doc_count {
            Some(count) => write!(f, "Live count:    {}", count),
            None => write!(f, "Live count:    (never reconciled)"),
        }
    }
}

pub fn show_stats(settings: &Settings) -> Result<StatsReport> {
    let storage = open_storage(settings)?;
    let stats = storage.stats()?;
    Ok(StatsReport {
        db_path: settings.expanded_db_path().to_string_lossy().to_string(),
        posting_count: stats.posting_count,
        document_count: stats.document_count,
        live_doc_count: storage.get_doc_count()?,
    })
}
