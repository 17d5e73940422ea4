//! Column family definitions for RocksDB.
//!
//! - postings: term-frequency rows, one per (document, field, term, doc number)
//! - counters: small persisted aggregates such as the live document count

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for term-frequency postings
pub const CF_POSTINGS: &str = "postings";

/// Column family name for persisted counters
pub const CF_COUNTERS: &str = "counters";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_POSTINGS, CF_COUNTERS];

/// Postings are rewritten on every document update, so favour compaction
/// throughput over space.
fn postings_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_POSTINGS, postings_options()),
        ColumnFamilyDescriptor::new(CF_COUNTERS, Options::default()),
    ]
}
