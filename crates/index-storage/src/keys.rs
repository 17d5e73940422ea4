//! Key encoding and decoding for storage layer.
//!
//! Term-frequency key format:
//! `t | doc_id_len (u16 BE) | doc_id | field (u16 BE) | term | 0xFF | doc_num (u64 BE)`
//!
//! - The length-prefixed doc id groups every row of one document under a
//!   common prefix that no other document shares, regardless of field,
//!   term or doc number.
//! - Terms are UTF-8 and therefore never contain 0xFF, so the separator
//!   is unambiguous.
//! - Big-endian doc numbers keep versions of one (field, term) in
//!   ascending order.

use index_types::DocNumber;

use crate::error::StorageError;

/// Leading tag byte for term-frequency rows.
pub const TERM_FREQ_TAG: u8 = b't';

/// Separator between the term and the doc number.
pub const TERM_SEPARATOR: u8 = 0xFF;

/// Key of the persisted live document count in the counters column family.
pub const DOC_COUNT_KEY: &[u8] = b"counter:doc_count";

const DOC_NUM_LEN: usize = std::mem::size_of::<DocNumber>();

/// Key for a term-frequency posting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFreqKey {
    /// External document identifier
    pub doc_id: Vec<u8>,
    /// Field number within the document
    pub field: u16,
    /// Indexed term
    pub term: String,
    /// Doc number of the version this posting belongs to
    pub doc_num: DocNumber,
}

impl TermFreqKey {
    pub fn new(
        doc_id: impl Into<Vec<u8>>,
        field: u16,
        term: impl Into<String>,
        doc_num: DocNumber,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            field,
            term: term.into(),
            doc_num,
        }
    }

    /// Prefix shared by every posting of `doc_id`, any field, term or doc number.
    pub fn doc_prefix(doc_id: &[u8]) -> Result<Vec<u8>, StorageError> {
        let len = encode_doc_id_len(doc_id)?;
        let mut prefix = Vec::with_capacity(1 + 2 + doc_id.len());
        prefix.push(TERM_FREQ_TAG);
        prefix.extend_from_slice(&len.to_be_bytes());
        prefix.extend_from_slice(doc_id);
        Ok(prefix)
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        let mut key = Self::doc_prefix(&self.doc_id)?;
        key.reserve(2 + self.term.len() + 1 + DOC_NUM_LEN);
        key.extend_from_slice(&self.field.to_be_bytes());
        key.extend_from_slice(self.term.as_bytes());
        key.push(TERM_SEPARATOR);
        key.extend_from_slice(&self.doc_num.to_be_bytes());
        Ok(key)
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| StorageError::Key("Empty term frequency key".to_string()))?;
        if tag != TERM_FREQ_TAG {
            return Err(StorageError::Key(format!(
                "Invalid term frequency key tag: {:#04x}",
                tag
            )));
        }

        let (len_bytes, rest) = split_checked(rest, 2, "doc id length")?;
        let doc_id_len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        let (doc_id, rest) = split_checked(rest, doc_id_len, "doc id")?;
        let (field_bytes, rest) = split_checked(rest, 2, "field")?;
        let field = u16::from_be_bytes([field_bytes[0], field_bytes[1]]);

        if rest.len() < 1 + DOC_NUM_LEN {
            return Err(StorageError::Key(
                "Truncated term frequency key: missing doc number".to_string(),
            ));
        }
        let (term_and_sep, doc_num_bytes) = rest.split_at(rest.len() - DOC_NUM_LEN);
        let (&separator, term_bytes) = term_and_sep
            .split_last()
            .ok_or_else(|| StorageError::Key("Missing term separator".to_string()))?;
        if separator != TERM_SEPARATOR {
            return Err(StorageError::Key("Missing term separator".to_string()));
        }

        let term = std::str::from_utf8(term_bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8 term: {}", e)))?
            .to_string();
        let mut doc_num = [0u8; DOC_NUM_LEN];
        doc_num.copy_from_slice(doc_num_bytes);

        Ok(Self {
            doc_id: doc_id.to_vec(),
            field,
            term,
            doc_num: DocNumber::from_be_bytes(doc_num),
        })
    }
}

fn encode_doc_id_len(doc_id: &[u8]) -> Result<u16, StorageError> {
    if doc_id.is_empty() {
        return Err(StorageError::Key("Empty doc id".to_string()));
    }
    u16::try_from(doc_id.len()).map_err(|_| {
        StorageError::Key(format!(
            "Doc id too long: {} bytes (max {})",
            doc_id.len(),
            u16::MAX
        ))
    })
}

fn split_checked<'a>(
    bytes: &'a [u8],
    at: usize,
    what: &str,
) -> Result<(&'a [u8], &'a [u8]), StorageError> {
    if bytes.len() < at {
        return Err(StorageError::Key(format!(
            "Truncated term frequency key: missing {}",
            what
        )));
    }
    Ok(bytes.split_at(at))
}
