//! Term-frequency row codec.
//!
//! A row pairs a [`TermFreqKey`] with a JSON-encoded [`TermFreqValue`].

use serde::{Deserialize, Serialize};

use index_types::DocNumber;

use crate::error::StorageError;
use crate::keys::TermFreqKey;

/// Value stored alongside a term-frequency key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermFreqValue {
    /// Number of occurrences of the term in the field
    pub freq: u64,
    /// Field length normalisation factor
    #[serde(default = "default_norm")]
    pub norm: f32,
}

fn default_norm() -> f32 {
    1.0
}

impl TermFreqValue {
    pub fn new(freq: u64, norm: f32) -> Self {
        Self { freq, norm }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(self).map_err(StorageError::from)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        serde_json::from_slice(bytes).map_err(StorageError::from)
    }
}

/// A decoded term-frequency posting.
#[derive(Debug, Clone, PartialEq)]
pub struct TermFreqRow {
    pub key: TermFreqKey,
    pub value: TermFreqValue,
}

impl TermFreqRow {
    pub fn new(
        doc_id: impl Into<Vec<u8>>,
        field: u16,
        term: impl Into<String>,
        doc_num: DocNumber,
        freq: u64,
    ) -> Self {
        Self {
            key: TermFreqKey::new(doc_id, field, term, doc_num),
            value: TermFreqValue::new(freq, default_norm()),
        }
    }

    /// Override the normalisation factor.
    pub fn with_norm(mut self, norm: f32) -> Self {
        self.value.norm = norm;
        self
    }

    /// Decode a stored key/value pair.
    pub fn from_kv(key: &[u8], value: &[u8]) -> Result<Self, StorageError> {
        Ok(Self {
            key: TermFreqKey::from_bytes(key)?,
            value: TermFreqValue::from_bytes(value)?,
        })
    }

    /// Encode into a key/value pair for storage.
    pub fn to_kv(&self) -> Result<(Vec<u8>, Vec<u8>), StorageError> {
        Ok((self.key.to_bytes()?, self.value.to_bytes()?))
    }

    pub fn doc_id(&self) -> &[u8] {
        &self.key.doc_id
    }

    pub fn doc_num(&self) -> DocNumber {
        self.key.doc_num
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_kv_roundtrip() {
        let row = TermFreqRow::new(b"doc-9".to_vec(), 2, "index", 11, 4).with_norm(0.5);
        let (key, value) = row.to_kv().unwrap();
        let decoded = TermFreqRow::from_kv(&key, &value).unwrap();
        assert_eq!(decoded, row);
        assert_eq!(decoded.doc_num(), 11);
        assert_eq!(decoded.doc_id(), b"doc-9");
    }

    #[test]
    fn test_value_json_format() {
        let bytes = TermFreqValue::new(3, 1.0).to_bytes().unwrap();
        let json = String::from_utf8(bytes).unwrap();
        assert!(json.contains("\"freq\":3"));
    }

    #[test]
    fn test_value_norm_defaults() {
        let value = TermFreqValue::from_bytes(br#"{"freq":2}"#).unwrap();
        assert_eq!(value.norm, 1.0);
    }

    #[test]
    fn test_from_kv_rejects_bad_value() {
        let key = TermFreqKey::new(b"d".to_vec(), 0, "t", 1).to_bytes().unwrap();
        let result = TermFreqRow::from_kv(&key, b"not json");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
