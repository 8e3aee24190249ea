//! blob operations for record storage.
//!
//! each record is stored as a separate JSON file with metadata fields for
//! version tracking. table options live as JSON blobs too.

use serde::{Deserialize, Serialize};

use super::types::{BlobId, RecordKey};
use crate::store::{Document, PrimaryKey, StoreError, StoreResult, TableOptions};

/// a stored record with metadata and the user document
///
/// The format stored in git:
/// ```text
/// {
///   "_pk": "p1",
///   "_version": 2,
///   "_created_at": "2024-01-01T00:00:00+00:00",
///   "_updated_at": "2024-01-02T00:00:00+00:00",
///   "id": "p1",
///   "name": "Ada"
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// must match the key encoded in the file name
    pub key: RecordKey,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
    pub data: Document,
}

impl Record {
    /// new record at version 1, stamped with the current time
    pub fn new(key: RecordKey, data: Document) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            key,
            version: 1,
            created_at: now.clone(),
            updated_at: now,
            data,
        }
    }

    /// merge fields into the document, bumping version and timestamp
    pub fn merge(&mut self, updates: Document) {
        self.data.extend(updates);
        self.version += 1;
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// on-disk format; `_` prefix keeps metadata apart from user fields
#[derive(Serialize, Deserialize)]
struct RecordJson {
    #[serde(rename = "_pk")]
    pk: PrimaryKey,
    #[serde(rename = "_version")]
    version: u64,
    #[serde(rename = "_created_at")]
    created_at: String,
    #[serde(rename = "_updated_at")]
    updated_at: String,
    #[serde(flatten)]
    data: Document,
}

pub fn serialize_record(record: &Record) -> StoreResult<Vec<u8>> {
    let json = RecordJson {
        pk: record.key.primary_key().clone(),
        version: record.version,
        created_at: record.created_at.clone(),
        updated_at: record.updated_at.clone(),
        data: record.data.clone(),
    };

    Ok(serde_json::to_vec_pretty(&json)?)
}

/// deserialize a record, checking the embedded key against the file name
pub fn deserialize_record(bytes: &[u8], expected_key: &RecordKey) -> StoreResult<Record> {
    let json: RecordJson = serde_json::from_slice(bytes)?;

    if &json.pk != expected_key.primary_key() {
        return Err(StoreError::CorruptedData {
            path: expected_key.file_name().into(),
            reason: format!(
                "primary key mismatch: file name suggests '{}' but content has '{}'",
                expected_key, json.pk
            ),
        });
    }

    Ok(Record {
        key: expected_key.clone(),
        version: json.version,
        created_at: json.created_at,
        updated_at: json.updated_at,
        data: json.data,
    })
}

/// write a record blob, returning its ID
pub fn write_record(repo: &git2::Repository, record: &Record) -> StoreResult<BlobId> {
    let bytes = serialize_record(record)?;
    Ok(BlobId::new(repo.blob(&bytes)?))
}

pub fn read_record(repo: &git2::Repository, blob_id: BlobId, key: &RecordKey) -> StoreResult<Record> {
    let blob = repo.find_blob(blob_id.raw())?;
    deserialize_record(blob.content(), key)
}

pub fn write_table_options(repo: &git2::Repository, options: &TableOptions) -> StoreResult<BlobId> {
    let bytes = serde_json::to_vec_pretty(options)?;
    Ok(BlobId::new(repo.blob(&bytes)?))
}

pub fn read_table_options(repo: &git2::Repository, blob_id: BlobId) -> StoreResult<TableOptions> {
    let blob = repo.find_blob(blob_id.raw())?;
    Ok(serde_json::from_slice(blob.content())?)
}
