//! Page metadata persistence
//!
//! A single JSON document maps page name to `{prompt, timestamp}`. Every update
//! rewrites the whole document (write temp file, fsync, rename), which is only
//! sound because the worker is the single writer.

use super::{epoch_seconds, PageName};
use crate::error::StorageError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persisted record, created once when a page is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub prompt: String,
    /// Epoch seconds
    pub timestamp: f64,
}

/// Lookup result; both fields are `None` for unknown pages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub prompt: Option<String>,
    pub timestamp: Option<f64>,
}

impl From<MetadataRecord> for PageInfo {
    fn from(record: MetadataRecord) -> Self {
        Self {
            prompt: Some(record.prompt),
            timestamp: Some(record.timestamp),
        }
    }
}

pub struct MetadataStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, MetadataRecord>>,
}

impl MetadataStore {
    /// Open the store, loading the existing document if there is one
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let records = read_document(&path)?;
        debug!(path = %path.display(), records = records.len(), "Loaded page metadata");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert the record for `name` and persist before returning
    pub fn record(&self, name: &PageName, prompt: &str) -> Result<MetadataRecord, StorageError> {
        let record = MetadataRecord {
            prompt: prompt.to_string(),
            timestamp: epoch_seconds(),
        };

        let mut records = self.records.lock();
        let mut updated = records.clone();
        updated.insert(name.to_string(), record.clone());
        write_document(&self.path, &updated)?;
        *records = updated;

        debug!(page_name = %name, "Stored page metadata");
        Ok(record)
    }

    /// Never fails; unknown names yield the empty `PageInfo`
    pub fn lookup(&self, name: &str) -> PageInfo {
        self.records
            .lock()
            .get(name)
            .cloned()
            .map(PageInfo::from)
            .unwrap_or_default()
    }

    /// Snapshot of the full mapping
    pub fn load_all(&self) -> BTreeMap<String, MetadataRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

fn read_document(path: &Path) -> Result<BTreeMap<String, MetadataRecord>, StorageError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(StorageError::IoError(e)),
    };
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&contents)?)
}

fn write_document(
    path: &Path,
    records: &BTreeMap<String, MetadataRecord>,
) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let serialized = serde_json::to_string_pretty(records)?;
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
