//! Page and Metadata Stores
//!
//! Published pages live as standalone `<name>.html` documents in one directory.
//! The metadata store maps each page name back to the prompt that created it.

pub mod metadata;
pub mod pages;

pub use metadata::{MetadataRecord, MetadataStore, PageInfo};
pub use pages::{PageStore, TempPage};

use crate::error::StorageError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde::de::Error as _;
use std::fmt;
use std::path::PathBuf;

/// Prefix of published page names
pub const PAGE_PREFIX: &str = "page";

/// Prefix of throwaway validation slots
pub const TEMP_PREFIX: &str = "test";

const MAX_NAME_LEN: usize = 128;

/// `[storage]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<name>.html` documents
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,

    /// JSON document mapping page name to prompt and timestamp
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("pages")
}

fn default_metadata_file() -> PathBuf {
    PathBuf::from("page_metadata.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            metadata_file: default_metadata_file(),
        }
    }
}

/// Identifier of a stored page document
///
/// Restricted to `[A-Za-z0-9_-]` so a name can never escape the pages directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PageName(String);

impl PageName {
    /// Validate an externally supplied name
    pub fn parse(name: &str) -> Result<Self, StorageError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(StorageError::InvalidPageName(name.to_string()))
        }
    }

    /// `<prefix>_<epochSeconds>_<4-digit random>`
    pub fn generate(prefix: &str) -> Self {
        let seconds = chrono::Utc::now().timestamp();
        let disambiguator: u16 = rand::thread_rng().gen_range(1000..=9999);
        Self(format!("{}_{}_{}", prefix, seconds, disambiguator))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Throwaway validation slots never show up as published pages
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(&format!("{}_", TEMP_PREFIX))
    }
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PageName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        PageName::parse(&raw).map_err(D::Error::custom)
    }
}

/// Current time as fractional epoch seconds
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// One row of the page listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageEntry {
    pub name: PageName,
    pub prompt: Option<String>,
    pub timestamp: Option<f64>,
}

/// Published pages joined with their metadata, newest first
///
/// Pages without a record sort last.
pub fn catalog(pages: &PageStore, metadata: &MetadataStore) -> Result<Vec<PageEntry>, StorageError> {
    let mut entries: Vec<PageEntry> = pages
        .list()?
        .into_iter()
        .map(|name| {
            let info = metadata.lookup(name.as_str());
            PageEntry {
                name,
                prompt: info.prompt,
                timestamp: info.timestamp,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        let newer = b.timestamp.unwrap_or(0.0).total_cmp(&a.timestamp.unwrap_or(0.0));
        newer.then_with(|| b.name.cmp(&a.name))
    });
    Ok(entries)
}
