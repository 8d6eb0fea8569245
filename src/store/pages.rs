//! Page document storage
//!
//! Every page, published or temporary, is a `<name>.html` file in one directory.
//! Writes use create-new semantics so a fresh name can never overwrite an
//! existing document.

use super::{PageName, PAGE_PREFIX, TEMP_PREFIX};
use crate::error::StorageError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Attempts at finding an unused name before giving up
const MAX_NAME_ATTEMPTS: usize = 32;

/// Directory-backed page storage
#[derive(Debug)]
pub struct PageStore {
    root: PathBuf,
}

impl PageStore {
    /// Open (and create if needed) the pages directory
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to create pages directory at {:?}: {}", root, e),
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &PageName) -> PathBuf {
        self.root.join(format!("{}.html", name))
    }

    /// Persist `body` under a freshly generated `page_*` name
    pub fn publish(&self, body: &str) -> Result<PageName, StorageError> {
        let name = self.write_new(PAGE_PREFIX, body)?;
        debug!(page_name = %name, "Published page document");
        Ok(name)
    }

    /// Persist `body` under a throwaway `test_*` slot, removed when the guard drops
    pub fn stage_temporary(&self, body: &str) -> Result<TempPage, StorageError> {
        let name = self.write_new(TEMP_PREFIX, body)?;
        let path = self.path_for(&name);
        debug!(path = %path.display(), "Created temporary page");
        Ok(TempPage { name, path })
    }

    /// Read a page document; `None` if it does not exist
    pub fn read(&self, name: &PageName) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(name)) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    pub fn exists(&self, name: &PageName) -> bool {
        self.path_for(name).is_file()
    }

    /// Remove a page document
    pub fn remove(&self, name: &PageName) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::PageNotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    /// Names of all published pages (temporary slots excluded), unordered
    pub fn list(&self) -> Result<Vec<PageName>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", self.root.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(name) = PageName::parse(stem) {
                if !name.is_temporary() {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    fn write_new(&self, prefix: &str, body: &str) -> Result<PageName, StorageError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = PageName::generate(prefix);
            let path = self.path_for(&name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::IoError(e)),
            };

            let written = file
                .write_all(body.as_bytes())
                .and_then(|_| file.sync_all());
            if let Err(e) = written {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(StorageError::IoError(e));
            }
            return Ok(name);
        }

        Err(StorageError::IoError(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("No free '{}' name after {} attempts", prefix, MAX_NAME_ATTEMPTS),
        )))
    }
}

/// Scoped temporary page; the document is deleted when this guard drops
#[derive(Debug)]
pub struct TempPage {
    name: PageName,
    path: PathBuf,
}

impl TempPage {
    pub fn name(&self) -> &PageName {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempPage {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Deleted temporary page"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Error deleting temporary page"
            ),
        }
    }
}
