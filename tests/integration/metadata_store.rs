//! Integration tests for the page metadata store

use pageforge::error::StorageError;
use pageforge::store::{catalog, MetadataStore, PageInfo, PageName, PageStore};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_records_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("page_metadata.json");
    let name = PageName::parse("page_1700000000_1234").unwrap();

    {
        let store = MetadataStore::open(&path).unwrap();
        store.record(&name, "a to-do list").unwrap();
    }

    let reopened = MetadataStore::open(&path).unwrap();
    let info = reopened.lookup(name.as_str());
    assert_eq!(info.prompt.as_deref(), Some("a to-do list"));
    assert!(info.timestamp.unwrap() > 1_600_000_000.0);

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document[name.as_str()]["prompt"], "a to-do list");
    assert!(document[name.as_str()]["timestamp"].is_f64());
}

#[test]
fn test_unknown_page_yields_empty_info() {
    let temp = TempDir::new().unwrap();
    let store = MetadataStore::open(temp.path().join("missing.json")).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.lookup("page_0_0000"), PageInfo::default());
}

#[test]
fn test_corrupt_document_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("page_metadata.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = MetadataStore::open(&path);
    assert!(matches!(result, Err(StorageError::Serialization(_))));
}

#[test]
fn test_concurrent_writers_lose_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("page_metadata.json");
    let store = Arc::new(MetadataStore::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let name = PageName::parse(&format!("page_1700000000_{}", 1000 + i)).unwrap();
                store.record(&name, &format!("prompt {}", i)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8);
    assert_eq!(MetadataStore::open(&path).unwrap().len(), 8);
}

#[test]
fn test_catalog_skips_validation_slots() {
    let temp = TempDir::new().unwrap();
    let pages = PageStore::new(temp.path().join("pages")).unwrap();
    let metadata = MetadataStore::open(temp.path().join("page_metadata.json")).unwrap();

    let published = pages.publish("<!DOCTYPE html>").unwrap();
    metadata.record(&published, "kept").unwrap();
    let slot = pages.stage_temporary("<!DOCTYPE html>").unwrap();
    assert!(slot.path().exists());

    let entries = catalog(&pages, &metadata).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, published);

    let slot_path = slot.path().to_path_buf();
    drop(slot);
    assert!(!slot_path.exists());
}
