//! Tests for PageIndex
//!
//! These tests verify:
//! - The last entry is reused while it has room
//! - A new page is reserved when it does not
//! - Clones never change the original's entries
//! - Key lookup by first key
//! - Releasing the pages a clone added

use std::sync::Arc;

use strata::collection::PageIndex;
use strata::config::Config;
use strata::storage::PageStore;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Arc<PageStore>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("index.db"))
        .block_size(4096)
        .build();
    let store = Arc::new(PageStore::open(&config).unwrap());
    (temp_dir, store)
}

/// Reserve `size` bytes and stamp the entry's first key
fn fill(index: &mut PageIndex, size: u64, key: u64) {
    let entry = index.get_entry_for_insert(size).unwrap();
    if entry.first_key == 0 {
        entry.first_key = key;
    }
    entry.used += size;
}

// =============================================================================
// Placement Tests
// =============================================================================

#[test]
fn test_first_insert_reserves_initial_page() {
    let (_temp, store) = setup_temp_store();
    let mut index = PageIndex::new(store, 10_000);

    let entry = index.get_entry_for_insert(16).unwrap();

    assert_eq!(entry.offset, 0);
    assert_eq!(entry.size, 12_288);
    assert_eq!(entry.used, 0);
    assert_eq!(index.len(), 1);
}

#[test]
fn test_last_entry_reused_while_it_fits() {
    let (_temp, store) = setup_temp_store();
    let mut index = PageIndex::new(store, 4096);

    fill(&mut index, 1000, 1);
    fill(&mut index, 1000, 2);
    fill(&mut index, 2096, 3);

    assert_eq!(index.len(), 1);
    assert_eq!(index.entries()[0].used, 4096);
    assert_eq!(index.entries()[0].remaining(), 0);
}

#[test]
fn test_new_page_when_last_is_full() {
    let (_temp, store) = setup_temp_store();
    let mut index = PageIndex::new(store, 4096);

    fill(&mut index, 3000, 1);
    fill(&mut index, 3000, 2);

    assert_eq!(index.len(), 2);
    assert_eq!(index.entries()[1].offset, 4096);
    assert_eq!(index.bytes_used(), 6000);
}

#[test]
fn test_oversized_insert_gets_large_page() {
    let (_temp, store) = setup_temp_store();
    let mut index = PageIndex::new(store, 4096);

    let entry = index.get_entry_for_insert(10_000).unwrap();

    assert!(entry.size >= 10_000);
    assert_eq!(entry.size % 4096, 0);
}

// =============================================================================
// Copy-on-Write Tests
// =============================================================================

#[test]
fn test_clone_leaves_original_untouched() {
    let (_temp, store) = setup_temp_store();
    let mut published = PageIndex::new(store, 4096);
    fill(&mut published, 1000, 1);

    let mut draft = published.clone();
    fill(&mut draft, 1000, 2);
    fill(&mut draft, 4000, 3);

    assert_eq!(published.len(), 1);
    assert_eq!(published.entries()[0].used, 1000);
    assert_eq!(draft.len(), 2);
    assert_eq!(draft.entries()[0].used, 2000);
}

#[test]
fn test_release_new_pages_frees_only_added_pages() {
    let (_temp, store) = setup_temp_store();
    let mut published = PageIndex::new(Arc::clone(&store), 4096);
    fill(&mut published, 1000, 1);

    let mut draft = published.clone();
    fill(&mut draft, 4000, 2);
    fill(&mut draft, 4000, 3);

    let released = draft.release_new_pages(published.len());

    assert_eq!(released, 2);
    assert_eq!(store.allocator().free_pages(), 2);
    assert_eq!(store.allocator().free_bytes(), 8192);

    // The freed pages come back before the store grows
    let reused = store.allocate(4096).unwrap();
    assert_eq!(reused.offset, draft.entries()[1].offset);
}

#[test]
fn test_release_with_nothing_added() {
    let (_temp, store) = setup_temp_store();
    let mut index = PageIndex::new(Arc::clone(&store), 4096);
    fill(&mut index, 10, 1);

    assert_eq!(index.release_new_pages(index.len()), 0);
    assert_eq!(store.allocator().free_pages(), 0);
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_locate_by_first_key() {
    let (_temp, store) = setup_temp_store();
    let mut index = PageIndex::new(store, 4096);

    fill(&mut index, 3000, 10);
    fill(&mut index, 3000, 20);
    fill(&mut index, 3000, 30);

    assert!(index.locate(5).is_none());
    assert_eq!(index.locate(10).unwrap().first_key, 10);
    assert_eq!(index.locate(19).unwrap().first_key, 10);
    assert_eq!(index.locate(20).unwrap().first_key, 20);
    assert_eq!(index.locate(1_000).unwrap().first_key, 30);
}

#[test]
fn test_locate_in_empty_index() {
    let (_temp, store) = setup_temp_store();
    let index = PageIndex::new(store, 4096);

    assert!(index.is_empty());
    assert!(index.locate(1).is_none());
}
