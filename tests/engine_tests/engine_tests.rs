//! Tests for Engine
//!
//! These tests verify:
//! - Opening creates the backing file
//! - Open failures surface as errors
//! - Streams and collections share one store
//! - Collections are get-or-create by schema name
//! - Engine lifecycle (sync/close/reopen)

use std::sync::Arc;

use strata::clock::ManualClock;
use strata::config::Config;
use strata::engine::Engine;
use strata::error::StrataError;
use strata::schema::Schema;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("engine.db"))
        .block_size(4096)
        .index_initial_page_size(4096)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_open_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fresh.db");

    let config = Config::builder().path(&path).build();
    let _engine = Engine::open(config).unwrap();

    assert!(path.exists());
}

#[test]
fn test_engine_open_bad_path() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("no").join("such").join("dir.db"))
        .build();

    let result = Engine::open(config);

    assert!(matches!(result, Err(StrataError::Open { .. })));
}

#[test]
fn test_engine_open_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("engine.db"))
        .rows_per_page_hint(0)
        .build();

    assert!(matches!(Engine::open(config), Err(StrataError::Config(_))));
}

#[test]
fn test_engine_close_syncs() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("engine.db");
    let config = Config::builder().path(&path).block_size(4096).build();

    let engine = Engine::open(config).unwrap();
    engine.append_row("s", b"row").unwrap();
    engine.close().unwrap();

    assert!(std::fs::metadata(&path).unwrap().len() >= 4096);
}

// =============================================================================
// Stream Tests
// =============================================================================

#[test]
fn test_engine_append_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("engine.db"))
        .block_size(4096)
        .build();
    let clock = Arc::new(ManualClock::new(500));
    let engine = Engine::open_with_clock(config, clock.clone()).unwrap();

    engine.append_row("temps", b"21.5").unwrap();
    clock.advance(100);
    engine.append_row("temps", b"22.0").unwrap();

    let mut cursor = engine.get_cursor("temps");
    assert!(cursor.seek_to_last().unwrap());
    let row = cursor.read_row().unwrap();

    assert_eq!(row.time, 600);
    assert_eq!(&row.data[..], b"22.0");
    assert_eq!(engine.streams().stream_count(), 1);
}

// =============================================================================
// Collection Tests
// =============================================================================

#[test]
fn test_collection_get_or_create() {
    let (_temp, engine) = setup_temp_engine();

    let a = engine.collection(Schema::new("events")).unwrap();
    let b = engine.collection(Schema::new("events")).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(engine.collection_names(), vec!["events"]);
}

#[test]
fn test_collection_schema_mismatch() {
    let (_temp, engine) = setup_temp_engine();
    engine
        .collection(Schema::new("events").with_definition(b"v1".to_vec()))
        .unwrap();

    let result = engine.collection(Schema::new("events").with_definition(b"v2".to_vec()));

    assert!(matches!(result, Err(StrataError::CollectionExists(name)) if name == "events"));
}

#[test]
fn test_collections_are_independent() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection(Schema::new("users")).unwrap();
    let orders = engine.collection(Schema::new("orders")).unwrap();

    users.insert("alice").unwrap();
    users.insert("bob").unwrap();
    orders.insert("order").unwrap();

    assert_eq!(users.last_assigned_key(), 2);
    assert_eq!(orders.last_assigned_key(), 1);
    assert_eq!(engine.collection_names(), vec!["orders", "users"]);
}

#[test]
fn test_streams_and_collections_share_store() {
    let (_temp, engine) = setup_temp_engine();
    let docs = engine.collection(Schema::new("docs")).unwrap();

    engine.append_row("s", b"row").unwrap();
    docs.insert("doc").unwrap();

    let stats = engine.stats();
    assert_eq!(stats.end_of_store, 2 * 4096);
    assert!(stats.file_size >= stats.end_of_store);

    engine.sync().unwrap();
}
