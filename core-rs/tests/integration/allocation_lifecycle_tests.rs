//! Integration tests for the complete assignment lifecycle
//!
//! Tests the full lifecycle of port assignments including:
//! - Get-or-create resolution
//! - Stability across repeated calls
//! - Range conformance and catch-all overflow
//! - Removal and lowest-free-slot reuse

use portkeep_core::{range_for, resolve_port, PortStore, CATCH_ALL_RANGE};
use tempfile::TempDir;

#[test]
fn test_complete_assignment_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let store = PortStore::open(&temp_dir.path().join("ports.db")).unwrap();

    // 1. First project gets the start of the dev range
    let port_a = resolve_port(&store, "/proj/a", "dev", None).unwrap();
    assert_eq!(port_a, 3100);

    // 2. Second project gets the next free slot
    let port_b = resolve_port(&store, "/proj/b", "dev", None).unwrap();
    assert_eq!(port_b, 3101);

    // 3. Resolving again returns the recorded port unchanged
    assert_eq!(resolve_port(&store, "/proj/a", "dev", None).unwrap(), port_a);

    // 4. A second service type in the same project is independent
    let redis_a = resolve_port(&store, "/proj/a", "redis", Some("cache")).unwrap();
    assert!(range_for("redis").contains(redis_a));

    // 5. Project queries see both assignments, port ascending
    let records = store.find_all_for_directory("/proj/a").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].port, port_a);
    assert_eq!(records[1].port, redis_a);
    assert_eq!(records[1].description.as_deref(), Some("cache"));

    // 6. Removal frees the port and returns the record
    let removed = store.remove("/proj/a", "dev").unwrap().unwrap();
    assert_eq!(removed.port, port_a);

    // 7. Once deleted there is no memory of the old assignment: the next
    //    resolution takes the lowest currently-free slot, which is 3100 again
    assert_eq!(resolve_port(&store, "/proj/a", "dev", None).unwrap(), 3100);
}

#[test]
fn test_every_port_globally_unique() {
    let store = PortStore::open_in_memory().unwrap();

    let mut ports = Vec::new();
    for i in 0..8 {
        let directory = format!("/proj/{i}");
        ports.push(resolve_port(&store, &directory, "dev", None).unwrap());
        ports.push(resolve_port(&store, &directory, "pg", None).unwrap());
        ports.push(resolve_port(&store, &directory, "custom", None).unwrap());
    }

    let total = ports.len();
    ports.sort_unstable();
    ports.dedup();
    assert_eq!(ports.len(), total, "no two records may share a port");
}

#[test]
fn test_aliased_range_distinct_keys() {
    let store = PortStore::open_in_memory().unwrap();

    let pg = resolve_port(&store, "/proj/a", "pg", None).unwrap();
    let postgres = resolve_port(&store, "/proj/a", "postgres", None).unwrap();

    assert_ne!(pg, postgres);
    assert!(range_for("pg").contains(pg));
    assert!(range_for("pg").contains(postgres));
}

#[test]
fn test_unknown_type_lands_in_catch_all() {
    let store = PortStore::open_in_memory().unwrap();

    let port = resolve_port(&store, "/proj/a", "jupyter", None).unwrap();
    assert!(CATCH_ALL_RANGE.contains(port));
}

#[test]
fn test_dedicated_range_overflows_into_catch_all() {
    let store = PortStore::open_in_memory().unwrap();

    // Occupy the whole redis range
    for (i, port) in (6400..=6499).enumerate() {
        store
            .insert(&format!("/redis/{i}"), "redis", port, None)
            .unwrap();
    }

    let overflow = resolve_port(&store, "/proj/late", "redis", None).unwrap();
    assert!(CATCH_ALL_RANGE.contains(overflow));
    assert_eq!(overflow, CATCH_ALL_RANGE.start);

    // The assignment is as stable as any other
    assert_eq!(
        resolve_port(&store, "/proj/late", "redis", None).unwrap(),
        overflow
    );
}

#[test]
fn test_cleanup_removes_exactly_stale_directories() {
    let temp_dir = TempDir::new().unwrap();
    let store = PortStore::open(&temp_dir.path().join("ports.db")).unwrap();

    // 1. One project that exists on disk, one that never did
    let live_dir = temp_dir.path().join("live-project");
    std::fs::create_dir_all(&live_dir).unwrap();
    let live_key = live_dir.to_string_lossy().into_owned();
    let gone_key = temp_dir
        .path()
        .join("gone-project")
        .to_string_lossy()
        .into_owned();

    resolve_port(&store, &live_key, "dev", None).unwrap();
    resolve_port(&store, &gone_key, "dev", None).unwrap();
    resolve_port(&store, &gone_key, "redis", None).unwrap();

    // 2. Split records by directory existence, as the cleanup command does
    let stale: Vec<_> = store
        .find_all()
        .unwrap()
        .into_iter()
        .filter(|record| !std::path::Path::new(&record.directory).is_dir())
        .collect();
    assert_eq!(stale.len(), 2);
    assert!(stale.iter().all(|record| record.directory == gone_key));

    // 3. Bulk-remove the vanished directory's records
    let removed = store.remove_all_for_directory(&gone_key).unwrap();
    assert_eq!(removed.len(), 2);

    // 4. The live project is untouched
    let remaining = store.find_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].directory, live_key);
}
