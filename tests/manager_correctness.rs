#![allow(clippy::unwrap_used, missing_docs)]

mod common;

use common::{fixture_root, manager_at, wait_for_processed, write_file};
use fcache::{CacheManager, CacheStatus, ManagerConfig};
use fcache::cache::loader::LoaderStats;

#[test]
fn request_then_lookup_and_read() {
    let root = fixture_root(&[("f.txt", b"abcdefgh")]);
    let manager = manager_at(root.path(), 1024);

    manager.request("f.txt");
    wait_for_processed(&manager, 1);

    assert!(manager.lookup("f.txt"));
    assert_eq!(&manager.read_range("f.txt", 0, 8)[..], b"abcdefgh");
}

#[test]
fn read_range_clamps_to_available_suffix() {
    let root = fixture_root(&[("f.txt", b"abcdefgh")]);
    let manager = manager_at(root.path(), 1024);
    manager.request("f.txt");
    wait_for_processed(&manager, 1);

    assert_eq!(&manager.read_range("f.txt", 5, 100)[..], b"fgh");
    assert_eq!(&manager.read_range("f.txt", 2, 3)[..], b"cde");
    assert_eq!(&manager.read_range("f.txt", 7, usize::MAX)[..], b"h");
}

#[test]
fn read_range_past_the_end_is_empty() {
    let root = fixture_root(&[("f.txt", b"abcdefgh")]);
    let manager = manager_at(root.path(), 1024);
    manager.request("f.txt");
    wait_for_processed(&manager, 1);

    assert!(manager.read_range("f.txt", 8, 4).is_empty());
    assert!(manager.read_range("f.txt", 100, 4).is_empty());
    assert!(manager.read_range("f.txt", 0, 0).is_empty());
}

#[test]
fn read_range_of_absent_file_is_empty() {
    let root = tempfile::tempdir().unwrap();
    let manager = manager_at(root.path(), 1024);
    assert!(manager.read_range("never.txt", 0, 10).is_empty());
}

#[test]
fn separator_styles_are_interchangeable() {
    let root = fixture_root(&[("a/b/c.txt", b"nested")]);
    let manager = manager_at(root.path(), 1024);

    manager.request("/a\\b\\c.txt");
    wait_for_processed(&manager, 1);

    assert!(manager.lookup("a/b/c.txt"));
    assert!(manager.lookup("/a/b/c.txt"));
    assert_eq!(&manager.read_range("a\\b\\c.txt", 0, 100)[..], b"nested");
    assert_eq!(manager.status().cached, vec!["a/b/c.txt"]);
}

#[test]
fn duplicate_requests_read_the_file_once() {
    let root = fixture_root(&[("f.txt", b"data")]);
    let manager = manager_at(root.path(), 1024);

    manager.request("f.txt");
    manager.request("/f.txt");
    wait_for_processed(&manager, 2);

    let status = manager.status();
    assert_eq!(status.cached, vec!["f.txt"]);
    assert_eq!(status.total_size, 4);
    assert_eq!(status.loader.loaded, 1);
    assert_eq!(status.loader.skipped, 1, "second request must hit the skip path");
}

#[test]
fn missing_file_leaves_no_entry() {
    let root = tempfile::tempdir().unwrap();
    let manager = manager_at(root.path(), 1024);

    manager.request("ghost.txt");
    wait_for_processed(&manager, 1);

    assert!(!manager.lookup("ghost.txt"));
    let status = manager.status();
    assert!(status.cached.is_empty());
    assert_eq!(status.total_size, 0);
    assert_eq!(status.loader.failed, 1);
}

#[test]
fn lookup_does_not_enqueue() {
    let root = fixture_root(&[("f.txt", b"data")]);
    let manager = manager_at(root.path(), 1024);

    assert!(!manager.lookup("f.txt"));
    std::thread::sleep(std::time::Duration::from_millis(50));

    let status = manager.status();
    assert!(status.pending.is_empty());
    assert_eq!(status.loader, LoaderStats::default());
    assert!(!manager.lookup("f.txt"));
}

#[test]
fn eviction_follows_recency_through_the_facade() {
    let root = fixture_root(&[
        ("A", &[b'a'; 10]),
        ("B", &[b'b'; 10]),
        ("C", &[b'c'; 10]),
        ("D", &[b'd'; 10]),
    ]);
    let manager = manager_at(root.path(), 30);

    for name in ["A", "B", "C"] {
        manager.request(name);
    }
    wait_for_processed(&manager, 3);

    // Touch A so B becomes the eviction victim.
    assert_eq!(manager.read_range("A", 0, 1).len(), 1);
    manager.request("D");
    wait_for_processed(&manager, 4);

    let status = manager.status();
    assert_eq!(status.cached, vec!["D", "A", "C"]);
    assert_eq!(status.total_size, 30);
    assert!(!manager.lookup("B"));
}

#[test]
fn set_root_redirects_later_requests() {
    let first = fixture_root(&[("f.txt", b"first")]);
    let second = fixture_root(&[("g.txt", b"second")]);
    let manager = manager_at(first.path(), 1024);

    manager.set_root(second.path());
    assert_eq!(manager.root(), second.path());

    manager.request("g.txt");
    manager.request("f.txt");
    wait_for_processed(&manager, 2);

    assert!(manager.lookup("g.txt"));
    assert!(!manager.lookup("f.txt"), "f.txt only exists under the old root");
}

#[test]
fn files_written_after_a_failed_request_load_on_retry() {
    let root = tempfile::tempdir().unwrap();
    let manager = manager_at(root.path(), 1024);

    manager.request("late.txt");
    wait_for_processed(&manager, 1);
    assert!(!manager.lookup("late.txt"));

    write_file(root.path(), "late.txt", b"now here");
    manager.request("late.txt");
    wait_for_processed(&manager, 2);
    assert_eq!(&manager.read_range("late.txt", 4, 4)[..], b"here");
}

#[test]
fn status_renders_cache_and_queue_lines() {
    let status = CacheStatus {
        cached: vec!["b.txt".into(), "a.txt".into()],
        pending: vec!["c.txt".into(), "c.txt".into()],
        total_size: 3 * 1024 * 1024 / 2,
        loader: LoaderStats::default(),
    };

    assert_eq!(
        status.to_string(),
        "Cache: 1.50 MB | Files: b.txt, a.txt\nQueue: c.txt, c.txt"
    );
}

#[test]
fn defaults_match_documented_configuration() {
    let config = ManagerConfig::default();
    assert_eq!(config.chunk_size, 1024 * 1024);
    assert_eq!(config.root, std::path::PathBuf::from("."));

    let manager = CacheManager::new(ManagerConfig {
        memory_limit: 123,
        chunk_size: 7,
        ..ManagerConfig::default()
    })
    .unwrap();
    assert_eq!(manager.memory_limit(), 123);
    assert_eq!(manager.chunk_size(), 7);
    manager.shutdown();
}
