#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use fcache::{CacheManager, ManagerConfig};
use tempfile::TempDir;

/// Create a temporary root containing the given `(relative path, contents)` files.
pub fn fixture_root(files: &[(&str, &[u8])]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, contents) in files {
        write_file(dir.path(), rel, contents);
    }
    dir
}

pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Start a manager rooted at `root` with the given byte budget.
pub fn manager_at(root: &Path, memory_limit: usize) -> CacheManager {
    CacheManager::new(ManagerConfig {
        memory_limit,
        root: root.to_path_buf(),
        ..ManagerConfig::default()
    })
    .unwrap()
}

pub fn bytes_of(len: usize) -> Bytes {
    Bytes::from(vec![b'x'; len])
}

/// Poll until the loader has taken `count` requests off the queue, or panic after a timeout.
pub fn wait_for_processed(manager: &CacheManager, count: u64) {
    for _ in 0..400 {
        if manager.status().loader.processed >= count {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!(
        "loader did not process {count} requests within 2 seconds: {:?}",
        manager.status()
    );
}
