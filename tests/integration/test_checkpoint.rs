//! Checkpoint copies and the thread-safe wrapper.

use std::thread;

use crate::common::{TestStore, pattern};
use vecstore::{ConcurrentVectorStore, VectorStore};

#[test]
fn test_checkpoint_is_openable_copy() {
    let fixture = TestStore::new();
    let mut store = fixture.open_dim(6, 4);
    store.set_vector(4, &pattern(4, 4)).unwrap();
    store.set_metadata(4, b"snap").unwrap();

    let dest = fixture.dir.path().join("snapshot.omen");
    let written = store.checkpoint_to(&dest).unwrap();
    assert_eq!(written, store.mapped_len() as u64);

    // Later writes do not leak into the checkpoint.
    store.set_vector(5, &pattern(5, 4)).unwrap();

    let copy = VectorStore::open_readonly(&dest).unwrap();
    assert_eq!(copy.count(), 5);
    assert_eq!(copy.get_vector(4).unwrap(), pattern(4, 4).as_slice());
    assert_eq!(copy.metadata(4).unwrap(), b"snap");
}

#[test]
fn test_checkpoint_refuses_live_path() {
    let fixture = TestStore::new();
    let store = fixture.open_dim(2, 2);
    assert!(store.checkpoint_to(&fixture.path).is_err());
}

#[cfg(unix)]
#[test]
fn test_checkpoint_refuses_live_file_through_symlinked_dir() {
    let fixture = TestStore::new();
    let mut store = fixture.open_dim(4, 2);
    store.set_vector(0, &[1.0, 1.0]).unwrap();

    let alias_dir = fixture.dir.path().join("alias");
    std::os::unix::fs::symlink(fixture.dir.path(), &alias_dir).unwrap();
    let alias = alias_dir.join(fixture.path.file_name().unwrap());
    assert!(store.checkpoint_to(&alias).is_err());

    // The live file is still the one being written.
    store.set_vector(3, &[3.0, 3.0]).unwrap();
    store.close().unwrap();

    let store = fixture.open_dim(4, 2);
    assert_eq!(store.count(), 4);
    assert_eq!(store.get_vector(3).unwrap(), &[3.0, 3.0]);
}

#[cfg(unix)]
#[test]
fn test_checkpoint_refuses_hard_link_to_live_file() {
    let fixture = TestStore::new();
    let store = fixture.open_dim(2, 2);

    let link = fixture.dir.path().join("linked.omen");
    std::fs::hard_link(&fixture.path, &link).unwrap();
    assert!(store.checkpoint_to(&link).is_err());
}

#[test]
fn test_checkpoint_requires_existing_parent() {
    let fixture = TestStore::new();
    let store = fixture.open_dim(2, 2);

    let dest = fixture.dir.path().join("missing").join("snap.omen");
    assert!(store.checkpoint_to(&dest).is_err());
}

#[test]
fn test_checkpoint_overwrites_previous_snapshot() {
    let fixture = TestStore::new();
    let mut store = fixture.open_dim(2, 2);
    let dest = fixture.dir.path().join("snapshot.omen");

    store.set_vector(0, &[1.0, 2.0]).unwrap();
    store.checkpoint_to(&dest).unwrap();
    store.set_vector(1, &[3.0, 4.0]).unwrap();
    store.checkpoint_to(&dest).unwrap();

    let copy = VectorStore::open_readonly(&dest).unwrap();
    assert_eq!(copy.count(), 2);
    assert_eq!(copy.get_vector(1).unwrap(), &[3.0, 4.0]);
}

#[test]
fn test_concurrent_store_stats_after_parallel_batches() {
    let fixture = TestStore::new();
    let shared = ConcurrentVectorStore::new(fixture.open_dim(40, 4));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                let flat: Vec<f32> = (0..10).flat_map(|i| pattern(worker * 10 + i, 4)).collect();
                shared.set_batch(worker * 10, &flat, 4).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = shared.stats();
    assert_eq!(stats.total_vectors, 40);
    assert_eq!(stats.memory_used, 40 * 4 * 4);
    assert!((stats.utilization() - 1.0).abs() < f64::EPSILON);
    assert_eq!(shared.read_vector(27).unwrap(), pattern(27, 4));

    let json = stats.to_json().unwrap();
    assert!(json.contains("\"total_vectors\": 40"));
}
