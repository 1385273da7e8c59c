//! Single-vector writes, reads and the logical count.

use crate::common::{TestStore, pattern};
use vecstore::{ErrorKind, StorageError};

#[test]
fn test_written_vector_reads_back() {
    let fixture = TestStore::new();
    let mut store = fixture.open(16);

    let v = pattern(3, 128);
    store.set_vector(3, &v).unwrap();
    assert_eq!(store.get_vector(3).unwrap(), v.as_slice());
    assert_eq!(store.read_vector(3).unwrap(), v);
}

#[test]
fn test_sparse_writes_set_high_water_mark() {
    let fixture = TestStore::new();
    let mut store = fixture.open(10);

    let v = vec![1.0_f32; 128];
    store.set_vector(0, &[0.0; 128]).unwrap();
    store.set_vector(9, &v).unwrap();

    assert_eq!(store.count(), 10);
    assert!(store.get_vector(5).unwrap().iter().all(|&x| x == 0.0));

    // Rewriting a lower slot never lowers the count.
    store.set_vector(2, &v).unwrap();
    assert_eq!(store.count(), 10);
}

#[test]
fn test_out_of_bounds_is_rejected() {
    let fixture = TestStore::new();
    let mut store = fixture.open(4);

    assert!(store.get_vector(4).is_none());
    assert!(store.get_batch(3, 2).is_none());
    let err = store.set_vector(4, &vec![0.0; 128]).unwrap_err();
    assert!(matches!(
        err,
        StorageError::IndexOutOfBounds {
            index: 4,
            capacity: 4
        }
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(store.count(), 0);
}

#[test]
fn test_dimension_mismatch_leaves_slot_untouched() {
    let fixture = TestStore::new();
    let mut store = fixture.open(4);

    let err = store.set_vector(1, &vec![7.0; 64]).unwrap_err();
    assert!(matches!(
        err,
        StorageError::DimensionMismatch {
            expected: 128,
            actual: 64
        }
    ));
    assert!(store.get_vector(1).unwrap().iter().all(|&x| x == 0.0));
    assert_eq!(store.count(), 0);
}

#[test]
fn test_metadata_roundtrip_and_limit() {
    let fixture = TestStore::new();
    {
        let mut store = fixture.open_dim(4, 8);
        store.set_metadata(2, b"doc-42").unwrap();
        assert!(store.set_metadata(0, &[1u8; 253]).is_err());
        store.close().unwrap();
    }

    let store = fixture.open_dim(4, 8);
    assert_eq!(store.metadata(2).unwrap(), b"doc-42");
    assert_eq!(store.metadata(0).unwrap(), b"");
    assert!(store.metadata(4).is_none());
    // Metadata does not count as a written vector.
    assert_eq!(store.count(), 0);
}

#[test]
fn test_side_allocator_stats() {
    let fixture = TestStore::new();
    let store = fixture.open_dim(2, 4);
    assert!(store.is_thread_safe());

    let block = store.alloc(4096, 64).unwrap();
    assert_eq!(block.as_ptr() as usize % 64, 0);
    assert_eq!(store.stats().pool_allocated, 4096);
    drop(block);

    let stats = store.stats();
    assert_eq!(stats.pool_freed, 4096);
    assert!(store.alloc(0, 8).is_err());
}
