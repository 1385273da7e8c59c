//! Contiguous batch writes and views.

use crate::common::{TestStore, pattern};
use vecstore::StorageError;

#[test]
fn test_batch_matches_sequential_writes() {
    let dim = 8;
    let vectors: Vec<Vec<f32>> = (0..5).map(|i| pattern(i, dim)).collect();
    let flat: Vec<f32> = vectors.concat();

    let batched = TestStore::new();
    let mut a = batched.open_dim(10, dim);
    a.set_batch(2, &flat, dim).unwrap();

    let sequential = TestStore::new();
    let mut b = sequential.open_dim(10, dim);
    for (i, v) in vectors.iter().enumerate() {
        b.set_vector(2 + i, v).unwrap();
    }

    assert_eq!(a.count(), 7);
    assert_eq!(a.count(), b.count());
    assert_eq!(a.get_batch(0, 10).unwrap(), b.get_batch(0, 10).unwrap());
    assert_eq!(a.read_batch(2, 5).unwrap(), flat);
}

#[test]
fn test_batch_overflow_writes_nothing() {
    let fixture = TestStore::new();
    let mut store = fixture.open_dim(4, 2);

    let err = store.set_batch(3, &[1.0; 4], 2).unwrap_err();
    assert!(matches!(
        err,
        StorageError::InvalidRange {
            start: 3,
            count: 2,
            capacity: 4
        }
    ));
    assert_eq!(store.get_vector(3).unwrap(), &[0.0, 0.0]);
    assert_eq!(store.count(), 0);
}

#[test]
fn test_batch_rejects_wrong_dimension_and_ragged_data() {
    let fixture = TestStore::new();
    let mut store = fixture.open_dim(4, 2);

    assert!(matches!(
        store.set_batch(0, &[1.0; 6], 3).unwrap_err(),
        StorageError::DimensionMismatch { .. }
    ));
    assert!(matches!(
        store.set_batch(0, &[1.0; 3], 2).unwrap_err(),
        StorageError::MalformedBatch { len: 3, dimension: 2 }
    ));
}

#[test]
fn test_empty_batch_leaves_count() {
    let fixture = TestStore::new();
    let mut store = fixture.open_dim(4, 2);

    store.set_batch(3, &[], 2).unwrap();
    assert_eq!(store.count(), 0);
}

#[test]
fn test_mutable_view_writes_through() {
    let fixture = TestStore::new();
    {
        let mut store = fixture.open_dim(4, 2);
        store.set_vector(1, &[0.0, 0.0]).unwrap();
        let view = store.get_batch_mut(0, 2).unwrap();
        view[2] = 4.0;
        view[3] = 5.0;
        store.close().unwrap();
    }

    let store = fixture.open_dim(4, 2);
    assert_eq!(store.get_vector(1).unwrap(), &[4.0, 5.0]);
}
