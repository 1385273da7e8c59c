//! Growing and shrinking a live store.

use crate::common::{TestStore, pattern};

#[test]
fn test_grow_preserves_vectors_and_accepts_new_slots() {
    let fixture = TestStore::new();
    let mut store = fixture.open(4);

    for i in 0..4 {
        store.set_vector(i, &pattern(i, 128)).unwrap();
    }
    let relocation = store.resize(8).unwrap();
    assert_eq!(relocation.new_len, store.mapped_len());
    assert_eq!(relocation.new_base, store.base_addr());
    assert_eq!(store.capacity(), 8);

    store.set_vector(7, &pattern(7, 128)).unwrap();
    assert_eq!(store.count(), 8);
    for i in 0..4 {
        assert_eq!(store.get_vector(i).unwrap(), pattern(i, 128).as_slice());
    }
    for i in 4..7 {
        assert!(store.get_vector(i).unwrap().iter().all(|&x| x == 0.0));
    }
}

#[test]
fn test_grow_survives_reopen() {
    let fixture = TestStore::new();
    {
        let mut store = fixture.open_dim(2, 16);
        store.set_vector(1, &pattern(1, 16)).unwrap();
        store.set_metadata(1, b"kept").unwrap();
        store.resize(64).unwrap();
        store.flush().unwrap();
    }

    let store = fixture.open_dim(2, 16);
    assert_eq!(store.capacity(), 64);
    assert_eq!(store.count(), 2);
    assert_eq!(store.get_vector(1).unwrap(), pattern(1, 16).as_slice());
    assert_eq!(store.metadata(1).unwrap(), b"kept");
    assert_eq!(store.metadata(2).unwrap(), b"");
}

#[test]
fn test_shrink_discards_tail_and_clamps_count() {
    let fixture = TestStore::new();
    {
        let mut store = fixture.open_dim(8, 4);
        for i in 0..8 {
            store.set_vector(i, &pattern(i, 4)).unwrap();
            store.set_metadata(i, format!("m{i}").as_bytes()).unwrap();
        }
        store.resize(3).unwrap();
        assert_eq!(store.capacity(), 3);
        assert_eq!(store.count(), 3);
        assert!(store.get_vector(3).is_none());
        store.close().unwrap();
    }

    let store = fixture.open_dim(3, 4);
    assert_eq!(store.count(), 3);
    assert_eq!(store.get_vector(2).unwrap(), pattern(2, 4).as_slice());
    assert_eq!(store.metadata(2).unwrap(), b"m2");
    assert_eq!(
        std::fs::metadata(&fixture.path).unwrap().len(),
        store.mapped_len() as u64
    );
}

#[test]
fn test_resize_to_same_capacity_is_noop() {
    let fixture = TestStore::new();
    let mut store = fixture.open_dim(4, 4);
    let base = store.base_addr();

    let relocation = store.resize(4).unwrap();
    assert!(!relocation.moved());
    assert_eq!(relocation.new_base, base);
}
