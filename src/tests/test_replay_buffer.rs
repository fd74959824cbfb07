use std::collections::HashSet;

use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::DdqnError;
use crate::replay_buffer::{Transition, TransitionStore};
use crate::tests::fixtures::filled_store;

fn numbered(i: usize) -> Transition {
    Transition {
        state: array![i as f32, -(i as f32)],
        action: i % 3,
        reward: i as f32,
        next_state: array![i as f32 + 0.5, 0.0],
        done: i % 4 == 3,
    }
}

#[test]
fn test_store_counts_until_full() {
    let mut store = TransitionStore::new(3, 2).unwrap();
    assert!(store.is_empty());
    store.push(&numbered(0)).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.next_index(), 1);
    store.push(&numbered(1)).unwrap();
    store.push(&numbered(2)).unwrap();
    assert!(store.is_full());
    assert_eq!(store.next_index(), 0);
}

#[test]
fn test_wraparound_overwrites_oldest() {
    let mut store = TransitionStore::new(3, 2).unwrap();
    for i in 0..5 {
        store.push(&numbered(i)).unwrap();
    }

    assert_eq!(store.len(), 3);
    assert_eq!(store.total_writes(), 5);
    assert_eq!(store.next_index(), 2);
    assert_eq!(store.get(0).unwrap(), numbered(3));
    assert_eq!(store.get(1).unwrap(), numbered(4));
    assert_eq!(store.get(2).unwrap(), numbered(2));
}

#[test]
fn test_get_beyond_valid_slots() {
    let mut store = TransitionStore::new(5, 2).unwrap();
    store.push(&numbered(0)).unwrap();
    assert!(store.get(0).is_some());
    assert!(store.get(1).is_none());
    assert!(store.get(5).is_none());
}

#[test]
fn test_store_rejects_wrong_width() {
    let mut store = TransitionStore::new(3, 2).unwrap();
    let ok = array![0.0, 0.0];
    let bad = array![0.0, 0.0, 0.0];

    let err = store.store(bad.view(), 0, 1.0, ok.view(), false).unwrap_err();
    assert!(matches!(err, DdqnError::DimensionMismatch { .. }));
    let err = store.store(ok.view(), 0, 1.0, bad.view(), false).unwrap_err();
    assert!(matches!(err, DdqnError::DimensionMismatch { .. }));

    // Nothing was written
    assert_eq!(store.len(), 0);
    assert_eq!(store.next_index(), 0);
}

#[test]
fn test_zero_capacity_or_width_rejected() {
    assert!(TransitionStore::new(0, 4).is_err());
    assert!(TransitionStore::new(4, 0).is_err());
}

#[test]
fn test_sample_underflow_includes_equality() {
    let mut rng = StdRng::seed_from_u64(0);
    let empty = TransitionStore::new(4, 2).unwrap();
    assert!(empty.sample(0, &mut rng).unwrap_err().is_underflow());

    let store = filled_store(4, &[1.0, 2.0, 3.0, 4.0], &[false; 4]);
    for n in [4, 5, 100] {
        match store.sample(n, &mut rng) {
            Err(DdqnError::Underflow { requested, available }) => {
                assert_eq!(requested, n);
                assert_eq!(available, 4);
            }
            other => panic!("expected underflow, got {:?}", other),
        }
    }
}

#[test]
fn test_sample_returns_distinct_valid_indices() {
    let mut rng = StdRng::seed_from_u64(11);
    let store = filled_store(10, &[0.0; 6], &[false; 6]);

    for n in 0..6 {
        for _ in 0..20 {
            let indices = store.sample(n, &mut rng).unwrap();
            assert_eq!(indices.len(), n);
            let unique: HashSet<_> = indices.iter().collect();
            assert_eq!(unique.len(), n);
            assert!(indices.iter().all(|&i| i < 6));
        }
    }
}

#[test]
fn test_sample_both_regimes_on_large_store() {
    let mut rng = StdRng::seed_from_u64(5);
    let rewards = vec![0.0; 200];
    let store = filled_store(200, &rewards, &vec![false; 200]);

    // Sparse request goes through rejection, dense one through the shuffle
    for n in [10, 50, 150, 199] {
        let indices = store.sample(n, &mut rng).unwrap();
        let unique: HashSet<_> = indices.iter().collect();
        assert_eq!(unique.len(), n);
    }
}

#[test]
fn test_sample_is_roughly_uniform() {
    let mut rng = StdRng::seed_from_u64(42);
    let store = filled_store(8, &[0.0; 4], &[false; 4]);
    let mut counts = [0usize; 4];
    for _ in 0..4000 {
        for idx in store.sample(2, &mut rng).unwrap() {
            counts[idx] += 1;
        }
    }
    // Each index expected 2000 times
    for &count in &counts {
        assert!((1800..2200).contains(&count), "counts: {:?}", counts);
    }
}

#[test]
fn test_gather_aligns_rows() {
    let store = filled_store(5, &[10.0, 20.0, 30.0], &[false, true, false]);
    let batch = store.gather(&[2, 0]).unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.indices, vec![2, 0]);
    assert_eq!(batch.states, array![[2.0, 0.0], [0.0, 0.0]]);
    assert_eq!(batch.next_states, array![[3.0, 0.0], [1.0, 0.0]]);
    assert_eq!(batch.actions, vec![0, 0]);
    assert_eq!(batch.rewards, array![30.0, 10.0]);
    assert_eq!(batch.dones, vec![false, false]);

    let batch = store.gather(&[1]).unwrap();
    assert_eq!(batch.actions, vec![1]);
    assert_eq!(batch.dones, vec![true]);
}

#[test]
fn test_gather_rejects_unpopulated_slot() {
    let store = filled_store(5, &[1.0, 2.0], &[false, false]);
    assert!(store.gather(&[0, 2]).is_err());
}

#[test]
fn test_end_to_end_small_store() {
    let mut rng = StdRng::seed_from_u64(9);
    let store = filled_store(4, &[1.0, 2.0, 3.0, 4.0], &[false, false, false, true]);

    let indices = store.sample(3, &mut rng).unwrap();
    let unique: HashSet<_> = indices.iter().collect();
    assert_eq!(unique.len(), 3);
    assert!(indices.iter().all(|&i| i < 4));

    assert!(store.sample(4, &mut rng).unwrap_err().is_underflow());
}
