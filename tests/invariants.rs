//! Property tests: random insert/remove sequences checked against
//! `std::collections::BTreeSet`, with every invariant verified after each step.

use btree_index::{BTree, Result};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Operation {
    Insert(u16),
    Remove(u16),
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    // A narrow key space keeps duplicates and absent removals frequent
    prop_oneof![
        3 => (0u16..256).prop_map(Operation::Insert),
        2 => (0u16..256).prop_map(Operation::Remove),
    ]
}

fn assert_matches_reference(tree: &BTree<u16>, reference: &BTreeSet<u16>) -> Result<()> {
    tree.validate()?;
    assert_eq!(tree.len(), reference.len());
    assert!(tree.iter().eq(reference.iter()));
    Ok(())
}

proptest! {
    #[test]
    fn prop_tree_tracks_reference_set(
        min_degree in 2usize..=5,
        ops in prop::collection::vec(arb_operation(), 1..400),
    ) {
        let mut tree = BTree::new(min_degree).unwrap();
        let mut reference = BTreeSet::new();

        for op in ops {
            match op {
                Operation::Insert(key) => {
                    prop_assert_eq!(tree.insert(key), reference.insert(key));
                }
                Operation::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), reference.remove(&key));
                }
            }
            if let Err(e) = tree.validate() {
                return Err(TestCaseError::fail(e.to_string()));
            }
        }

        prop_assert_eq!(tree.len(), reference.len());
        prop_assert!(tree.iter().eq(reference.iter()));
        for key in 0u16..256 {
            prop_assert_eq!(tree.contains(&key), reference.contains(&key));
        }
    }

    #[test]
    fn prop_insert_then_remove_all_empties_tree(
        min_degree in 2usize..=4,
        keys in prop::collection::btree_set(any::<u16>(), 0..300),
        seed in any::<u64>(),
    ) {
        let mut tree = BTree::new(min_degree).unwrap();
        for &key in &keys {
            prop_assert!(tree.insert(key));
        }

        let mut order: Vec<u16> = keys.iter().copied().collect();
        let mut rng = StdRng::seed_from_u64(seed);
        for i in (1..order.len()).rev() {
            let j = rng.gen_range(0..=i);
            order.swap(i, j);
        }

        for key in order {
            prop_assert!(tree.remove(&key));
        }
        prop_assert!(tree.is_empty());
        prop_assert!(tree.traverse().is_empty());
        prop_assert!(tree.validate().is_ok());
    }

    #[test]
    fn prop_removing_absent_key_keeps_contents(
        keys in prop::collection::btree_set(0u32..1000, 1..200),
        absent in 1000u32..2000,
    ) {
        let mut tree: BTree<u32> = keys.iter().copied().collect();
        let before: Vec<u32> = tree.iter().copied().collect();

        prop_assert!(!tree.remove(&absent));
        let after: Vec<u32> = tree.iter().copied().collect();
        prop_assert_eq!(before, after);
        prop_assert!(tree.validate().is_ok());
    }
}

#[test]
fn stress_random_operations() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for min_degree in 2..=6 {
        let mut tree = BTree::new(min_degree)?;
        let mut reference = BTreeSet::new();

        for step in 0..5_000 {
            let key: u16 = rng.gen_range(0..2_000);
            if rng.gen_bool(0.6) {
                assert_eq!(tree.insert(key), reference.insert(key));
            } else {
                assert_eq!(tree.remove(&key), reference.remove(&key));
            }
            if step % 250 == 0 {
                assert_matches_reference(&tree, &reference)?;
            }
        }
        assert_matches_reference(&tree, &reference)?;

        // Height stays logarithmic: a tree of n keys has at most
        // 1 + log_t((n + 1) / 2) levels.
        let n = tree.len() as f64;
        let bound = 1.0 + ((n + 1.0) / 2.0).ln() / (min_degree as f64).ln();
        assert!(tree.height() as f64 <= bound + 1e-9);
    }
    Ok(())
}

#[test]
fn stress_drain_with_pops() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut tree = BTree::new(3)?;
    let mut reference = BTreeSet::new();
    for _ in 0..1_000 {
        let key: u16 = rng.gen();
        tree.insert(key);
        reference.insert(key);
    }

    while !reference.is_empty() {
        if rng.gen_bool(0.5) {
            assert_eq!(tree.pop_first(), reference.pop_first());
        } else {
            assert_eq!(tree.pop_last(), reference.pop_last());
        }
    }
    assert!(tree.is_empty());
    tree.validate()
}
