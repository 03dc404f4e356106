//! Property tests: for any sequence of distinct inserts and deletes, a
//! forward scan yields exactly the surviving keys in strictly ascending
//! order, and the entry count matches.

use std::collections::BTreeSet;

use arbordb::{BTreeIndex, Key, KeyType, Rid};
use proptest::prelude::*;
use tempfile::tempdir;

fn collect_scan(tree: &BTreeIndex) -> Vec<i32> {
    let mut cursor = tree.scan();
    let mut out = Vec::new();
    while let Some(rid) = cursor.next().unwrap() {
        out.push(rid.page as i32);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn scan_is_sorted_and_complete(
        keys in prop::collection::hash_set(0i32..10_000, 1..150),
        order in 2u32..8,
        delete_mask in prop::collection::vec(any::<bool>(), 150),
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prop.idx");
        BTreeIndex::create(&path, KeyType::Int, order).unwrap();
        let mut tree = BTreeIndex::open(&path).unwrap();

        let keys: Vec<i32> = keys.into_iter().collect();
        let mut alive = BTreeSet::new();

        for &k in &keys {
            tree.insert(Key::Int(k), Rid::new(k as u32, 0)).unwrap();
            alive.insert(k);
        }
        prop_assert_eq!(tree.entry_count() as usize, alive.len());

        for (i, &k) in keys.iter().enumerate() {
            if delete_mask[i % delete_mask.len()] {
                tree.delete(&Key::Int(k)).unwrap();
                alive.remove(&k);
            }
        }

        let scanned = collect_scan(&tree);
        let expected: Vec<i32> = alive.iter().copied().collect();
        prop_assert_eq!(&scanned, &expected);
        prop_assert!(scanned.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(tree.entry_count() as usize, alive.len());

        // Point lookups agree with the scan.
        for &k in &keys {
            let found = tree.find(&Key::Int(k)).is_ok();
            prop_assert_eq!(found, alive.contains(&k));
        }
    }

    #[test]
    fn duplicate_inserts_never_mutate(
        keys in prop::collection::vec(0i32..100, 1..60),
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.idx");
        BTreeIndex::create(&path, KeyType::Int, 4).unwrap();
        let mut tree = BTreeIndex::open(&path).unwrap();

        let mut alive = BTreeSet::new();
        for &k in &keys {
            let result = tree.insert(Key::Int(k), Rid::new(k as u32, 0));
            prop_assert_eq!(result.is_ok(), alive.insert(k));
        }

        let expected: Vec<i32> = alive.iter().copied().collect();
        prop_assert_eq!(collect_scan(&tree), expected);
    }
}
