//! Shared model checks: every engine must behave like `BTreeMap` under the
//! same operations.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::ops::Bound;

use gtree::engine::Engine;
use gtree::{Entry, Tree};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

/// The number of operations to perform in each proptest case.
pub const TEST_SIZE: usize = 2_000;

/// Keys drawn from a range smaller than `TEST_SIZE` so that operations collide.
pub fn key_strategy() -> impl Strategy<Value = i64> {
    -1_000i64..1_000i64
}

pub fn value_strategy() -> impl Strategy<Value = i64> {
    any::<i64>()
}

#[derive(Debug, Clone)]
pub enum MapOp {
    Set(i64, i64),
    SetIfNotExist(i64, i64),
    GetOrSet(i64, i64),
    Remove(i64),
    Get(i64),
    Search(i64),
    Floor(i64),
    Ceiling(i64),
    Left,
    Right,
}

pub fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        5 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Set(k, v)),
        1 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::SetIfNotExist(k, v)),
        1 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::GetOrSet(k, v)),
        3 => key_strategy().prop_map(MapOp::Remove),
        2 => key_strategy().prop_map(MapOp::Get),
        1 => key_strategy().prop_map(MapOp::Search),
        1 => key_strategy().prop_map(MapOp::Floor),
        1 => key_strategy().prop_map(MapOp::Ceiling),
        1 => Just(MapOp::Left),
        1 => Just(MapOp::Right),
    ]
}

fn entry((key, value): (&i64, &i64)) -> Entry<i64, i64> {
    Entry::new(*key, *value)
}

/// Replays `ops` on `tree` and on a `BTreeMap`, comparing every result.
pub fn replay<E: Engine<i64, i64>>(tree: &Tree<i64, i64, E>, ops: &[MapOp]) -> Result<(), TestCaseError> {
    let mut model: BTreeMap<i64, i64> = BTreeMap::new();

    for op in ops {
        match *op {
            MapOp::Set(k, v) => {
                tree.set(k, v);
                model.insert(k, v);
            }
            MapOp::SetIfNotExist(k, v) => {
                let stored = tree.set_if_not_exist(k, v);
                prop_assert_eq!(stored, !model.contains_key(&k), "set_if_not_exist({}, {})", k, v);
                model.entry(k).or_insert(v);
            }
            MapOp::GetOrSet(k, v) => {
                let found = tree.get_or_set(k, v);
                prop_assert_eq!(found, Some(*model.entry(k).or_insert(v)), "get_or_set({}, {})", k, v);
            }
            MapOp::Remove(k) => {
                prop_assert_eq!(tree.remove(&k), model.remove(&k), "remove({})", k);
            }
            MapOp::Get(k) => {
                prop_assert_eq!(tree.get(&k), model.get(&k).copied(), "get({})", k);
            }
            MapOp::Search(k) => {
                prop_assert_eq!(tree.search(&k), model.get_key_value(&k).map(entry), "search({})", k);
            }
            MapOp::Floor(k) => {
                let expected = model.range(..=k).next_back().map(entry);
                prop_assert_eq!(tree.floor(&k), expected, "floor({})", k);
            }
            MapOp::Ceiling(k) => {
                let expected = model.range((Bound::Included(k), Bound::Unbounded)).next().map(entry);
                prop_assert_eq!(tree.ceiling(&k), expected, "ceiling({})", k);
            }
            MapOp::Left => {
                prop_assert_eq!(tree.left(), model.first_key_value().map(entry), "left");
            }
            MapOp::Right => {
                prop_assert_eq!(tree.right(), model.last_key_value().map(entry), "right");
            }
        }
        prop_assert_eq!(tree.size(), model.len(), "size mismatch after {:?}", op);
        prop_assert_eq!(tree.is_empty(), model.is_empty(), "is_empty mismatch after {:?}", op);
    }

    let pairs: Vec<(i64, i64)> = model.into_iter().collect();
    prop_assert_eq!(tree.map(), pairs);
    Ok(())
}

/// Checks both walk directions and the walks starting at `from`.
pub fn check_walks<E: Engine<i64, i64>>(tree: &Tree<i64, i64, E>, from: i64) -> Result<(), TestCaseError> {
    let keys = tree.keys();

    let mut asc = Vec::new();
    tree.iterator_asc(|key, _| {
        asc.push(*key);
        true
    });
    prop_assert_eq!(&asc, &keys, "iterator_asc");

    let mut desc = Vec::new();
    tree.iterator_desc(|key, _| {
        desc.push(*key);
        true
    });
    let reversed: Vec<i64> = keys.iter().rev().copied().collect();
    prop_assert_eq!(&desc, &reversed, "iterator_desc");

    let mut asc_from = Vec::new();
    tree.iterator_asc_from_key(&from, |key, _| {
        asc_from.push(*key);
        true
    });
    let mut desc_from = Vec::new();
    tree.iterator_desc_from_key(&from, |key, _| {
        desc_from.push(*key);
        true
    });
    if tree.contains(&from) {
        let expected: Vec<i64> = keys.iter().copied().filter(|key| *key >= from).collect();
        prop_assert_eq!(&asc_from, &expected, "iterator_asc_from_key({})", from);
        let expected: Vec<i64> = reversed.iter().copied().filter(|key| *key <= from).collect();
        prop_assert_eq!(&desc_from, &expected, "iterator_desc_from_key({})", from);
    } else {
        prop_assert!(asc_from.is_empty() && desc_from.is_empty(), "walk from missing key {}", from);
    }

    let mut taken = 0;
    tree.iterator(|_, _| {
        taken += 1;
        taken < 3
    });
    prop_assert_eq!(taken, keys.len().min(3), "early stop");
    Ok(())
}
