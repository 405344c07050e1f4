use core::fmt;
use core::marker::PhantomData;
use std::collections::HashMap;

use log::debug;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::engine::{Engine, Order};
use crate::{Comparator, Entry, RwMutex, Slot};

mod iteration;
mod json;

pub use iteration::KeyIndex;
pub(crate) use json::decode_members;

/// An ordered map over a balanced search tree engine.
///
/// Keys are ordered, found and deduplicated by the tree's [`Comparator`] alone.
/// The engine `E` decides the node layout: [`AvlTree`](crate::AvlTree),
/// [`BTree`](crate::BTree) and [`RedBlackTree`](crate::RedBlackTree) all share
/// this API.
///
/// Every operation takes `&self`. A tree built with `safe` set can be shared
/// between threads and serializes writers behind a reader-writer lock. Without
/// it, the lock never waits and overlapping access panics instead.
///
/// Lookups hand out clones ([`get`](Tree::get), [`search`](Tree::search),
/// [`keys`](Tree::keys), ...) because no reference may outlive the lock. The
/// iteration callbacks borrow entries in place; calling back into the same tree
/// to modify it from inside a callback deadlocks a safe tree and panics an
/// unsafe one.
///
/// # Examples
///
/// ```
/// use gtree::{AvlTree, Comparator};
///
/// let tree: AvlTree<&str, i32> = AvlTree::new(Comparator::natural());
/// tree.set("banana", 3);
/// tree.set("apple", 5);
/// tree.set("cherry", 7);
///
/// assert_eq!(tree.get(&"apple"), Some(5));
/// assert_eq!(tree.keys(), vec!["apple", "banana", "cherry"]);
///
/// tree.remove(&"banana");
/// assert!(!tree.contains(&"banana"));
/// assert_eq!(tree.size(), 2);
/// ```
pub struct Tree<K, V, E> {
    engine: RwMutex<E>,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, E: Engine<K, V>> Tree<K, V, E> {
    /// Wraps an engine, with internal locking when `safe` is set.
    pub fn from_engine(engine: E, safe: bool) -> Self {
        Self {
            engine: RwMutex::new(engine, safe),
            marker: PhantomData,
        }
    }

    /// Returns `true` if the tree was built for concurrent use.
    pub const fn is_safe(&self) -> bool {
        self.engine.is_safe()
    }

    /// Returns a clone of the comparator ordering this tree.
    pub fn comparator(&self) -> Comparator<K> {
        self.read().comparator()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, E> {
        self.engine.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, E> {
        self.engine.write()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// A [`Slot::Deferred`] value is produced while the write lock is held. An
    /// absent value (including a deferred closure returning `None`) leaves the
    /// tree unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{BTree, Comparator, Slot};
    ///
    /// let tree: BTree<i32, &str> = BTree::new(3, Comparator::natural());
    /// tree.set(1, "a");
    /// tree.set(1, "b");
    /// tree.set(2, Slot::Absent);
    ///
    /// assert_eq!(tree.get(&1), Some("b"));
    /// assert!(!tree.contains(&2));
    /// ```
    pub fn set<'s>(&self, key: K, value: impl Into<Slot<'s, V>>) {
        let slot = value.into();
        let mut engine = self.write();
        if let Some(value) = slot.resolve() {
            engine.insert(key, value);
        }
    }

    /// Stores every pair under a single write lock.
    pub fn sets(&self, pairs: impl IntoIterator<Item = (K, V)>) {
        let mut engine = self.write();
        for (key, value) in pairs {
            engine.insert(key, value);
        }
    }

    /// Stores `value` only if `key` is absent. Returns `true` if an entry was
    /// created.
    pub fn set_if_not_exist<'s>(&self, key: K, value: impl Into<Slot<'s, V>>) -> bool {
        if self.contains(&key) {
            return false;
        }
        let slot = value.into();
        self.store_absent(key, move || slot)
    }

    /// Like [`set_if_not_exist`](Tree::set_if_not_exist), with the value
    /// produced by `f`.
    ///
    /// `f` runs outside any lock, so racing callers may each run their
    /// callback; only the first to commit stores its value and the others are
    /// discarded.
    pub fn set_if_not_exist_func<'s, S>(&self, key: K, f: impl FnOnce() -> S) -> bool
    where
        S: Into<Slot<'s, V>>,
    {
        if self.contains(&key) {
            return false;
        }
        let slot = f().into();
        self.store_absent(key, move || slot)
    }

    /// Like [`set_if_not_exist_func`](Tree::set_if_not_exist_func), but `f`
    /// runs while the write lock is held, so at most one racing caller runs it.
    pub fn set_if_not_exist_func_lock<'s, S>(&self, key: K, f: impl FnOnce() -> S) -> bool
    where
        S: Into<Slot<'s, V>>,
    {
        if self.contains(&key) {
            return false;
        }
        self.store_absent(key, move || f().into())
    }

    /// Rechecks `key` under the write lock and stores the produced value if
    /// it is still absent.
    fn store_absent<'s>(&self, key: K, produce: impl FnOnce() -> Slot<'s, V>) -> bool {
        let mut engine = self.write();
        if engine.get(&key).is_some() {
            return false;
        }
        match produce().resolve() {
            Some(value) => {
                engine.insert(key, value);
                true
            }
            None => false,
        }
    }

    /// Returns a clone of the value stored under `key`.
    ///
    /// A missing key and a key holding some "empty" value look different here
    /// only because `V` has no absent value of its own; use
    /// [`search`](Tree::search) to get the stored key as well.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.read().get(key).map(|(_, value)| value.clone())
    }

    /// Returns the stored value for `key`, storing `value` first if the key is
    /// absent. Returns `None` only if the key was absent and `value` is absent
    /// too.
    pub fn get_or_set<'s>(&self, key: K, value: impl Into<Slot<'s, V>>) -> Option<V>
    where
        V: Clone,
    {
        if let Some(found) = self.get(&key) {
            return Some(found);
        }
        let slot = value.into();
        self.fetch_or_store(key, move || slot)
    }

    /// Like [`get_or_set`](Tree::get_or_set), with the value produced by `f`
    /// outside any lock. A value produced by a caller that lost the race is
    /// dropped, and every caller receives the value that was stored.
    pub fn get_or_set_func<'s, S>(&self, key: K, f: impl FnOnce() -> S) -> Option<V>
    where
        V: Clone,
        S: Into<Slot<'s, V>>,
    {
        if let Some(found) = self.get(&key) {
            return Some(found);
        }
        let slot = f().into();
        self.fetch_or_store(key, move || slot)
    }

    /// Like [`get_or_set_func`](Tree::get_or_set_func), but `f` runs while the
    /// write lock is held. Racing callers run `f` at most once between them
    /// and all receive its value.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{RedBlackTree, Comparator};
    ///
    /// let cache: RedBlackTree<&str, i32> = RedBlackTree::with_safe(Comparator::natural(), true);
    /// let value = cache.get_or_set_func_lock("answer", || 42);
    /// assert_eq!(value, Some(42));
    /// assert_eq!(cache.get_or_set_func_lock("answer", || 0), Some(42));
    /// ```
    pub fn get_or_set_func_lock<'s, S>(&self, key: K, f: impl FnOnce() -> S) -> Option<V>
    where
        V: Clone,
        S: Into<Slot<'s, V>>,
    {
        if let Some(found) = self.get(&key) {
            return Some(found);
        }
        self.fetch_or_store(key, move || f().into())
    }

    fn fetch_or_store<'s>(&self, key: K, produce: impl FnOnce() -> Slot<'s, V>) -> Option<V>
    where
        V: Clone,
    {
        let mut engine = self.write();
        if let Some((_, found)) = engine.get(&key) {
            return Some(found.clone());
        }
        let value = produce().resolve()?;
        engine.insert(key, value.clone());
        Some(value)
    }

    /// Looks up `key`, returning the stored key and value.
    pub fn search(&self, key: &K) -> Option<Entry<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.read().get(key).map(|(key, value)| Entry::new(key.clone(), value.clone()))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.read().get(key).is_some()
    }

    /// Number of entries.
    pub fn size(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes `key`, returning its value. A missing key is not an error.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.write().remove(key).map(|(_, value)| value)
    }

    /// Removes every key in `keys` under a single write lock.
    pub fn removes(&self, keys: &[K]) {
        let mut engine = self.write();
        for key in keys {
            engine.remove(key);
        }
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Replaces the whole content with `pairs` under a single write lock.
    pub fn replace(&self, pairs: impl IntoIterator<Item = (K, V)>) {
        let mut engine = self.write();
        engine.clear();
        for (key, value) in pairs {
            engine.insert(key, value);
        }
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let engine = self.read();
        let mut keys = Vec::with_capacity(engine.len());
        engine.visit(Order::Asc, None, &mut |key, _| {
            keys.push(key.clone());
            true
        });
        keys
    }

    /// Values in ascending key order.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let engine = self.read();
        let mut values = Vec::with_capacity(engine.len());
        engine.visit(Order::Asc, None, &mut |_, value| {
            values.push(value.clone());
            true
        });
        values
    }

    /// A snapshot of all entries in ascending key order.
    pub fn map(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let engine = self.read();
        let mut pairs = Vec::with_capacity(engine.len());
        engine.visit(Order::Asc, None, &mut |key, value| {
            pairs.push((key.clone(), value.clone()));
            true
        });
        pairs
    }

    /// A snapshot keyed by the display form of each key. Keys whose display
    /// forms coincide keep the value of the last one in ascending order.
    pub fn map_str(&self) -> HashMap<String, V>
    where
        K: fmt::Display,
        V: Clone,
    {
        let engine = self.read();
        let mut map = HashMap::with_capacity(engine.len());
        engine.visit(Order::Asc, None, &mut |key, value| {
            map.insert(key.to_string(), value.clone());
            true
        });
        map
    }

    /// The entry with the smallest key.
    pub fn left(&self) -> Option<Entry<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.read().first().map(to_entry)
    }

    /// The entry with the largest key.
    pub fn right(&self) -> Option<Entry<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.read().last().map(to_entry)
    }

    /// The entry with the largest key less than or equal to `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{AvlTree, Comparator, Entry};
    ///
    /// let tree = AvlTree::new(Comparator::natural());
    /// tree.sets([(10, "ten"), (20, "twenty")]);
    ///
    /// assert_eq!(tree.floor(&15), Some(Entry::new(10, "ten")));
    /// assert_eq!(tree.floor(&20), Some(Entry::new(20, "twenty")));
    /// assert_eq!(tree.floor(&5), None);
    /// ```
    pub fn floor(&self, key: &K) -> Option<Entry<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.read().floor(key).map(to_entry)
    }

    /// The entry with the smallest key greater than or equal to `key`.
    pub fn ceiling(&self, key: &K) -> Option<Entry<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.read().ceiling(key).map(to_entry)
    }

    /// A new tree of the same engine kind with keys and values exchanged,
    /// ordered by `comparator`. When several keys hold equal values, the entry
    /// with the largest key wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{AvlTree, Comparator};
    ///
    /// let names = AvlTree::new(Comparator::natural());
    /// names.sets([(1, "one".to_string()), (2, "two".to_string())]);
    ///
    /// let ids = names.flip_with(Comparator::natural());
    /// assert_eq!(ids.get(&"two".to_string()), Some(2));
    /// ```
    pub fn flip_with(&self, comparator: Comparator<V>) -> Tree<V, K, E::Rebind<V, K>>
    where
        K: Clone,
        V: Clone,
    {
        let engine = self.read();
        let mut flipped = engine.rebind::<V, K>(comparator);
        engine.visit(Order::Asc, None, &mut |key, value| {
            flipped.insert(value.clone(), key.clone());
            true
        });
        debug!("flipped {} entries into {} with a new comparator", engine.len(), flipped.len());
        Tree::from_engine(flipped, self.is_safe())
    }
}

impl<K: Clone, E: Engine<K, K>> Tree<K, K, E> {
    /// A new tree with keys and values exchanged, ordered by this tree's
    /// comparator. When several keys hold equal values, the entry with the
    /// largest key wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{BTree, Comparator};
    ///
    /// let tree = BTree::new(3, Comparator::natural());
    /// tree.sets([(1, 10), (2, 20)]);
    ///
    /// let flipped = tree.flip();
    /// assert_eq!(flipped.map(), vec![(10, 1), (20, 2)]);
    /// assert_eq!(flipped.flip(), tree);
    /// ```
    #[must_use]
    pub fn flip(&self) -> Self {
        let engine = self.read();
        let mut flipped = engine.empty();
        engine.visit(Order::Asc, None, &mut |key, value| {
            flipped.insert(value.clone(), key.clone());
            true
        });
        debug!("flipped {} entries into {}", engine.len(), flipped.len());
        Self::from_engine(flipped, self.is_safe())
    }
}

fn to_entry<K: Clone, V: Clone>((key, value): (&K, &V)) -> Entry<K, V> {
    Entry::new(key.clone(), value.clone())
}

impl<K, V, E: Engine<K, V> + Default> Default for Tree<K, V, E> {
    fn default() -> Self {
        Self::from_engine(E::default(), false)
    }
}

/// Deep copy with its own lock and the same `safe` setting.
impl<K, V, E: Engine<K, V> + Clone> Clone for Tree<K, V, E> {
    fn clone(&self) -> Self {
        Self::from_engine(self.read().clone(), self.is_safe())
    }
}

/// Trees are equal when they map the same keys (under `self`'s comparator) to
/// equal values.
impl<K, V: PartialEq, E: Engine<K, V>> PartialEq for Tree<K, V, E> {
    fn eq(&self, other: &Self) -> bool {
        let (this, other) = (self.read(), other.read());
        if this.len() != other.len() {
            return false;
        }
        let mut equal = true;
        this.visit(Order::Asc, None, &mut |key, value| {
            equal = other.get(key).is_some_and(|(_, found)| found == value);
            equal
        });
        equal
    }
}

/// Draws the tree for diagnostics: AVL and red-black trees as a sideways
/// binary tree with the right subtree on top, B-trees as an in-order listing
/// indented four spaces per level.
impl<K: fmt::Display, V, E: Engine<K, V>> fmt::Display for Tree<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read().render(f)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, E: Engine<K, V>> fmt::Debug for Tree<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = self.read();
        let mut map = f.debug_map();
        engine.visit(Order::Asc, None, &mut |key, value| {
            map.entry(key, value);
            true
        });
        map.finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::engine::Avl;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn tree() -> Tree<i32, String, Avl<i32, String>> {
        Tree::from_engine(Avl::new(Comparator::natural()), false)
    }

    #[test]
    fn absent_values_are_not_stored() {
        let tree = tree();
        tree.set(1, Slot::Absent);
        tree.set(2, Slot::deferred(|| None));
        assert!(tree.is_empty());
        assert!(!tree.set_if_not_exist(3, Slot::Absent));
        assert_eq!(tree.get_or_set(4, Slot::Absent), None);
        assert!(!tree.contains(&4));
    }

    #[test]
    fn set_if_not_exist_keeps_existing_value() {
        let tree = tree();
        assert!(tree.set_if_not_exist(1, "a".to_string()));
        assert!(!tree.set_if_not_exist(1, "b".to_string()));
        let calls = Cell::new(0);
        assert!(!tree.set_if_not_exist_func(1, || {
            calls.set(calls.get() + 1);
            "c".to_string()
        }));
        assert_eq!(calls.get(), 0);
        assert_eq!(tree.get(&1), Some("a".to_string()));
    }

    #[test]
    fn func_lock_produces_deferred_slots() {
        let tree = tree();
        let value = tree.get_or_set_func_lock(7, || Slot::deferred(|| Some("seven".to_string())));
        assert_eq!(value.as_deref(), Some("seven"));
        assert!(tree.set_if_not_exist_func_lock(8, || "eight".to_string()));
        assert_eq!(tree.keys(), vec![7, 8]);
    }

    #[test]
    fn replace_and_removes() {
        let tree = tree();
        tree.sets((0..10).map(|key| (key, key.to_string())));
        tree.removes(&[1, 3, 5, 42]);
        assert_eq!(tree.keys(), vec![0, 2, 4, 6, 7, 8, 9]);
        tree.replace([(100, "x".to_string())]);
        assert_eq!(tree.map(), vec![(100, "x".to_string())]);
        assert_eq!(tree.remove(&100), Some("x".to_string()));
        assert_eq!(tree.remove(&100), None);
    }

    #[test]
    fn map_str_uses_display_keys() {
        let tree = tree();
        tree.sets([(1, "a".to_string()), (2, "b".to_string())]);
        let map = tree.map_str();
        assert_eq!(map.get("1").map(String::as_str), Some("a"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn debug_renders_as_map() {
        let tree = tree();
        tree.sets([(2, "b".to_string()), (1, "a".to_string())]);
        assert_eq!(format!("{tree:?}"), r#"{1: "a", 2: "b"}"#);
    }

    #[test]
    fn clone_is_independent() {
        let tree = tree();
        tree.set(1, "a".to_string());
        let copy = tree.clone();
        copy.set(2, "b".to_string());
        tree.remove(&1);
        assert_eq!(tree.size(), 0);
        assert_eq!(copy.keys(), vec![1, 2]);
        assert_eq!(copy.is_safe(), tree.is_safe());
    }
}
