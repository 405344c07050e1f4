//! Trees of dynamic keys and values.
//!
//! [`Var`] is any JSON value. [`VarTree`] fixes both the key and the value type
//! to it and takes `impl Into<Var>` everywhere, so mixed literals can go into
//! one tree without spelling out types. The comparator decides how keys of
//! different kinds relate; see [`var_int`](crate::var_int),
//! [`var_string`](crate::var_string) and [`var_natural`](crate::var_natural).

use core::fmt;
use core::ops::Deref;

use serde::{Serialize, Serializer};

use crate::engine::{Avl, Engine, Multiway, RedBlack};
use crate::tree::decode_members;
use crate::{Comparator, Entry, Result, Slot, Tree};

/// A dynamic key or value.
pub type Var = serde_json::Value;

/// A [`Tree`] from [`Var`] to [`Var`].
///
/// A [`Var::Null`] value is the absent value: storing it is a no-op, and
/// lookups of missing keys return `Var::Null`. The full generic API stays
/// reachable through `Deref`.
///
/// # Examples
///
/// ```
/// use gtree::{VarTree, var_natural};
/// use serde_json::json;
///
/// let tree = VarTree::avl(var_natural(), false);
/// tree.set(2, "two");
/// tree.set(1, json!({"nested": true}));
/// tree.set(3, ());
///
/// assert_eq!(tree.size(), 2);
/// assert_eq!(tree.get(2), json!("two"));
/// assert_eq!(tree.get(3), json!(null));
/// ```
pub struct VarTree<E> {
    tree: Tree<Var, Var, E>,
}

pub type VarAvlTree = VarTree<Avl<Var, Var>>;
pub type VarBTree = VarTree<Multiway<Var, Var>>;
pub type VarRedBlackTree = VarTree<RedBlack<Var, Var>>;

impl VarTree<Avl<Var, Var>> {
    pub fn avl(comparator: Comparator<Var>, safe: bool) -> Self {
        Self::from(Tree::from_engine(Avl::new(comparator), safe))
    }
}

impl VarTree<Multiway<Var, Var>> {
    /// # Panics
    ///
    /// Panics if `m < 3`.
    pub fn btree(m: usize, comparator: Comparator<Var>, safe: bool) -> Self {
        Self::from(Tree::from_engine(Multiway::new(m, comparator), safe))
    }
}

impl VarTree<RedBlack<Var, Var>> {
    pub fn red_black(comparator: Comparator<Var>, safe: bool) -> Self {
        Self::from(Tree::from_engine(RedBlack::new(comparator), safe))
    }
}

fn slot(value: Var) -> Slot<'static, Var> {
    if value.is_null() { Slot::Absent } else { Slot::Value(value) }
}

impl<E: Engine<Var, Var>> VarTree<E> {
    pub fn set(&self, key: impl Into<Var>, value: impl Into<Var>) {
        self.tree.set(key.into(), slot(value.into()));
    }

    /// Stores each pair; null values are skipped.
    pub fn sets<K: Into<Var>, V: Into<Var>>(&self, pairs: impl IntoIterator<Item = (K, V)>) {
        self.tree.sets(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .filter(|(_, value)| !value.is_null()),
        );
    }

    pub fn set_if_not_exist(&self, key: impl Into<Var>, value: impl Into<Var>) -> bool {
        self.tree.set_if_not_exist(key.into(), slot(value.into()))
    }

    pub fn set_if_not_exist_func<V: Into<Var>>(&self, key: impl Into<Var>, f: impl FnOnce() -> V) -> bool {
        self.tree.set_if_not_exist_func(key.into(), || slot(f().into()))
    }

    pub fn set_if_not_exist_func_lock<V: Into<Var>>(&self, key: impl Into<Var>, f: impl FnOnce() -> V) -> bool {
        self.tree.set_if_not_exist_func_lock(key.into(), || slot(f().into()))
    }

    /// The stored value, or `Var::Null` for a missing key.
    pub fn get(&self, key: impl Into<Var>) -> Var {
        self.tree.get(&key.into()).unwrap_or_default()
    }

    pub fn get_or_set(&self, key: impl Into<Var>, value: impl Into<Var>) -> Var {
        self.tree.get_or_set(key.into(), slot(value.into())).unwrap_or_default()
    }

    pub fn get_or_set_func<V: Into<Var>>(&self, key: impl Into<Var>, f: impl FnOnce() -> V) -> Var {
        self.tree.get_or_set_func(key.into(), || slot(f().into())).unwrap_or_default()
    }

    pub fn get_or_set_func_lock<V: Into<Var>>(&self, key: impl Into<Var>, f: impl FnOnce() -> V) -> Var {
        self.tree.get_or_set_func_lock(key.into(), || slot(f().into())).unwrap_or_default()
    }

    pub fn search(&self, key: impl Into<Var>) -> Option<Entry<Var, Var>> {
        self.tree.search(&key.into())
    }

    pub fn contains(&self, key: impl Into<Var>) -> bool {
        self.tree.contains(&key.into())
    }

    /// Removes `key`, returning its value or `Var::Null`.
    pub fn remove(&self, key: impl Into<Var>) -> Var {
        self.tree.remove(&key.into()).unwrap_or_default()
    }

    pub fn removes<K: Into<Var>>(&self, keys: impl IntoIterator<Item = K>) {
        let keys: Vec<Var> = keys.into_iter().map(Into::into).collect();
        self.tree.removes(&keys);
    }

    pub fn floor(&self, key: impl Into<Var>) -> Option<Entry<Var, Var>> {
        self.tree.floor(&key.into())
    }

    pub fn ceiling(&self, key: impl Into<Var>) -> Option<Entry<Var, Var>> {
        self.tree.ceiling(&key.into())
    }

    /// Flag-form iteration from `key`: an exact key with `matching` set, a
    /// position otherwise.
    pub fn iterator_asc_from(&self, key: impl Into<Var>, matching: bool, f: impl FnMut(&Var, &Var) -> bool) {
        self.tree.iterator_asc_from(&key.into(), matching, f);
    }

    pub fn iterator_desc_from(&self, key: impl Into<Var>, matching: bool, f: impl FnMut(&Var, &Var) -> bool) {
        self.tree.iterator_desc_from(&key.into(), matching, f);
    }

    /// Swaps keys and values in a new tree ordered by the same comparator.
    #[must_use]
    pub fn flip(&self) -> Self {
        Self::from(self.tree.flip())
    }

    /// Decodes a JSON object into this tree. Member names become string keys
    /// and `null` members are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) for anything but a JSON
    /// object. The tree is left unchanged.
    pub fn unmarshal_json(&self, json: &str) -> Result<()> {
        let members: Vec<(Var, Var)> = decode_members(json)?;
        self.sets(members);
        Ok(())
    }

    pub fn into_inner(self) -> Tree<Var, Var, E> {
        self.tree
    }
}

impl<E: Engine<Var, Var>> From<Tree<Var, Var, E>> for VarTree<E> {
    fn from(tree: Tree<Var, Var, E>) -> Self {
        Self { tree }
    }
}

impl<E> Deref for VarTree<E> {
    type Target = Tree<Var, Var, E>;

    fn deref(&self) -> &Self::Target {
        &self.tree
    }
}

impl<E: Engine<Var, Var> + Clone> Clone for VarTree<E> {
    fn clone(&self) -> Self {
        Self::from(self.tree.clone())
    }
}

impl<E: Engine<Var, Var>> PartialEq for VarTree<E> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl<E: Engine<Var, Var>> fmt::Display for VarTree<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tree, f)
    }
}

impl<E: Engine<Var, Var>> fmt::Debug for VarTree<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}

/// Member names are the text of each key, so string keys appear without
/// quotes.
impl<E: Engine<Var, Var>> Serialize for VarTree<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.tree.map().into_iter().map(|(key, value)| (crate::comparator::var_text(&key), value)))
    }
}
