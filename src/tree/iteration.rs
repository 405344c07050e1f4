use super::Tree;
use crate::Var;
use crate::engine::{Engine, Order};

/// Keys that can stand for a position in ascending key order.
///
/// Used by the flag form of positional iteration
/// ([`iterator_asc_from`](Tree::iterator_asc_from) and friends). Integers map
/// to themselves, strings and dynamic values to the integer they parse as. A
/// key with no index (negative, non-numeric, ...) yields `None`.
pub trait KeyIndex {
    fn key_index(&self) -> Option<usize>;
}

macro_rules! key_index_for_int {
    ($($int:ty),*) => {
        $(
            impl KeyIndex for $int {
                fn key_index(&self) -> Option<usize> {
                    usize::try_from(*self).ok()
                }
            }
        )*
    };
}

key_index_for_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl KeyIndex for str {
    fn key_index(&self) -> Option<usize> {
        self.trim().parse().ok()
    }
}

impl KeyIndex for String {
    fn key_index(&self) -> Option<usize> {
        self.as_str().key_index()
    }
}

impl<T: KeyIndex + ?Sized> KeyIndex for &T {
    fn key_index(&self) -> Option<usize> {
        (**self).key_index()
    }
}

impl KeyIndex for Var {
    fn key_index(&self) -> Option<usize> {
        match self {
            Var::Number(number) => number.as_u64().and_then(|index| usize::try_from(index).ok()),
            Var::String(text) => text.key_index(),
            _ => None,
        }
    }
}

impl<K, V, E: Engine<K, V>> Tree<K, V, E> {
    /// Same as [`iterator_asc`](Tree::iterator_asc).
    pub fn iterator(&self, f: impl FnMut(&K, &V) -> bool) {
        self.iterator_asc(f);
    }

    /// Calls `f` for each entry in ascending key order until it returns
    /// `false`.
    ///
    /// The read lock is held for the whole walk.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{AvlTree, Comparator};
    ///
    /// let tree = AvlTree::new(Comparator::natural());
    /// tree.sets((0..10).map(|key| (key, key * 10)));
    ///
    /// let mut seen = Vec::new();
    /// tree.iterator_asc(|key, value| {
    ///     seen.push((*key, *value));
    ///     seen.len() < 3
    /// });
    /// assert_eq!(seen, vec![(0, 0), (1, 10), (2, 20)]);
    /// ```
    pub fn iterator_asc(&self, mut f: impl FnMut(&K, &V) -> bool) {
        self.read().visit(Order::Asc, None, &mut f);
    }

    /// Calls `f` for each entry in descending key order until it returns
    /// `false`.
    pub fn iterator_desc(&self, mut f: impl FnMut(&K, &V) -> bool) {
        self.read().visit(Order::Desc, None, &mut f);
    }

    /// Ascending walk starting at the entry whose key equals `key`. Nothing is
    /// visited when `key` is absent.
    pub fn iterator_asc_from_key(&self, key: &K, mut f: impl FnMut(&K, &V) -> bool) {
        self.read().visit(Order::Asc, Some(key), &mut f);
    }

    /// Descending walk starting at the entry whose key equals `key`. Nothing
    /// is visited when `key` is absent.
    pub fn iterator_desc_from_key(&self, key: &K, mut f: impl FnMut(&K, &V) -> bool) {
        self.read().visit(Order::Desc, Some(key), &mut f);
    }

    /// Ascending walk starting at the `index`-th smallest entry (zero-based).
    /// Nothing is visited when `index` is out of range.
    ///
    /// # Complexity
    ///
    /// Reaching the start position takes `O(index)`.
    pub fn iterator_asc_from_index(&self, index: usize, mut f: impl FnMut(&K, &V) -> bool) {
        let engine = self.read();
        if index >= engine.len() {
            return;
        }
        let mut skip = index;
        engine.visit(Order::Asc, None, &mut |key, value| {
            if skip > 0 {
                skip -= 1;
                return true;
            }
            f(key, value)
        });
    }

    /// Descending walk starting at the `index`-th smallest entry (zero-based).
    /// Nothing is visited when `index` is out of range.
    pub fn iterator_desc_from_index(&self, index: usize, mut f: impl FnMut(&K, &V) -> bool) {
        let engine = self.read();
        let len = engine.len();
        if index >= len {
            return;
        }
        let mut skip = len - 1 - index;
        engine.visit(Order::Desc, None, &mut |key, value| {
            if skip > 0 {
                skip -= 1;
                return true;
            }
            f(key, value)
        });
    }

    /// Same as [`iterator_asc_from`](Tree::iterator_asc_from).
    pub fn iterator_from(&self, key: &K, matching: bool, f: impl FnMut(&K, &V) -> bool)
    where
        K: KeyIndex,
    {
        self.iterator_asc_from(key, matching, f);
    }

    /// Ascending walk from `key`. With `matching` set this is
    /// [`iterator_asc_from_key`](Tree::iterator_asc_from_key); otherwise `key`
    /// is read as a zero-based position, as in
    /// [`iterator_asc_from_index`](Tree::iterator_asc_from_index). A key that
    /// is not a valid position visits nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{BTree, Comparator};
    ///
    /// let tree = BTree::new(3, Comparator::natural());
    /// tree.sets([(10, 'a'), (20, 'b'), (30, 'c')]);
    ///
    /// let mut keys = Vec::new();
    /// tree.iterator_asc_from(&20, true, |key, _| { keys.push(*key); true });
    /// assert_eq!(keys, vec![20, 30]);
    ///
    /// keys.clear();
    /// tree.iterator_asc_from(&1, false, |key, _| { keys.push(*key); true });
    /// assert_eq!(keys, vec![20, 30]);
    /// ```
    pub fn iterator_asc_from(&self, key: &K, matching: bool, f: impl FnMut(&K, &V) -> bool)
    where
        K: KeyIndex,
    {
        if matching {
            self.iterator_asc_from_key(key, f);
        } else if let Some(index) = key.key_index() {
            self.iterator_asc_from_index(index, f);
        }
    }

    /// Descending counterpart of [`iterator_asc_from`](Tree::iterator_asc_from).
    pub fn iterator_desc_from(&self, key: &K, matching: bool, f: impl FnMut(&K, &V) -> bool)
    where
        K: KeyIndex,
    {
        if matching {
            self.iterator_desc_from_key(key, f);
        } else if let Some(index) = key.key_index() {
            self.iterator_desc_from_index(index, f);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{Comparator, RedBlackTree};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn keys_of(walk: impl FnOnce(&mut dyn FnMut(&i32, &i32) -> bool)) -> Vec<i32> {
        let mut keys = Vec::new();
        walk(&mut |key, _| {
            keys.push(*key);
            true
        });
        keys
    }

    #[test]
    fn key_index_conversions() {
        assert_eq!(5_i64.key_index(), Some(5));
        assert_eq!((-1_i32).key_index(), None);
        assert_eq!("12".key_index(), Some(12));
        assert_eq!("twelve".to_string().key_index(), None);
        assert_eq!(json!(3).key_index(), Some(3));
        assert_eq!(json!("4").key_index(), Some(4));
        assert_eq!(json!(1.5).key_index(), None);
    }

    #[test]
    fn index_walks() {
        let tree = RedBlackTree::new(Comparator::natural());
        tree.sets((0..10).map(|key| (key * 2, key)));

        assert_eq!(keys_of(|f| tree.iterator_asc_from_index(7, f)), vec![14, 16, 18]);
        assert_eq!(keys_of(|f| tree.iterator_desc_from_index(2, f)), vec![4, 2, 0]);
        assert_eq!(keys_of(|f| tree.iterator_asc_from_index(10, f)), Vec::<i32>::new());
        assert_eq!(keys_of(|f| tree.iterator_desc_from(&9, false, f)), (0..10).rev().map(|key| key * 2).collect::<Vec<_>>());
        assert_eq!(keys_of(|f| tree.iterator_from(&-1, false, f)), Vec::<i32>::new());
    }

    #[test]
    fn key_walks() {
        let tree = RedBlackTree::new(Comparator::natural());
        tree.sets((0..10).map(|key| (key * 2, key)));

        assert_eq!(keys_of(|f| tree.iterator_desc_from(&6, true, f)), vec![6, 4, 2, 0]);
        assert_eq!(keys_of(|f| tree.iterator_from(&7, true, f)), Vec::<i32>::new());
        assert_eq!(keys_of(|f| tree.iterator_asc_from_key(&16, f)), vec![16, 18]);
    }
}
