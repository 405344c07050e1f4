use crate::engine::RedBlack;
use crate::{Comparator, Tree};

/// An ordered map over a red-black tree.
///
/// Besides the usual constructors, a red-black tree can start without a
/// comparator: [`RedBlackTree::default`] and [`RedBlackTree::lazy`] install
/// the natural order of `K` on first use, and
/// [`set_comparator`](RedBlackTree::set_comparator) replaces the order at any
/// time.
///
/// # Examples
///
/// ```
/// use gtree::{Comparator, RedBlackTree};
///
/// let tree: RedBlackTree<i32, &str> = RedBlackTree::default();
/// tree.set_comparator(Comparator::natural().reverse());
/// tree.sets([(1, "one"), (2, "two"), (3, "three")]);
///
/// assert_eq!(tree.keys(), vec![3, 2, 1]);
/// ```
pub type RedBlackTree<K, V> = Tree<K, V, RedBlack<K, V>>;

impl<K, V> RedBlackTree<K, V> {
    /// Creates an empty tree without internal locking.
    pub fn new(comparator: Comparator<K>) -> Self {
        Self::with_safe(comparator, false)
    }

    /// Creates an empty tree, with internal locking when `safe` is set.
    pub fn with_safe(comparator: Comparator<K>, safe: bool) -> Self {
        Self::from_engine(RedBlack::new(comparator), safe)
    }

    /// Creates a tree holding `data`.
    pub fn new_from(comparator: Comparator<K>, data: impl IntoIterator<Item = (K, V)>, safe: bool) -> Self {
        let tree = Self::with_safe(comparator, safe);
        tree.sets(data);
        tree
    }

    /// Creates an empty tree that settles on the natural order of `K` the
    /// first time it is used, unless a comparator is set before that.
    pub fn lazy(safe: bool) -> Self
    where
        K: Ord,
    {
        Self::from_engine(RedBlack::default(), safe)
    }

    /// Returns `true` once the tree has a comparator: from construction, from
    /// [`set_comparator`](RedBlackTree::set_comparator), or from the first
    /// operation on a lazy tree.
    pub fn is_initialized(&self) -> bool {
        self.read().is_initialized()
    }

    /// Replaces the comparator. Entries already stored are re-sorted under
    /// the new order; entries whose keys compare equal under it collapse into
    /// the last one.
    pub fn set_comparator(&self, comparator: Comparator<K>) {
        self.write().set_comparator(comparator);
    }
}
