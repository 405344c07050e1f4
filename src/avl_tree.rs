use crate::engine::Avl;
use crate::{Comparator, Tree};

/// An ordered map over an AVL tree.
///
/// Subtree heights differ by at most one at every node, which keeps lookups
/// slightly faster than a red-black tree at the cost of more rotations on
/// writes.
///
/// # Examples
///
/// ```
/// use gtree::{AvlTree, Comparator, Entry};
///
/// let tree = AvlTree::new_from(Comparator::natural(), (1..100).filter(|&key| key != 50).map(|key| (key, key)), false);
///
/// assert_eq!(tree.floor(&50), Some(Entry::new(49, 49)));
/// assert_eq!(tree.ceiling(&50), Some(Entry::new(51, 51)));
/// assert_eq!(tree.ceiling(&100), None);
/// ```
pub type AvlTree<K, V> = Tree<K, V, Avl<K, V>>;

impl<K, V> AvlTree<K, V> {
    /// Creates an empty tree without internal locking.
    pub fn new(comparator: Comparator<K>) -> Self {
        Self::with_safe(comparator, false)
    }

    /// Creates an empty tree, with internal locking when `safe` is set.
    pub fn with_safe(comparator: Comparator<K>, safe: bool) -> Self {
        Self::from_engine(Avl::new(comparator), safe)
    }

    /// Creates a tree holding `data`. Later pairs overwrite earlier ones with
    /// an equal key.
    pub fn new_from(comparator: Comparator<K>, data: impl IntoIterator<Item = (K, V)>, safe: bool) -> Self {
        let tree = Self::with_safe(comparator, safe);
        tree.sets(data);
        tree
    }
}
