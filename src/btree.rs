use crate::engine::Multiway;
use crate::{Comparator, Result, Tree};

/// An ordered map over a B-tree of order `m`.
///
/// Each node holds up to `m - 1` entries, so the tree stays shallow and a
/// walk touches few nodes.
///
/// # Examples
///
/// ```
/// use gtree::{BTree, Comparator};
///
/// let tree = BTree::new(3, Comparator::natural());
/// tree.sets((1..=7).map(|key| (key, key * key)));
///
/// assert_eq!(tree.height(), 3);
/// assert_eq!(tree.get(&7), Some(49));
/// assert!(BTree::<i32, i32>::try_new(2, Comparator::natural()).is_err());
/// ```
pub type BTree<K, V> = Tree<K, V, Multiway<K, V>>;

impl<K, V> BTree<K, V> {
    /// Creates an empty tree of order `m` without internal locking.
    ///
    /// # Panics
    ///
    /// Panics if `m < 3`.
    pub fn new(m: usize, comparator: Comparator<K>) -> Self {
        Self::with_safe(m, comparator, false)
    }

    /// Creates an empty tree of order `m`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`](crate::Error::InvalidOrder) if `m < 3`.
    pub fn try_new(m: usize, comparator: Comparator<K>) -> Result<Self> {
        Ok(Self::from_engine(Multiway::try_new(m, comparator)?, false))
    }

    /// Creates an empty tree of order `m`, with internal locking when `safe`
    /// is set.
    ///
    /// # Panics
    ///
    /// Panics if `m < 3`.
    pub fn with_safe(m: usize, comparator: Comparator<K>, safe: bool) -> Self {
        Self::from_engine(Multiway::new(m, comparator), safe)
    }

    /// Creates a tree of order `m` holding `data`.
    ///
    /// # Panics
    ///
    /// Panics if `m < 3`.
    pub fn new_from(m: usize, comparator: Comparator<K>, data: impl IntoIterator<Item = (K, V)>, safe: bool) -> Self {
        let tree = Self::with_safe(m, comparator, safe);
        tree.sets(data);
        tree
    }

    /// Number of node levels; zero when empty.
    pub fn height(&self) -> usize {
        self.read().height()
    }

    /// Maximum number of children per node.
    pub fn order(&self) -> usize {
        self.read().order()
    }
}
