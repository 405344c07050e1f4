use serde::{Deserialize, Serialize};

/// An owned key-value pair copied out of a tree.
///
/// Boundary queries ([`left`](crate::Tree::left), [`floor`](crate::Tree::floor), ...)
/// and [`search`](crate::Tree::search) return entries by value. Changing an
/// `Entry` never changes the tree it came from.
///
/// # Examples
///
/// ```
/// use gtree::{AvlTree, Comparator, Entry};
///
/// let tree: AvlTree<i32, &str> = AvlTree::new(Comparator::natural());
/// tree.set(1, "one");
///
/// let mut first = tree.left().unwrap();
/// assert_eq!(first, Entry::new(1, "one"));
/// first.value = "uno";
/// assert_eq!(tree.get(&1), Some("one"));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Entry<K, V> {
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}
