use std::fmt;

/// A value handed to the `set` family of a tree.
///
/// Besides plain values (any `V` converts into `Slot::Value`), a slot can hold a
/// deferred value that is only materialized when the tree stores it, or the
/// absent value.
///
/// Storing an absent value is a no-op: the key is left untouched and no entry
/// is created. The same holds for a deferred value whose closure returns
/// `None`.
///
/// # Examples
///
/// ```
/// use gtree::{AvlTree, Comparator, Slot};
///
/// let tree: AvlTree<i32, i32> = AvlTree::new(Comparator::natural());
/// tree.set(1, 10);
/// tree.set(2, Slot::deferred(|| Some(20)));
/// tree.set(3, Slot::Absent);
///
/// assert_eq!(tree.keys(), vec![1, 2]);
/// assert_eq!(tree.get(&2), Some(20));
/// ```
pub enum Slot<'f, V> {
    Value(V),
    Deferred(Box<dyn FnOnce() -> Option<V> + 'f>),
    Absent,
}

impl<'f, V> Slot<'f, V> {
    /// A value produced by `f` at the moment it is stored.
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnOnce() -> Option<V> + 'f,
    {
        Slot::Deferred(Box::new(f))
    }

    /// Produces the value to store, running a deferred closure if needed.
    pub fn resolve(self) -> Option<V> {
        match self {
            Slot::Value(value) => Some(value),
            Slot::Deferred(f) => f(),
            Slot::Absent => None,
        }
    }
}

impl<V> From<V> for Slot<'_, V> {
    fn from(value: V) -> Self {
        Slot::Value(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Slot<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Slot::Deferred(_) => f.write_str("Deferred(..)"),
            Slot::Absent => f.write_str("Absent"),
        }
    }
}
