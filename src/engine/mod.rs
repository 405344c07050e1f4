//! The balanced search trees behind [`Tree`](crate::Tree).
//!
//! Each engine owns its nodes and orders keys with nothing but its
//! [`Comparator`]. Engines do no locking; [`Tree`](crate::Tree) wraps them in
//! a [`RwMutex`](crate::RwMutex).

use core::fmt;

use crate::Comparator;

mod arena;
mod avl;
mod multiway;
mod red_black;

pub use avl::Avl;
pub use multiway::Multiway;
pub use red_black::RedBlack;

/// Traversal direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Order {
    Asc,
    Desc,
}

/// The operations every backing tree provides.
///
/// All lookups return borrowed `(key, value)` pairs; [`Tree`](crate::Tree)
/// copies them out while it still holds its lock.
pub trait Engine<K, V>: Sized {
    /// The same engine kind holding other key and value types, used to flip
    /// keys and values.
    type Rebind<K2, V2>: Engine<K2, V2>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the stored entry for `key`.
    fn get(&self, key: &K) -> Option<(&K, &V)>;

    /// Inserts or overwrites, returning the replaced value.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Removes and returns the entry for `key`.
    fn remove(&mut self, key: &K) -> Option<(K, V)>;

    fn clear(&mut self);

    /// The entry with the smallest key.
    fn first(&self) -> Option<(&K, &V)>;

    /// The entry with the largest key.
    fn last(&self) -> Option<(&K, &V)>;

    /// The entry with the largest key `<= key`.
    fn floor(&self, key: &K) -> Option<(&K, &V)>;

    /// The entry with the smallest key `>= key`.
    fn ceiling(&self, key: &K) -> Option<(&K, &V)>;

    /// Calls `f` for each entry in `order` until it returns `false`.
    ///
    /// With `from` set, the walk starts at the entry whose key equals it and
    /// visits nothing when there is no such entry.
    fn visit(&self, order: Order, from: Option<&K>, f: &mut dyn FnMut(&K, &V) -> bool);

    fn comparator(&self) -> Comparator<K>;

    /// An empty engine of the same shape and comparator.
    #[must_use]
    fn empty(&self) -> Self;

    /// An empty engine of the same shape ordered by `comparator`.
    fn rebind<K2, V2>(&self, comparator: Comparator<K2>) -> Self::Rebind<K2, V2>;

    /// Writes the diagnostic tree drawing.
    ///
    /// # Errors
    ///
    /// Propagates formatter errors.
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        K: fmt::Display;
}

/// Draws a binary tree rotated a quarter turn, right subtree on top.
pub(crate) fn render_rotated<N: Copy>(
    f: &mut fmt::Formatter<'_>,
    node: N,
    prefix: &mut String,
    tail: bool,
    children: &dyn Fn(N) -> [Option<N>; 2],
    label: &dyn Fn(N, &mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    let [left, right] = children(node);
    let depth = prefix.len();
    if let Some(right) = right {
        prefix.push_str(if tail { "│   " } else { "    " });
        render_rotated(f, right, prefix, false, children, label)?;
        prefix.truncate(depth);
    }
    f.write_str(prefix)?;
    f.write_str(if tail { "└── " } else { "┌── " })?;
    label(node, f)?;
    f.write_str("\n")?;
    if let Some(left) = left {
        prefix.push_str(if tail { "    " } else { "│   " });
        render_rotated(f, left, prefix, true, children, label)?;
        prefix.truncate(depth);
    }
    Ok(())
}

/// Child slot holding keys smaller than the node's key.
pub(crate) const LEFT: usize = 0;
/// Child slot holding keys greater than the node's key.
pub(crate) const RIGHT: usize = 1;

impl Order {
    /// The child slot a walk in this order descends into first.
    pub(crate) const fn near(self) -> usize {
        match self {
            Order::Asc => LEFT,
            Order::Desc => RIGHT,
        }
    }

    pub(crate) const fn far(self) -> usize {
        1 - self.near()
    }
}
