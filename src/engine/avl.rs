use core::cmp::Ordering;
use core::fmt;
use core::mem;

use smallvec::SmallVec;

use super::{Engine, LEFT, Order, RIGHT, render_rotated};
use crate::Comparator;

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    /// Height of the right subtree minus height of the left subtree.
    balance: i8,
    children: [Link<K, V>; 2],
}

impl<K, V> Node<K, V> {
    const fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            balance: 0,
            children: [None, None],
        }
    }
}

/// A height-balanced binary search tree.
///
/// The heights of the two subtrees of every node differ by at most one, so
/// lookups, inserts and removals are `O(log n)`.
#[derive(Clone)]
pub struct Avl<K, V> {
    root: Link<K, V>,
    len: usize,
    comparator: Comparator<K>,
}

impl<K, V> Avl<K, V> {
    pub const fn new(comparator: Comparator<K>) -> Self {
        Self {
            root: None,
            len: 0,
            comparator,
        }
    }

    fn extreme(&self, side: usize) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(child) = node.children[side].as_deref() {
            node = child;
        }
        Some((&node.key, &node.value))
    }

    /// Closest entry on one side of `key`; `below` picks floor over ceiling.
    fn bound(&self, key: &K, below: bool) -> Option<(&K, &V)> {
        let mut best = None;
        let mut link = &self.root;
        while let Some(node) = link {
            match self.comparator.compare(key, &node.key) {
                Ordering::Equal => return Some((&node.key, &node.value)),
                Ordering::Less => {
                    if !below {
                        best = Some((&node.key, &node.value));
                    }
                    link = &node.children[LEFT];
                }
                Ordering::Greater => {
                    if below {
                        best = Some((&node.key, &node.value));
                    }
                    link = &node.children[RIGHT];
                }
            }
        }
        best
    }
}

impl<K: Ord, V> Default for Avl<K, V> {
    fn default() -> Self {
        Self::new(Comparator::natural())
    }
}

impl<K, V> Engine<K, V> for Avl<K, V> {
    type Rebind<K2, V2> = Avl<K2, V2>;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, key: &K) -> Option<(&K, &V)> {
        let mut link = &self.root;
        while let Some(node) = link {
            match self.comparator.compare(key, &node.key) {
                Ordering::Equal => return Some((&node.key, &node.value)),
                Ordering::Less => link = &node.children[LEFT],
                Ordering::Greater => link = &node.children[RIGHT],
            }
        }
        None
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (old, _) = insert(&mut self.root, key, value, &self.comparator);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let (entry, _) = remove(&mut self.root, key, &self.comparator)?;
        self.len -= 1;
        Some(entry)
    }

    fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    fn first(&self) -> Option<(&K, &V)> {
        self.extreme(LEFT)
    }

    fn last(&self) -> Option<(&K, &V)> {
        self.extreme(RIGHT)
    }

    fn floor(&self, key: &K) -> Option<(&K, &V)> {
        self.bound(key, true)
    }

    fn ceiling(&self, key: &K) -> Option<(&K, &V)> {
        self.bound(key, false)
    }

    fn visit(&self, order: Order, from: Option<&K>, f: &mut dyn FnMut(&K, &V) -> bool) {
        let (near, far) = (order.near(), order.far());
        // Nodes whose entry and far subtree are still pending.
        let mut stack: SmallVec<[&Node<K, V>; 32]> = SmallVec::new();
        let mut link = self.root.as_deref();

        if let Some(key) = from {
            loop {
                let Some(node) = link else { return };
                let side = match self.comparator.compare(key, &node.key) {
                    Ordering::Equal => {
                        stack.push(node);
                        break;
                    }
                    Ordering::Less => LEFT,
                    Ordering::Greater => RIGHT,
                };
                if side == near {
                    stack.push(node);
                }
                link = node.children[side].as_deref();
            }
        } else {
            while let Some(node) = link {
                stack.push(node);
                link = node.children[near].as_deref();
            }
        }

        while let Some(node) = stack.pop() {
            if !f(&node.key, &node.value) {
                return;
            }
            let mut link = node.children[far].as_deref();
            while let Some(child) = link {
                stack.push(child);
                link = child.children[near].as_deref();
            }
        }
    }

    fn comparator(&self) -> Comparator<K> {
        self.comparator.clone()
    }

    fn empty(&self) -> Self {
        Self::new(self.comparator.clone())
    }

    fn rebind<K2, V2>(&self, comparator: Comparator<K2>) -> Avl<K2, V2> {
        Avl::new(comparator)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        K: fmt::Display,
    {
        let Some(root) = self.root.as_deref() else {
            return Ok(());
        };
        render_rotated::<&Node<K, V>>(
            f,
            root,
            &mut String::new(),
            true,
            &|node| [node.children[LEFT].as_deref(), node.children[RIGHT].as_deref()],
            &|node, f| write!(f, "{}", node.key),
        )
    }
}

/// Inserts below `link`. Returns the replaced value and whether the subtree
/// grew taller.
fn insert<K, V>(link: &mut Link<K, V>, key: K, value: V, comparator: &Comparator<K>) -> (Option<V>, bool) {
    match *link {
        None => {
            *link = Some(Box::new(Node::new(key, value)));
            (None, true)
        }
        Some(ref mut node) => {
            let side = match comparator.compare(&key, &node.key) {
                Ordering::Equal => return (Some(mem::replace(&mut node.value, value)), false),
                Ordering::Less => LEFT,
                Ordering::Greater => RIGHT,
            };
            let (old, grew) = insert(&mut node.children[side], key, value, comparator);
            if !grew {
                return (old, false);
            }
            node.balance += if side == LEFT { -1 } else { 1 };
            let balance = node.balance;
            match balance {
                0 => (old, false),
                -1 | 1 => (old, true),
                _ => {
                    rebalance(link);
                    (old, false)
                }
            }
        }
    }
}

/// Removes `key` below `link`. Returns the entry and whether the subtree got
/// shorter.
fn remove<K, V>(link: &mut Link<K, V>, key: &K, comparator: &Comparator<K>) -> Option<((K, V), bool)> {
    let node = link.as_mut()?;
    let side = match comparator.compare(key, &node.key) {
        Ordering::Equal => return unlink(link),
        Ordering::Less => LEFT,
        Ordering::Greater => RIGHT,
    };
    let (entry, shrank) = remove(&mut node.children[side], key, comparator)?;
    Some((entry, shrank && shrink(link, side)))
}

/// Removes the node at `link` itself. A node with two children takes over the
/// entry of its in-order successor instead.
fn unlink<K, V>(link: &mut Link<K, V>) -> Option<((K, V), bool)> {
    let node = link.as_mut()?;
    if node.children[LEFT].is_some() && node.children[RIGHT].is_some() {
        let ((key, value), shrank) = remove_min(&mut node.children[RIGHT])?;
        let entry = (mem::replace(&mut node.key, key), mem::replace(&mut node.value, value));
        return Some((entry, shrank && shrink(link, RIGHT)));
    }
    let mut node = link.take()?;
    *link = node.children[LEFT].take().or_else(|| node.children[RIGHT].take());
    let Node { key, value, .. } = *node;
    Some(((key, value), true))
}

fn remove_min<K, V>(link: &mut Link<K, V>) -> Option<((K, V), bool)> {
    let node = link.as_mut()?;
    if node.children[LEFT].is_some() {
        let (entry, shrank) = remove_min(&mut node.children[LEFT])?;
        return Some((entry, shrank && shrink(link, LEFT)));
    }
    let mut node = link.take()?;
    *link = node.children[RIGHT].take();
    let Node { key, value, .. } = *node;
    Some(((key, value), true))
}

/// Adjusts `link` after its `side` subtree got shorter. Returns whether
/// `link` itself got shorter.
fn shrink<K, V>(link: &mut Link<K, V>, side: usize) -> bool {
    let Some(node) = link.as_mut() else {
        return false;
    };
    node.balance += if side == LEFT { 1 } else { -1 };
    let balance = node.balance;
    match balance {
        0 => true,
        -1 | 1 => false,
        _ => rebalance(link),
    }
}

/// Restores the balance of a node leaning by two. Returns whether the
/// subtree got shorter.
fn rebalance<K, V>(link: &mut Link<K, V>) -> bool {
    let Some(node) = link.as_mut() else {
        return false;
    };
    let heavy = if node.balance > 0 { RIGHT } else { LEFT };
    let sign: i8 = if heavy == RIGHT { 1 } else { -1 };
    let Some(child) = node.children[heavy].as_mut() else {
        return false;
    };

    let child_balance = child.balance;
    if child_balance == 0 {
        // Only reachable on removal; the height is unchanged.
        child.balance = -sign;
        node.balance = sign;
        rotate(link, heavy);
        return false;
    }
    if child_balance == sign {
        child.balance = 0;
        node.balance = 0;
        rotate(link, heavy);
        return true;
    }

    let Some(grandchild) = child.children[1 - heavy].as_mut() else {
        return false;
    };
    let grandchild_balance = grandchild.balance;
    grandchild.balance = 0;
    child.balance = if grandchild_balance == -sign { sign } else { 0 };
    node.balance = if grandchild_balance == sign { -sign } else { 0 };
    rotate(&mut node.children[heavy], 1 - heavy);
    rotate(link, heavy);
    true
}

/// Lifts the `side` child of `link` into its place.
fn rotate<K, V>(link: &mut Link<K, V>, side: usize) {
    let Some(mut node) = link.take() else {
        return;
    };
    let Some(mut pivot) = node.children[side].take() else {
        *link = Some(node);
        return;
    };
    node.children[side] = pivot.children[1 - side].take();
    pivot.children[1 - side] = Some(node);
    *link = Some(pivot);
}
