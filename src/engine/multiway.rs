use core::fmt;
use core::mem;

use log::trace;
use smallvec::SmallVec;

use super::arena::{Arena, Handle};
use super::{Engine, Order};
use crate::{Comparator, Error, Result};

/// Nodes visited on the way down and the child index taken at each of them.
type Path = SmallVec<[(Handle, usize); 16]>;

#[derive(Clone)]
struct Node<K, V> {
    entries: Vec<(K, V)>,
    /// Empty for leaves; otherwise one more than `entries`.
    children: Vec<Handle>,
}

impl<K, V> Node<K, V> {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// How a subtree is entered during a walk.
#[derive(Clone, Copy)]
enum Descent {
    Whole,
    FromKey,
    Skip,
}

/// A B-tree of order `m`.
///
/// Every node holds at most `m - 1` entries and every node except the root at
/// least `ceil(m / 2) - 1`. All leaves sit at the same depth. Inserting into a
/// full node splits it around its median, which moves up into the parent;
/// removing from a node at the minimum borrows from a sibling or merges with
/// one.
#[derive(Clone)]
pub struct Multiway<K, V> {
    nodes: Arena<Node<K, V>>,
    root: Option<Handle>,
    len: usize,
    order: usize,
    comparator: Comparator<K>,
}

impl<K, V> Multiway<K, V> {
    /// Creates an empty tree whose nodes have at most `order` children.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] if `order < 3`.
    pub fn try_new(order: usize, comparator: Comparator<K>) -> Result<Self> {
        if order < 3 {
            return Err(Error::InvalidOrder(order));
        }
        Ok(Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            order,
            comparator,
        })
    }

    /// Creates an empty tree whose nodes have at most `order` children.
    ///
    /// # Panics
    ///
    /// Panics if `order < 3`.
    pub fn new(order: usize, comparator: Comparator<K>) -> Self {
        match Self::try_new(order, comparator) {
            Ok(tree) => tree,
            Err(error) => panic!("{error}"),
        }
    }

    /// Maximum number of children per node.
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Number of levels; zero for an empty tree.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut cursor = self.root;
        while let Some(handle) = cursor {
            height += 1;
            cursor = self.nodes.get(handle).children.first().copied();
        }
        height
    }

    const fn max_entries(&self) -> usize {
        self.order - 1
    }

    const fn min_entries(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    fn search(&self, node: &Node<K, V>, key: &K) -> core::result::Result<usize, usize> {
        node.entries.binary_search_by(|(probe, _)| self.comparator.compare(probe, key))
    }

    fn locate(&self, key: &K) -> Option<(Handle, usize)> {
        let mut handle = self.root?;
        loop {
            let node = self.nodes.get(handle);
            match self.search(node, key) {
                Ok(index) => return Some((handle, index)),
                Err(_) if node.is_leaf() => return None,
                Err(index) => handle = node.children[index],
            }
        }
    }

    fn entry(&self, handle: Handle, index: usize) -> (&K, &V) {
        let (key, value) = &self.nodes.get(handle).entries[index];
        (key, value)
    }

    /// The leaf reached by always taking the first (or last) child.
    fn edge_leaf(&self, last: bool) -> Option<Handle> {
        let mut handle = self.root?;
        loop {
            let node = self.nodes.get(handle);
            let next = if last { node.children.last() } else { node.children.first() };
            match next {
                Some(&child) => handle = child,
                None => return Some(handle),
            }
        }
    }

    fn bound(&self, key: &K, below: bool) -> Option<(&K, &V)> {
        let mut best = None;
        let mut cursor = self.root;
        while let Some(handle) = cursor {
            let node = self.nodes.get(handle);
            match self.search(node, key) {
                Ok(index) => return Some(self.entry(handle, index)),
                Err(index) => {
                    if below && index > 0 {
                        best = Some((handle, index - 1));
                    } else if !below && index < node.entries.len() {
                        best = Some((handle, index));
                    }
                    cursor = node.children.get(index).copied();
                }
            }
        }
        best.map(|(handle, index)| self.entry(handle, index))
    }

    /// Splits overfull nodes from `handle` upwards.
    fn split(&mut self, mut handle: Handle, mut path: Path) {
        let middle = (self.order - 1) / 2;
        while self.nodes.get(handle).entries.len() > self.max_entries() {
            let node = self.nodes.get_mut(handle);
            let entries = node.entries.split_off(middle + 1);
            let children = if node.is_leaf() { Vec::new() } else { node.children.split_off(middle + 1) };
            let Some(median) = node.entries.pop() else {
                return;
            };
            let sibling = self.nodes.alloc(Node { entries, children });

            if let Some((parent, index)) = path.pop() {
                let parent_node = self.nodes.get_mut(parent);
                parent_node.entries.insert(index, median);
                parent_node.children.insert(index + 1, sibling);
                handle = parent;
            } else {
                let root = self.nodes.alloc(Node {
                    entries: vec![median],
                    children: vec![handle, sibling],
                });
                self.root = Some(root);
                trace!("B-tree root split, height now {}", self.height());
                return;
            }
        }
    }

    /// Refills underfull nodes from `handle` upwards and drops an empty root.
    fn rebalance(&mut self, mut handle: Handle, mut path: Path) {
        let min = self.min_entries();
        while let Some((parent, index)) = path.pop() {
            if self.nodes.get(handle).entries.len() >= min {
                return;
            }
            let siblings = self.nodes.get(parent).children.len();

            if index > 0 {
                let left = self.nodes.get(parent).children[index - 1];
                if self.nodes.get(left).entries.len() > min {
                    self.rotate_right(parent, index - 1);
                    return;
                }
            }
            if index + 1 < siblings {
                let right = self.nodes.get(parent).children[index + 1];
                if self.nodes.get(right).entries.len() > min {
                    self.rotate_left(parent, index);
                    return;
                }
            }

            if index + 1 < siblings {
                self.merge(parent, index);
            } else {
                self.merge(parent, index - 1);
            }
            handle = parent;
        }

        let root = self.nodes.get(handle);
        if root.entries.is_empty() {
            let child = root.children.first().copied();
            self.nodes.take(handle);
            self.root = child;
            if child.is_some() {
                trace!("B-tree root collapsed, height now {}", self.height());
            }
        }
    }

    /// Moves the last entry of child `index` up into the parent and the
    /// separator down into child `index + 1`.
    fn rotate_right(&mut self, parent: Handle, index: usize) {
        let (left, right) = {
            let node = self.nodes.get(parent);
            (node.children[index], node.children[index + 1])
        };
        let left_node = self.nodes.get_mut(left);
        let Some(entry) = left_node.entries.pop() else {
            return;
        };
        let child = left_node.children.pop();
        let separator = mem::replace(&mut self.nodes.get_mut(parent).entries[index], entry);
        let right_node = self.nodes.get_mut(right);
        right_node.entries.insert(0, separator);
        if let Some(child) = child {
            right_node.children.insert(0, child);
        }
    }

    /// Moves the first entry of child `index + 1` up into the parent and the
    /// separator down into child `index`.
    fn rotate_left(&mut self, parent: Handle, index: usize) {
        let (left, right) = {
            let node = self.nodes.get(parent);
            (node.children[index], node.children[index + 1])
        };
        let right_node = self.nodes.get_mut(right);
        if right_node.entries.is_empty() {
            return;
        }
        let entry = right_node.entries.remove(0);
        let child = if right_node.is_leaf() { None } else { Some(right_node.children.remove(0)) };
        let separator = mem::replace(&mut self.nodes.get_mut(parent).entries[index], entry);
        let left_node = self.nodes.get_mut(left);
        left_node.entries.push(separator);
        left_node.children.extend(child);
    }

    /// Folds child `index + 1` and the separator between them into child
    /// `index`.
    fn merge(&mut self, parent: Handle, index: usize) {
        let parent_node = self.nodes.get_mut(parent);
        let separator = parent_node.entries.remove(index);
        let right = parent_node.children.remove(index + 1);
        let left = parent_node.children[index];
        let right_node = self.nodes.take(right);
        let left_node = self.nodes.get_mut(left);
        left_node.entries.push(separator);
        left_node.entries.extend(right_node.entries);
        left_node.children.extend(right_node.children);
    }

    /// Walks the subtree at `handle`; returns `false` once `f` asks to stop.
    fn walk(&self, handle: Handle, order: Order, from: Option<&K>, descent: Descent, f: &mut dyn FnMut(&K, &V) -> bool) -> bool {
        let node = self.nodes.get(handle);
        let count = node.entries.len();
        let (start, mut descent) = match (descent, from) {
            (Descent::FromKey, Some(key)) => match (self.search(node, key), order) {
                (Ok(index), Order::Asc) => (index, Descent::Skip),
                (Ok(index), Order::Desc) => (index + 1, Descent::Skip),
                (Err(index), _) => (index, Descent::FromKey),
            },
            _ => match order {
                Order::Asc => (0, Descent::Whole),
                Order::Desc => (count, Descent::Whole),
            },
        };

        // Position `i` stands for child `i` followed (ascending) or preceded
        // (descending) by entry `i`.
        let span = match order {
            Order::Asc => count - start,
            Order::Desc => start,
        };
        for step in 0..=span {
            let position = match order {
                Order::Asc => start + step,
                Order::Desc => start - step,
            };
            if let (Some(&child), Descent::Whole | Descent::FromKey) = (node.children.get(position), descent)
                && !self.walk(child, order, from, descent, f)
            {
                return false;
            }
            descent = Descent::Whole;

            let entry = match order {
                Order::Asc => node.entries.get(position),
                Order::Desc => position.checked_sub(1).and_then(|index| node.entries.get(index)),
            };
            if let Some((key, value)) = entry
                && !f(key, value)
            {
                return false;
            }
        }
        true
    }

    fn write_level(&self, f: &mut fmt::Formatter<'_>, handle: Handle, level: usize) -> fmt::Result
    where
        K: fmt::Display,
    {
        let node = self.nodes.get(handle);
        for position in 0..=node.entries.len() {
            if let Some(&child) = node.children.get(position) {
                self.write_level(f, child, level + 1)?;
            }
            if let Some((key, _)) = node.entries.get(position) {
                writeln!(f, "{:indent$}{key}", "", indent = level * 4)?;
            }
        }
        Ok(())
    }
}

impl<K, V> Engine<K, V> for Multiway<K, V> {
    type Rebind<K2, V2> = Multiway<K2, V2>;

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, key: &K) -> Option<(&K, &V)> {
        self.locate(key).map(|(handle, index)| self.entry(handle, index))
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(mut handle) = self.root else {
            let root = self.nodes.alloc(Node {
                entries: vec![(key, value)],
                children: Vec::new(),
            });
            self.root = Some(root);
            self.len = 1;
            return None;
        };

        let mut path = Path::new();
        loop {
            let node = self.nodes.get_mut(handle);
            match node.entries.binary_search_by(|(probe, _)| self.comparator.compare(probe, &key)) {
                Ok(index) => return Some(mem::replace(&mut node.entries[index].1, value)),
                Err(index) if node.is_leaf() => {
                    node.entries.insert(index, (key, value));
                    break;
                }
                Err(index) => {
                    path.push((handle, index));
                    handle = node.children[index];
                }
            }
        }
        self.len += 1;
        self.split(handle, path);
        None
    }

    fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let mut path = Path::new();
        let mut handle = self.root?;
        let index = loop {
            let node = self.nodes.get(handle);
            match self.search(node, key) {
                Ok(index) => break index,
                Err(_) if node.is_leaf() => return None,
                Err(index) => {
                    path.push((handle, index));
                    handle = node.children[index];
                }
            }
        };

        let removed = if self.nodes.get(handle).is_leaf() {
            self.nodes.get_mut(handle).entries.remove(index)
        } else {
            // Replace with the largest entry of the left subtree, then fix up
            // the leaf it came from.
            path.push((handle, index));
            let mut leaf = self.nodes.get(handle).children[index];
            while let Some(&last) = self.nodes.get(leaf).children.last() {
                path.push((leaf, self.nodes.get(leaf).children.len() - 1));
                leaf = last;
            }
            let predecessor = self
                .nodes
                .get_mut(leaf)
                .entries
                .pop()
                .expect("`Multiway::remove()` - non-root leaf is empty!");
            let removed = mem::replace(&mut self.nodes.get_mut(handle).entries[index], predecessor);
            handle = leaf;
            removed
        };

        self.len -= 1;
        self.rebalance(handle, path);
        Some(removed)
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    fn first(&self) -> Option<(&K, &V)> {
        let leaf = self.edge_leaf(false)?;
        let (key, value) = self.nodes.get(leaf).entries.first()?;
        Some((key, value))
    }

    fn last(&self) -> Option<(&K, &V)> {
        let leaf = self.edge_leaf(true)?;
        let (key, value) = self.nodes.get(leaf).entries.last()?;
        Some((key, value))
    }

    fn floor(&self, key: &K) -> Option<(&K, &V)> {
        self.bound(key, true)
    }

    fn ceiling(&self, key: &K) -> Option<(&K, &V)> {
        self.bound(key, false)
    }

    fn visit(&self, order: Order, from: Option<&K>, f: &mut dyn FnMut(&K, &V) -> bool) {
        let Some(root) = self.root else {
            return;
        };
        let descent = match from {
            Some(key) if self.locate(key).is_none() => return,
            Some(_) => Descent::FromKey,
            None => Descent::Whole,
        };
        self.walk(root, order, from, descent, f);
    }

    fn comparator(&self) -> Comparator<K> {
        self.comparator.clone()
    }

    fn empty(&self) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            order: self.order,
            comparator: self.comparator.clone(),
        }
    }

    fn rebind<K2, V2>(&self, comparator: Comparator<K2>) -> Multiway<K2, V2> {
        Multiway {
            nodes: Arena::new(),
            root: None,
            len: 0,
            order: self.order,
            comparator,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        K: fmt::Display,
    {
        match self.root {
            Some(root) => self.write_level(f, root, 0),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use core::cmp::Ordering;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    impl<K, V> Multiway<K, V> {
        /// Panics if node occupancy, leaf depth or key order is violated.
        pub(crate) fn validate_invariants(&self) {
            let Some(root) = self.root else {
                assert_eq!(self.len, 0, "empty tree with nonzero len");
                return;
            };
            let mut leaf_depth = None;
            let count = self.validate_node(root, 0, [None, None], &mut leaf_depth);
            assert_eq!(count, self.len, "len mismatch");
            assert_eq!(Some(self.height()), leaf_depth.map(|depth| depth + 1), "height mismatch");
        }

        fn validate_node(&self, handle: Handle, depth: usize, bounds: [Option<&K>; 2], leaf_depth: &mut Option<usize>) -> usize {
            let node = self.nodes.get(handle);
            let count = node.entries.len();
            assert!(count <= self.max_entries(), "node holds {count} entries, order {}", self.order);
            if Some(handle) != self.root {
                assert!(count >= self.min_entries(), "node holds {count} entries, order {}", self.order);
            }
            for pair in node.entries.windows(2) {
                assert_eq!(self.comparator.compare(&pair[0].0, &pair[1].0), Ordering::Less, "node entries unsorted");
            }
            if let (Some(low), Some((first, _))) = (bounds[0], node.entries.first()) {
                assert_eq!(self.comparator.compare(low, first), Ordering::Less, "key below its separator");
            }
            if let (Some(high), Some((last, _))) = (bounds[1], node.entries.last()) {
                assert_eq!(self.comparator.compare(last, high), Ordering::Less, "key above its separator");
            }

            if node.is_leaf() {
                match leaf_depth {
                    Some(expected) => assert_eq!(*expected, depth, "leaves at different depths"),
                    None => *leaf_depth = Some(depth),
                }
                return count;
            }

            assert_eq!(node.children.len(), count + 1, "child count mismatch");
            let mut total = count;
            for (position, &child) in node.children.iter().enumerate() {
                let low = position.checked_sub(1).map_or(bounds[0], |index| Some(&node.entries[index].0));
                let high = node.entries.get(position).map_or(bounds[1], |(key, _)| Some(key));
                total += self.validate_node(child, depth + 1, [low, high], leaf_depth);
            }
            total
        }
    }

    struct Show<'a, V>(&'a Multiway<String, V>);

    impl<V> fmt::Display for Show<'_, V> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.render(f)
        }
    }

    fn collect(tree: &Multiway<i32, i32>, order: Order, from: Option<&i32>) -> Vec<i32> {
        let mut keys = Vec::new();
        tree.visit(order, from, &mut |k, _| {
            keys.push(*k);
            true
        });
        keys
    }

    #[test]
    fn order_below_three_is_rejected() {
        assert!(matches!(Multiway::<i32, i32>::try_new(2, Comparator::natural()), Err(Error::InvalidOrder(2))));
        assert!(Multiway::<i32, i32>::try_new(3, Comparator::natural()).is_ok());
    }

    #[test]
    #[should_panic(expected = "invalid B-tree order 1")]
    fn new_panics_on_bad_order() {
        let _ = Multiway::<i32, i32>::new(1, Comparator::natural());
    }

    #[test]
    fn render_indents_by_level() {
        let mut tree = Multiway::new(3, Comparator::natural());
        for index in 0..6 {
            tree.insert(format!("key{index}"), index);
        }
        tree.validate_invariants();
        assert_eq!(tree.height(), 2);
        assert_eq!(Show(&tree).to_string(), "    key0\nkey1\n    key2\nkey3\n    key4\n    key5\n");
    }

    #[test]
    fn height_grows_and_shrinks_uniformly() {
        let mut tree = Multiway::new(3, Comparator::natural());
        assert_eq!(tree.height(), 0);
        for key in 0..100 {
            tree.insert(key, key);
            tree.validate_invariants();
        }
        assert!(tree.height() > 1);
        for key in 0..100 {
            assert_eq!(tree.remove(&key), Some((key, key)));
            tree.validate_invariants();
        }
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.first(), None);
    }

    #[test]
    fn visit_from_key_crosses_levels() {
        let mut tree = Multiway::new(4, Comparator::natural());
        for key in 0..50 {
            tree.insert(key, key);
        }
        assert_eq!(collect(&tree, Order::Asc, Some(&45)), vec![45, 46, 47, 48, 49]);
        assert_eq!(collect(&tree, Order::Desc, Some(&3)), vec![3, 2, 1, 0]);
        assert_eq!(collect(&tree, Order::Asc, Some(&50)), Vec::<i32>::new());
        assert_eq!(collect(&tree, Order::Asc, Some(&0)), (0..50).collect::<Vec<_>>());
        assert_eq!(collect(&tree, Order::Desc, Some(&49)), (0..50).rev().collect::<Vec<_>>());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..300).prop_map(Op::Insert),
            2 => (0i32..300).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn invariants_hold_after_operations(
            order in 3usize..8,
            ops in prop::collection::vec(op_strategy(), 0..500),
        ) {
            let mut tree = Multiway::new(order, Comparator::natural());
            let mut model = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        prop_assert_eq!(tree.insert(key, key * 2), model.insert(key, key * 2));
                    }
                    Op::Remove(key) => {
                        prop_assert_eq!(tree.remove(&key), model.remove_entry(&key));
                    }
                }
                tree.validate_invariants();
            }

            prop_assert_eq!(collect(&tree, Order::Asc, None), model.keys().copied().collect::<Vec<_>>());
            prop_assert_eq!(collect(&tree, Order::Desc, None), model.keys().rev().copied().collect::<Vec<_>>());
            prop_assert_eq!(tree.first(), model.first_key_value());
            prop_assert_eq!(tree.last(), model.last_key_value());
            for probe in [-1, 0, 150, 299, 300] {
                prop_assert_eq!(tree.floor(&probe), model.range(..=probe).next_back());
                prop_assert_eq!(tree.ceiling(&probe), model.range(probe..).next());
            }
        }
    }
}
