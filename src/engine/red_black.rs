use core::cmp::Ordering;
use core::fmt;
use core::mem;
use std::sync::OnceLock;

use log::debug;
use smallvec::SmallVec;

use super::arena::{Arena, Handle};
use super::{Engine, LEFT, Order, RIGHT, render_rotated};
use crate::Comparator;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    parent: Option<Handle>,
    children: [Option<Handle>; 2],
}

/// A red-black tree.
///
/// The root is black, no red node has a red child, and every path from the
/// root to a missing child crosses the same number of black nodes.
///
/// A tree made with [`Default`] has no comparator yet. The natural order of
/// `K` is installed on first use unless
/// [`set_comparator`](RedBlack::set_comparator) supplies one before that.
#[derive(Clone)]
pub struct RedBlack<K, V> {
    nodes: Arena<Node<K, V>>,
    root: Option<Handle>,
    comparator: OnceLock<Comparator<K>>,
    init: fn() -> Comparator<K>,
}

impl<K, V> RedBlack<K, V> {
    pub fn new(comparator: Comparator<K>) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            comparator: OnceLock::from(comparator),
            init: missing_comparator,
        }
    }

    /// Returns `true` once a comparator is installed. Every engine operation
    /// installs the natural order first if none is set yet.
    pub fn is_initialized(&self) -> bool {
        self.comparator.get().is_some()
    }

    /// Installs `comparator`, re-sorting any entries already stored.
    pub fn set_comparator(&mut self, comparator: Comparator<K>) {
        if self.root.is_none() {
            debug!("red-black tree comparator installed");
            self.comparator = OnceLock::from(comparator);
            return;
        }

        let handles = self.handles();
        debug!("red-black tree comparator replaced, re-sorting {} entries", handles.len());
        let entries: Vec<(K, V)> = handles
            .into_iter()
            .map(|handle| {
                let node = self.nodes.take(handle);
                (node.key, node.value)
            })
            .collect();
        self.nodes.clear();
        self.root = None;
        self.comparator = OnceLock::from(comparator);
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    fn resolve(&self) -> &Comparator<K> {
        resolve(&self.comparator, self.init)
    }

    fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    fn child(&self, handle: Handle, side: usize) -> Option<Handle> {
        self.node(handle).children[side]
    }

    fn parent(&self, handle: Handle) -> Option<Handle> {
        self.node(handle).parent
    }

    /// Missing children count as black.
    fn color(&self, handle: Option<Handle>) -> Color {
        handle.map_or(Color::Black, |handle| self.node(handle).color)
    }

    fn paint(&mut self, handle: Handle, color: Color) {
        self.nodes.get_mut(handle).color = color;
    }

    /// Which child slot of `parent` holds `handle`.
    fn side_of(&self, handle: Handle, parent: Handle) -> usize {
        if self.child(parent, LEFT) == Some(handle) { LEFT } else { RIGHT }
    }

    fn lookup(&self, key: &K) -> Option<Handle> {
        let comparator = self.resolve();
        let mut cursor = self.root;
        while let Some(handle) = cursor {
            let node = self.node(handle);
            cursor = match comparator.compare(key, &node.key) {
                Ordering::Equal => return Some(handle),
                Ordering::Less => node.children[LEFT],
                Ordering::Greater => node.children[RIGHT],
            };
        }
        None
    }

    fn extreme(&self, mut handle: Handle, side: usize) -> Handle {
        while let Some(child) = self.child(handle, side) {
            handle = child;
        }
        handle
    }

    fn entry(&self, handle: Handle) -> (&K, &V) {
        let node = self.node(handle);
        (&node.key, &node.value)
    }

    /// Handles in ascending key order.
    fn handles(&self) -> Vec<Handle> {
        let mut handles = Vec::with_capacity(self.nodes.len());
        let mut stack: SmallVec<[Handle; 32]> = SmallVec::new();
        let mut cursor = self.root;
        loop {
            while let Some(handle) = cursor {
                stack.push(handle);
                cursor = self.child(handle, LEFT);
            }
            let Some(handle) = stack.pop() else {
                return handles;
            };
            handles.push(handle);
            cursor = self.child(handle, RIGHT);
        }
    }

    fn bound(&self, key: &K, below: bool) -> Option<(&K, &V)> {
        let comparator = self.resolve();
        let mut best = None;
        let mut cursor = self.root;
        while let Some(handle) = cursor {
            let node = self.node(handle);
            match comparator.compare(key, &node.key) {
                Ordering::Equal => return Some((&node.key, &node.value)),
                Ordering::Less => {
                    if !below {
                        best = Some(handle);
                    }
                    cursor = node.children[LEFT];
                }
                Ordering::Greater => {
                    if below {
                        best = Some(handle);
                    }
                    cursor = node.children[RIGHT];
                }
            }
        }
        best.map(|handle| self.entry(handle))
    }

    /// Points whatever referenced `old` from above at `new` instead.
    fn relink(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.side_of(old, parent);
                self.nodes.get_mut(parent).children[side] = new;
            }
        }
        if let Some(new) = new {
            self.nodes.get_mut(new).parent = parent;
        }
    }

    /// Moves `handle` down to its `side`; the child on the other side takes
    /// its place.
    fn rotate(&mut self, handle: Handle, side: usize) {
        let other = 1 - side;
        let Some(pivot) = self.child(handle, other) else {
            return;
        };
        let inner = self.child(pivot, side);
        self.nodes.get_mut(handle).children[other] = inner;
        if let Some(inner) = inner {
            self.nodes.get_mut(inner).parent = Some(handle);
        }
        let parent = self.parent(handle);
        self.relink(parent, handle, Some(pivot));
        self.nodes.get_mut(pivot).children[side] = Some(handle);
        self.nodes.get_mut(handle).parent = Some(pivot);
    }

    fn insert_fixup(&mut self, mut handle: Handle) {
        while let Some(parent) = self.parent(handle) {
            if self.color(Some(parent)) == Color::Black {
                break;
            }
            let Some(grandparent) = self.parent(parent) else {
                break;
            };
            let side = self.side_of(parent, grandparent);
            let uncle = self.child(grandparent, 1 - side);

            if let Some(uncle) = uncle.filter(|&uncle| self.color(Some(uncle)) == Color::Red) {
                self.paint(parent, Color::Black);
                self.paint(uncle, Color::Black);
                self.paint(grandparent, Color::Red);
                handle = grandparent;
                continue;
            }

            let mut parent = parent;
            if self.side_of(handle, parent) != side {
                self.rotate(parent, side);
                mem::swap(&mut handle, &mut parent);
            }
            self.paint(parent, Color::Black);
            self.paint(grandparent, Color::Red);
            self.rotate(grandparent, 1 - side);
            break;
        }
        if let Some(root) = self.root {
            self.paint(root, Color::Black);
        }
    }

    /// Unlinks a node with at most one child and restores the colors.
    fn unlink(&mut self, handle: Handle) -> (K, V) {
        let child = self.child(handle, LEFT).or(self.child(handle, RIGHT));
        let parent = self.parent(handle);
        self.relink(parent, handle, child);
        let node = self.nodes.take(handle);
        if node.color == Color::Black {
            match child {
                Some(child) if self.color(Some(child)) == Color::Red => self.paint(child, Color::Black),
                _ => self.remove_fixup(child, parent),
            }
        }
        (node.key, node.value)
    }

    /// Repairs the black height after a black node left the path through
    /// `current`, which hangs below `parent`.
    fn remove_fixup(&mut self, mut current: Option<Handle>, mut parent: Option<Handle>) {
        while current != self.root && self.color(current) == Color::Black {
            let Some(above) = parent else {
                break;
            };
            let side = if self.child(above, LEFT) == current { LEFT } else { RIGHT };
            let other = 1 - side;
            let Some(mut sibling) = self.child(above, other) else {
                break;
            };

            if self.color(Some(sibling)) == Color::Red {
                self.paint(sibling, Color::Black);
                self.paint(above, Color::Red);
                self.rotate(above, side);
                match self.child(above, other) {
                    Some(next) => sibling = next,
                    None => break,
                }
            }

            let near = self.child(sibling, side);
            let far = self.child(sibling, other);
            if self.color(near) == Color::Black && self.color(far) == Color::Black {
                self.paint(sibling, Color::Red);
                current = Some(above);
                parent = self.parent(above);
                continue;
            }

            if self.color(far) == Color::Black {
                if let Some(near) = near {
                    self.paint(near, Color::Black);
                }
                self.paint(sibling, Color::Red);
                self.rotate(sibling, other);
                match self.child(above, other) {
                    Some(next) => sibling = next,
                    None => break,
                }
            }

            let above_color = self.node(above).color;
            self.paint(sibling, above_color);
            self.paint(above, Color::Black);
            if let Some(far) = self.child(sibling, other) {
                self.paint(far, Color::Black);
            }
            self.rotate(above, side);
            current = self.root;
            break;
        }
        if let Some(current) = current {
            self.paint(current, Color::Black);
        }
    }
}

impl<K: Ord, V> Default for RedBlack<K, V> {
    fn default() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            comparator: OnceLock::new(),
            init: Comparator::natural,
        }
    }
}

fn resolve<K>(comparator: &OnceLock<Comparator<K>>, init: fn() -> Comparator<K>) -> &Comparator<K> {
    comparator.get_or_init(|| {
        debug!("red-black tree initialized lazily with the natural comparator");
        init()
    })
}

fn missing_comparator<K>() -> Comparator<K> {
    unreachable!("red-black tree built with `new` always carries a comparator")
}

impl<K, V> Engine<K, V> for RedBlack<K, V> {
    type Rebind<K2, V2> = RedBlack<K2, V2>;

    fn len(&self) -> usize {
        self.resolve();
        self.nodes.len()
    }

    fn get(&self, key: &K) -> Option<(&K, &V)> {
        self.lookup(key).map(|handle| self.entry(handle))
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        let comparator = resolve(&self.comparator, self.init);
        let mut parent = None;
        let mut side = LEFT;
        let mut cursor = self.root;
        while let Some(handle) = cursor {
            let node = self.nodes.get_mut(handle);
            side = match comparator.compare(&key, &node.key) {
                Ordering::Equal => return Some(mem::replace(&mut node.value, value)),
                Ordering::Less => LEFT,
                Ordering::Greater => RIGHT,
            };
            parent = Some(handle);
            cursor = node.children[side];
        }

        let handle = self.nodes.alloc(Node {
            key,
            value,
            color: Color::Red,
            parent,
            children: [None, None],
        });
        match parent {
            None => self.root = Some(handle),
            Some(parent) => self.nodes.get_mut(parent).children[side] = Some(handle),
        }
        self.insert_fixup(handle);
        None
    }

    fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let handle = self.lookup(key)?;
        if let Some(left) = self.child(handle, LEFT)
            && self.child(handle, RIGHT).is_some()
        {
            let predecessor = self.extreme(left, RIGHT);
            let (node, other) = self.nodes.get2_mut(handle, predecessor);
            mem::swap(&mut node.key, &mut other.key);
            mem::swap(&mut node.value, &mut other.value);
            return Some(self.unlink(predecessor));
        }
        Some(self.unlink(handle))
    }

    fn clear(&mut self) {
        self.resolve();
        self.nodes.clear();
        self.root = None;
    }

    fn first(&self) -> Option<(&K, &V)> {
        self.resolve();
        self.root.map(|root| self.entry(self.extreme(root, LEFT)))
    }

    fn last(&self) -> Option<(&K, &V)> {
        self.resolve();
        self.root.map(|root| self.entry(self.extreme(root, RIGHT)))
    }

    fn floor(&self, key: &K) -> Option<(&K, &V)> {
        self.bound(key, true)
    }

    fn ceiling(&self, key: &K) -> Option<(&K, &V)> {
        self.bound(key, false)
    }

    fn visit(&self, order: Order, from: Option<&K>, f: &mut dyn FnMut(&K, &V) -> bool) {
        let comparator = self.resolve();
        let (near, far) = (order.near(), order.far());
        let mut stack: SmallVec<[Handle; 32]> = SmallVec::new();
        let mut cursor = self.root;

        if let Some(key) = from {
            loop {
                let Some(handle) = cursor else { return };
                let side = match comparator.compare(key, &self.node(handle).key) {
                    Ordering::Equal => {
                        stack.push(handle);
                        break;
                    }
                    Ordering::Less => LEFT,
                    Ordering::Greater => RIGHT,
                };
                if side == near {
                    stack.push(handle);
                }
                cursor = self.child(handle, side);
            }
        } else {
            while let Some(handle) = cursor {
                stack.push(handle);
                cursor = self.child(handle, near);
            }
        }

        while let Some(handle) = stack.pop() {
            let (key, value) = self.entry(handle);
            if !f(key, value) {
                return;
            }
            let mut cursor = self.child(handle, far);
            while let Some(child) = cursor {
                stack.push(child);
                cursor = self.child(child, near);
            }
        }
    }

    fn comparator(&self) -> Comparator<K> {
        self.resolve().clone()
    }

    fn empty(&self) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            comparator: self.comparator.clone(),
            init: self.init,
        }
    }

    fn rebind<K2, V2>(&self, comparator: Comparator<K2>) -> RedBlack<K2, V2> {
        RedBlack::new(comparator)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        K: fmt::Display,
    {
        self.resolve();
        let Some(root) = self.root else {
            return Ok(());
        };
        render_rotated(
            f,
            root,
            &mut String::new(),
            true,
            &|handle| [self.child(handle, LEFT), self.child(handle, RIGHT)],
            &|handle, f| write!(f, "{}", self.node(handle).key),
        )
    }
}
