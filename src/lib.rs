//! Ordered maps over three balanced search tree engines.
//!
//! [`AvlTree`], [`BTree`] and [`RedBlackTree`] share one map API ([`Tree`]):
//! keys are ordered by a caller-supplied [`Comparator`], every operation takes
//! `&self`, and a tree built with `safe` set can be shared between threads.
//!
//! # Example
//!
//! ```
//! use gtree::{AvlTree, BTree, Comparator, Entry};
//!
//! let scores: AvlTree<&str, u32> = AvlTree::new(Comparator::natural());
//! scores.set("Carol", 92);
//! scores.set("Alice", 100);
//! scores.set("Bob", 85);
//!
//! assert_eq!(scores.keys(), vec!["Alice", "Bob", "Carol"]);
//! assert_eq!(scores.left(), Some(Entry::new("Alice", 100)));
//! assert_eq!(scores.ceiling(&"Bz"), Some(Entry::new("Carol", 92)));
//!
//! // Same API, different engine: a B-tree of order 4, largest key first.
//! let desc = BTree::new(4, Comparator::<i32>::natural().reverse());
//! desc.sets((1..=5).map(|n| (n, n * n)));
//! assert_eq!(desc.keys(), vec![5, 4, 3, 2, 1]);
//! ```
//!
//! # Features
//!
//! - **Three engines** - AVL, B-tree of any order `m >= 3`, and red-black with
//!   a lazily initialized comparator
//! - **Optional locking** - `safe` trees serialize writers behind a
//!   reader-writer lock; unsafe trees skip it
//! - **Get-or-compute** - `get_or_set_func_lock` runs its callback at most
//!   once under contention
//! - **JSON** - trees serialize as objects in key order
//! - **Dynamic trees** - [`VarTree`] maps any JSON value to any JSON value

// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod avl_tree;
mod btree;
mod comparator;
mod entry;
mod error;
mod red_black_tree;
mod rwmutex;
mod slot;
mod tree;
mod var;

pub mod engine;

pub use avl_tree::AvlTree;
pub use btree::BTree;
pub use comparator::{Comparator, var_int, var_natural, var_string};
pub use entry::Entry;
pub use error::{Error, Result};
pub use red_black_tree::RedBlackTree;
pub use rwmutex::RwMutex;
pub use slot::Slot;
pub use tree::{KeyIndex, Tree};
pub use var::{Var, VarAvlTree, VarBTree, VarRedBlackTree, VarTree};
