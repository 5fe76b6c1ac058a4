//! Height-balanced ordered collections backed by an index arena.
//!
//! The nodes of the tree live in a slab arena and refer to each other through
//! copyable handles, so the parent/child pointer web of a classic AVL tree
//! needs no reference counting and no unsafe code.

#[macro_use]
extern crate serde_derive;

mod entry;
pub mod arena;
pub mod avl_tree;
