//! Index structures.
//!
//! Currently one index type: the disk-backed B+tree in [`btree`].

pub mod btree;

pub use btree::{BTreeIndex, TreeScan};
