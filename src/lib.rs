//! arbordb - a disk-backed B+tree index engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        arbordb                          │
//! ├─────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/)                │   │
//! │  │   BTreeIndex: search · insert · delete · scan    │   │
//! │  └─────────────────────────────────────────────────┘   │
//! │                          ↓                              │
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │             Buffer Pool (buffer/)                │   │
//! │  │   BufferPool + Frame + RAII pins + LRU + Stats   │   │
//! │  └─────────────────────────────────────────────────┘   │
//! │                          ↓                              │
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │            Storage Layer (storage/)              │   │
//! │  │              PageFile + Page (4KB)               │   │
//! │  └─────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Rid, Key, Error, config)
//! - [`storage`] - Disk I/O and the raw page type
//! - [`buffer`] - Buffer pool management with pin-based residency
//! - [`index`] - The B+tree itself
//!
//! # Quick Start
//! ```no_run
//! use arbordb::{BTreeIndex, Key, KeyType, Rid};
//!
//! BTreeIndex::create("people.idx", KeyType::Int, 64)?;
//!
//! let mut index = BTreeIndex::open("people.idx")?;
//! index.insert(Key::Int(7), Rid::new(3, 1))?;
//!
//! let mut cursor = index.scan();
//! while let Some(rid) = cursor.next()? {
//!     println!("{rid}");
//! }
//! drop(cursor);
//!
//! index.close()?;
//! # Ok::<(), arbordb::Error>(())
//! ```

// Core modules
pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, Key, KeyType, PageId, Result, Rid};

pub use buffer::{BufferPool, BufferPoolStats, PageReadGuard, PageWriteGuard, StatsSnapshot};
pub use index::{BTreeIndex, TreeScan};
pub use storage::{Page, PageFile};
