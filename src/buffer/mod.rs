//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between the B+tree and
//! its page file. It manages a fixed pool of frames, each holding one
//! page, with pin-based residency and LRU eviction.
//!
//! # Components
//! - [`BufferPool`] - The page cache
//! - [`Frame`] - A slot in the pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII pins
//! - [`LruReplacer`] - Eviction policy
//! - [`BufferPoolStats`] - Performance statistics

mod frame;
mod guard;
mod lru;
mod pool;
mod stats;

pub use frame::Frame;
pub use guard::{PageReadGuard, PageWriteGuard};
pub use lru::LruReplacer;
pub use pool::BufferPool;
pub use stats::{BufferPoolStats, StatsSnapshot};
