//! Configuration constants for arbordb.

/// Size of a page in bytes (4KB).
///
/// This matches the OS page size on most systems; every unit of disk I/O
/// and every B+tree node is exactly one page.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames an index handle's buffer pool holds.
///
/// 1000 frames × 4KB ≈ 4MB of cache per open index, which comfortably
/// covers the working set of the trees this engine targets.
pub const DEFAULT_POOL_SIZE: usize = 1000;

/// Sanity ceiling on tree height.
///
/// Descent and rebalance cascades are bounded by tree height; a
/// structure deeper than this is corrupted, not merely large.
pub const MAX_TREE_DEPTH: usize = 10_000;

/// Fixed width of an encoded text key in bytes.
///
/// Text keys are stored zero-padded to this width so that every entry
/// in a node has the same size.
pub const TEXT_KEY_LEN: usize = 16;
