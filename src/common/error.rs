//! Error types for arbordb.

use thiserror::Error;

use crate::common::key::KeyType;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write
/// `Result<T>`. This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in arbordb.
///
/// By having a single error type, error handling stays consistent across
/// the storage, buffer and index layers. I/O errors from the page file
/// are passed through unmodified; everything else is a condition this
/// engine detects itself.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,

    /// The requested tree order does not fit a single page.
    ///
    /// Checked at index creation, before any file is written.
    #[error("order {order} too high for page size (max {max})")]
    OrderTooHigh { order: u32, max: u32 },

    /// Lookup or delete did not find the key.
    #[error("key not found")]
    KeyNotFound,

    /// Insert of a key that is already present.
    #[error("key already exists")]
    KeyAlreadyExists,

    /// A key of the wrong type was handed to a typed index.
    #[error("key type mismatch: index holds {expected:?} keys")]
    KeyTypeMismatch { expected: KeyType },

    /// A text key wider than the fixed on-disk encoding.
    #[error("text key exceeds {0} bytes")]
    KeyTooLong(usize),

    /// The index file does not decode to a valid tree.
    #[error("index file is corrupted: {0}")]
    Corrupted(&'static str),
}
