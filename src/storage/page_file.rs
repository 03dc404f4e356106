//! Page file - low-level file I/O for index pages.
//!
//! A [`PageFile`] owns the single file an index is persisted in and
//! handles all direct operations on it: reading and writing pages,
//! appending new ones, and removing the file when an index is
//! destroyed.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single index file.
///
/// # File Layout
/// Pages are laid out sequentially; page N lives at file offset
/// `N × PAGE_SIZE`:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ header  │  node   │         │  node   │
/// └─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// # Thread Safety
/// `PageFile` is single-threaded. The [`BufferPool`] serializes access
/// to it behind a mutex.
///
/// # Durability
/// All writes are followed by `fsync()`. The engine has no write-ahead
/// log, so flushing eagerly is the only durability it offers.
///
/// [`BufferPool`]: crate::buffer::BufferPool
pub struct PageFile {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
}

impl PageFile {
    /// Create a new index file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
        })
    }

    /// Open an existing index file.
    ///
    /// The page count is computed from the file size.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let metadata = file.metadata()?;
        let page_count = (metadata.len() / PAGE_SIZE as u64) as u32;

        Ok(Self { file, page_count })
    }

    /// Remove an index file from disk.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be removed.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a page to disk, followed by `fsync()`.
    ///
    /// The page must have been previously allocated with
    /// [`append_page`](Self::append_page).
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Append a new zeroed page to the end of the file.
    ///
    /// Returns the `PageId` of the newly allocated page.
    pub fn append_page(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.page_count);

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let zeros = [0u8; PAGE_SIZE];
        self.file.write_all(&zeros)?;
        self.file.sync_all()?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Get the number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let pf = PageFile::create(&path).unwrap();
        assert_eq!(pf.page_count(), 0);
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        PageFile::create(&path).unwrap();
        assert!(PageFile::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(PageFile::open(dir.path().join("missing.idx")).is_err());
    }

    #[test]
    fn test_append_write_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let mut pf = PageFile::create(&path).unwrap();

        let page_id = pf.append_page().unwrap();
        assert_eq!(page_id, PageId::new(0));

        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xAB;
        page.as_mut_slice()[4095] = 0xEF;
        pf.write_page(page_id, &page).unwrap();

        let read_back = pf.read_page(page_id).unwrap();
        assert_eq!(read_back.as_slice()[0], 0xAB);
        assert_eq!(read_back.as_slice()[4095], 0xEF);
    }

    #[test]
    fn test_page_count_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let mut pf = PageFile::create(&path).unwrap();
            for _ in 0..3 {
                pf.append_page().unwrap();
            }
        }

        let pf = PageFile::open(&path).unwrap();
        assert_eq!(pf.page_count(), 3);
    }

    #[test]
    fn test_read_unallocated_page_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let mut pf = PageFile::create(&path).unwrap();
        pf.append_page().unwrap();

        assert!(matches!(
            pf.read_page(PageId::new(1)),
            Err(Error::PageNotFound(1))
        ));
    }

    #[test]
    fn test_destroy_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        PageFile::create(&path).unwrap();
        PageFile::destroy(&path).unwrap();
        assert!(!path.exists());
        assert!(PageFile::destroy(&path).is_err());
    }
}
