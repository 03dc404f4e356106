//! Buffer pool - the page caching layer between the index and its file.
//!
//! The [`BufferPool`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting via RAII guards
//! - Automatic dirty page write-back on eviction and flush
//! - LRU eviction

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use parking_lot::{Mutex, RwLock};

use crate::buffer::lru::LruReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::PageFile;

/// Caches pages of a single index file in a fixed pool of frames.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                        BufferPool                           │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │  page_file   │      │
/// │  │ Vec<FrameId> │  │ LruReplacer  │  │    Mutex     │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Pinning
/// [`pin_read`](Self::pin_read) and [`pin_write`](Self::pin_write)
/// return guards; the page stays resident while a guard exists and is
/// unpinned when the guard drops. A write guard marks the page dirty on
/// drop; the pool writes dirty pages back on eviction and on
/// [`flush_all`](Self::flush_all).
///
/// # Usage
/// ```ignore
/// let pf = PageFile::create("tree.idx")?;
/// let pool = BufferPool::new(16, pf);
///
/// let mut guard = pool.append_page()?;       // allocate page on disk
/// guard.as_mut_slice()[0] = 0xAB;
/// drop(guard);                               // dirty, unpinned
///
/// let guard = pool.pin_read(PageId::new(0))?;
/// let data = guard.as_slice();
/// ```
pub struct BufferPool {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// Maps page IDs to frame IDs.
    page_table: RwLock<HashMap<PageId, FrameId>>,

    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,

    /// Eviction policy for selecting victim frames.
    replacer: Mutex<LruReplacer>,

    /// Handles all disk I/O.
    page_file: Mutex<PageFile>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,
}

impl BufferPool {
    /// Create a new buffer pool over an open page file.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, page_file: PageFile) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(LruReplacer::new()),
            page_file: Mutex::new(page_file),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: Pin pages
    // ========================================================================

    /// Pin a page for reading (shared access).
    ///
    /// If the page is already in the pool, returns immediately.
    /// Otherwise, loads the page from disk (possibly evicting another).
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn pin_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page for writing (exclusive access).
    ///
    /// Same as `pin_read`, but returns an exclusive guard. The page is
    /// automatically marked dirty when the guard drops.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn pin_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Append a new zeroed page to the file and pin it for writing.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from disk allocation
    pub fn append_page(&self) -> Result<PageWriteGuard<'_>> {
        // Get a free frame (or evict one)
        let frame_id = self.free_frame()?;

        // Allocate page on disk
        let page_id = {
            let mut pf = self.page_file.lock();
            pf.append_page()?
        };

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.set_page_id(Some(page_id));
        frame.pin();

        {
            let mut pt = self.page_table.write();
            pt.insert(page_id, frame_id);
        }

        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Flush
    // ========================================================================

    /// Flush every dirty page to disk.
    ///
    /// # Errors
    /// - I/O errors from disk writes
    pub fn flush_all(&self) -> Result<()> {
        let pages: Vec<(PageId, FrameId)> = {
            let pt = self.page_table.read();
            pt.iter().map(|(&pid, &fid)| (pid, fid)).collect()
        };

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }

        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of pages currently resident in the pool.
    pub fn resident_pages(&self) -> usize {
        self.page_table.read().len()
    }

    /// Number of pages in the underlying file.
    pub fn file_page_count(&self) -> u32 {
        self.page_file.lock().page_count()
    }

    // ========================================================================
    // Internal: Called by guards on drop
    // ========================================================================

    /// Unpin a page. Called by PageReadGuard/PageWriteGuard on drop.
    pub(crate) fn unpin_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        let new_pin_count = frame.unpin();

        // If pin count dropped to 0, page is now evictable
        if new_pin_count == 0 {
            let mut replacer = self.replacer.lock();
            replacer.set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Fetch a page into the pool, returning its frame ID.
    fn fetch_page(&self, page_id: PageId) -> Result<FrameId> {
        // Fast path: check if page is already resident (read lock only)
        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&page_id) {
                self.touch_resident(frame_id);
                return Ok(frame_id);
            }
        }

        self.load_from_disk(page_id)
    }

    /// Handle a cache hit: pin the frame and update the replacer.
    fn touch_resident(&self, frame_id: FrameId) {
        let frame = &self.frames[frame_id.0];
        frame.pin();

        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Handle a cache miss: get a frame, load from disk, update mappings.
    fn load_from_disk(&self, page_id: PageId) -> Result<FrameId> {
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        let frame_id = self.free_frame()?;

        let page_data = {
            let mut pf = self.page_file.lock();
            pf.read_page(page_id)?
        };

        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        {
            let mut page = frame.page_mut();
            page.as_mut_slice().copy_from_slice(page_data.as_slice());
        }
        frame.set_page_id(Some(page_id));
        frame.pin();

        {
            let mut pt = self.page_table.write();
            pt.insert(page_id, frame_id);
        }

        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Get a free frame, evicting if necessary.
    fn free_frame(&self) -> Result<FrameId> {
        {
            let mut fl = self.free_list.lock();
            if let Some(frame_id) = fl.pop() {
                return Ok(frame_id);
            }
        }

        self.evict_page()
    }

    /// Evict a page and return its frame.
    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = {
            let mut replacer = self.replacer.lock();
            replacer.evict().ok_or(Error::NoFreeFrames)?
        };

        self.stats.evictions.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        let old_page_id = frame.page_id();

        // If dirty, flush to disk before reuse
        if frame.is_dirty() {
            if let Some(pid) = old_page_id {
                self.flush_frame(frame_id, pid)?;
            }
        }

        if let Some(pid) = old_page_id {
            let mut pt = self.page_table.write();
            pt.remove(&pid);
        }

        frame.clear_dirty();
        frame.set_page_id(None);

        Ok(frame_id)
    }

    /// Flush a frame to disk if dirty.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if frame.is_dirty() {
            // Hold page read lock while writing to disk
            let page = frame.page();
            {
                let mut pf = self.page_file.lock();
                pf.write_page(page_id, &page)?;
            }
            drop(page);

            frame.clear_dirty();
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Helper to create a pool with a temporary index file.
    fn create_test_pool(pool_size: usize) -> (BufferPool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        let pf = PageFile::create(&path).unwrap();
        (BufferPool::new(pool_size, pf), dir)
    }

    #[test]
    fn test_append_page() {
        let (pool, _dir) = create_test_pool(10);

        let guard = pool.append_page().unwrap();
        assert_eq!(guard.page_id(), PageId::new(0));
        drop(guard);

        let guard = pool.append_page().unwrap();
        assert_eq!(guard.page_id(), PageId::new(1));
        drop(guard);

        assert_eq!(pool.resident_pages(), 2);
        assert_eq!(pool.file_page_count(), 2);
        assert_eq!(pool.pool_size(), 10);
    }

    #[test]
    fn test_pin_read_sees_writes() {
        let (pool, _dir) = create_test_pool(10);

        {
            let mut guard = pool.append_page().unwrap();
            guard.as_mut_slice()[0] = 0xAB;
        }

        {
            let guard = pool.pin_read(PageId::new(0)).unwrap();
            assert_eq!(guard.as_slice()[0], 0xAB);
        }
    }

    #[test]
    fn test_dirty_page_flushed_on_eviction() {
        let (pool, _dir) = create_test_pool(1); // Only 1 frame!

        {
            let mut guard = pool.append_page().unwrap();
            guard.as_mut_slice()[0] = 0x42;
        } // Drops, marks dirty

        // Appending page 1 evicts page 0, which must be flushed first
        {
            let _guard = pool.append_page().unwrap();
        }

        {
            let guard = pool.pin_read(PageId::new(0)).unwrap();
            assert_eq!(guard.as_slice()[0], 0x42);
        }
    }

    #[test]
    fn test_cache_hits_counted() {
        let (pool, _dir) = create_test_pool(10);

        {
            let _guard = pool.append_page().unwrap();
        }
        for _ in 0..2 {
            let _guard = pool.pin_read(PageId::new(0)).unwrap();
        }

        assert!(pool.stats().snapshot().cache_hits >= 2);
    }

    #[test]
    fn test_no_free_frames_when_all_pinned() {
        let (pool, _dir) = create_test_pool(2);

        let _g1 = pool.append_page().unwrap();
        let _g2 = pool.append_page().unwrap();

        assert!(matches!(pool.append_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_pin_missing_page_fails() {
        let (pool, _dir) = create_test_pool(10);

        assert!(pool.pin_read(PageId::new(999)).is_err());
    }

    #[test]
    fn test_flush_all_writes_dirty_pages() {
        let (pool, _dir) = create_test_pool(10);

        for i in 0..5u8 {
            let mut guard = pool.append_page().unwrap();
            guard.as_mut_slice()[0] = i;
        }

        pool.flush_all().unwrap();
        assert!(pool.stats().snapshot().pages_written >= 5);
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let (pool, _dir) = create_test_pool(2);

        {
            let _g = pool.append_page().unwrap(); // page 0
        }
        {
            let _g = pool.append_page().unwrap(); // page 1
        }
        // Touch page 0, making page 1 the LRU victim
        {
            let _g = pool.pin_read(PageId::new(0)).unwrap();
        }
        // Appending page 2 must evict page 1
        {
            let _g = pool.append_page().unwrap();
        }

        let pt_has = |pid: u32| pool.page_table.read().contains_key(&PageId::new(pid));
        assert!(pt_has(0));
        assert!(!pt_has(1));
        assert!(pt_has(2));
    }

    #[test]
    fn test_multiple_read_guards() {
        let (pool, _dir) = create_test_pool(10);

        {
            let _guard = pool.append_page().unwrap();
        }

        let guard1 = pool.pin_read(PageId::new(0)).unwrap();
        let guard2 = pool.pin_read(PageId::new(0)).unwrap();
        assert_eq!(guard1.page_id(), guard2.page_id());
    }
}
