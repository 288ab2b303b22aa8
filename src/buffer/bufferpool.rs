use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::{Error, Result};
use crate::storage::page::{Page, PageId, PageWriteLatch, INVALID_PAGE_ID};
use crate::storage::DiskManager;

use super::guard::{PageGuard, ReadPageGuard, WritePageGuard};
use super::replacer::SyncLruKReplacer;
use super::{AccessType, FrameId, Replacer};

/// In-memory metadata of one frame. Guarded by the pool latch; the
/// frame's bytes live behind the per-frame page latch instead.
struct FrameHeader {
    id: PageId,
    pin_count: u32,
    is_dirty: bool,
}

impl FrameHeader {
    fn new() -> Self {
        FrameHeader { id: INVALID_PAGE_ID, pin_count: 0, is_dirty: false }
    }

    fn reset(&mut self) {
        self.id = INVALID_PAGE_ID;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}

/// A frame claimed for a new resident page while the pool latch was
/// held. By the time staging completes, the new page id is pinned and
/// published in the page table, so no concurrent operation can reuse
/// the frame; the byte latch is held, so no guard can observe the
/// bytes until the swap completes. The disk work happens against this
/// struct after the pool latch is dropped.
struct FrameSwap {
    disk: Arc<dyn DiskManager>,
    page: Page,
    latch: PageWriteLatch,
    /// previous resident page to write back before the buffer is reused.
    writeback: Option<PageId>,
}

impl FrameSwap {
    /// Write back the old page if it was dirty, then zero the buffer.
    fn flush_old(&mut self) -> Result<()> {
        if let Some(old_id) = self.writeback.take() {
            debug!("writing back dirty page {} before frame reuse", old_id);
            self.disk.write_page(old_id, &self.latch.data)?;
        }
        self.latch.data.fill(0);
        Ok(())
    }

    /// Complete the swap for a freshly allocated page: the zeroed
    /// buffer is the page's initial contents.
    fn zeroed(mut self) -> Result<Page> {
        self.flush_old()?;
        Ok(self.page)
    }

    /// Complete the swap for a fetched page: read its bytes in from
    /// the disk manager.
    fn load(mut self) -> Result<Page> {
        self.flush_old()?;
        let page_id = self.latch.id;
        self.disk.read_page(page_id, &mut self.latch.data)?;
        Ok(self.page)
    }
}

/// The buffer pool is responsible for moving physical pages back and
/// forth between main memory and disk, letting the system work with
/// databases larger than the memory available to it.
///
/// The pool's workings are transparent to the layers above: they ask
/// for a page by its unique id and never learn whether it was already
/// in memory or had to be fetched.
struct BufferPool {
    pool_size: usize,
    /// the external disk manager all page I/O goes through.
    disk: Arc<dyn DiskManager>,
    /// frame metadata, indexed by FrameId in [0, pool_size).
    frames: Vec<FrameHeader>,
    /// the frames' byte buffers, same indexing. The vector itself is
    /// immutable after construction; the contents are only reachable
    /// through each frame's latch.
    pages: Vec<Page>,
    /// page table for keeping track of resident pages.
    page_table: HashMap<PageId, FrameId>,
    /// frames that currently hold no page.
    free_list: Vec<FrameId>,
    /// replacer to find unpinned frames for replacement.
    replacer: Arc<dyn Replacer>,
    /// the next page id to be allocated.
    next_page_id: PageId,
}

impl BufferPool {
    fn new(disk: Arc<dyn DiskManager>, pool_size: usize, replacer_k: usize) -> Self {
        assert!(pool_size > 0, "pool size should be larger than zero");
        let mut pages = Vec::with_capacity(pool_size);
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = Vec::with_capacity(pool_size);
        let page_table = HashMap::new();
        let replacer: Arc<dyn Replacer> = Arc::new(SyncLruKReplacer::new(replacer_k, pool_size));
        for i in 0..pool_size {
            pages.push(Page::new());
            frames.push(FrameHeader::new());
            // initially, every frame is in the free list
            free_list.push(i);
        }
        BufferPool { pool_size, disk, frames, pages, page_table, free_list, replacer, next_page_id: 0 }
    }

    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    /// Pin the page if it is resident, recording the access, and hand
    /// back its buffer.
    fn pin_resident(&mut self, page_id: PageId) -> Option<Page> {
        let &frame_id = self.page_table.get(&page_id)?;
        self.frames[frame_id].pin_count += 1;
        self.replacer.record_access(frame_id, AccessType::Lookup);
        self.replacer.set_evictable(frame_id, false);
        Some(self.pages[frame_id].clone())
    }

    /// Claim a replacement frame: prefer the free list, fall back to
    /// evicting.
    fn claim_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop() {
            return Ok(frame_id);
        }
        match self.replacer.evict() {
            Some(frame_id) => {
                debug!("free list empty, evicting frame {}", frame_id);
                Ok(frame_id)
            }
            None => Err(Error::PoolExhausted),
        }
    }

    /// Install `page_id` into a claimed frame: pin it, publish it in
    /// the page table, and stage the buffer swap. Seizing the byte
    /// latch here cannot block: the claimed frame's pin count is zero,
    /// so no guard exists over it, and flush_page pins before it
    /// latches.
    fn install(&mut self, frame_id: FrameId, page_id: PageId) -> FrameSwap {
        let mut latch = self.pages[frame_id].write();

        let frame = &mut self.frames[frame_id];
        let old_id = frame.id;
        let writeback = if frame.is_dirty { Some(old_id) } else { None };
        frame.id = page_id;
        frame.pin_count = 1;
        frame.is_dirty = false;

        if old_id != INVALID_PAGE_ID {
            self.page_table.remove(&old_id);
        }
        self.page_table.insert(page_id, frame_id);
        latch.id = page_id;
        self.replacer.record_access(frame_id, AccessType::Lookup);
        self.replacer.set_evictable(frame_id, false);

        FrameSwap {
            disk: Arc::clone(&self.disk),
            page: self.pages[frame_id].clone(),
            latch,
            writeback,
        }
    }

    /// Unpin the page once. The dirty hint only ever adds: once dirty,
    /// a page stays dirty until flushed, however many clean unpins
    /// follow. Returns false if the page is unknown or not pinned.
    fn unpin(&mut self, page_id: PageId, is_dirty: bool) -> bool {
        let Some(&frame_id) = self.page_table.get(&page_id) else {
            return false;
        };
        let frame = &mut self.frames[frame_id];
        if frame.pin_count == 0 {
            return false;
        }
        frame.pin_count -= 1;
        frame.is_dirty |= is_dirty;
        if frame.pin_count == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }
}

/// Buffer pool manager: wraps the buffer pool behind a mutex latch
/// for concurrent access and hands out page guards instead of raw
/// frames. The latch is dropped across disk manager calls and across
/// page latch acquisition; the staging and pinning invariants on the
/// individual operations are what keep a frame from being reused
/// while its I/O is in flight.
#[derive(Clone)]
pub struct BufferPoolManager {
    inner: Arc<Mutex<BufferPool>>,
}

impl BufferPoolManager {
    pub fn new(disk: Arc<dyn DiskManager>, pool_size: usize, replacer_k: usize) -> Self {
        let inner = BufferPool::new(disk, pool_size, replacer_k);
        BufferPoolManager { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Create a new page in the buffer pool, returning its id and a
    /// pinned guard over its zeroed bytes. Fails with PoolExhausted
    /// when all frames are in use and none is evictable.
    pub fn new_page(&self) -> Result<(PageId, PageGuard)> {
        let mut inner = self.inner.lock()?;
        let frame_id = inner.claim_frame()?;
        let page_id = inner.allocate_page();
        debug!("allocated page {} in frame {}", page_id, frame_id);
        let swap = inner.install(frame_id, page_id);
        drop(inner);

        let page = swap.zeroed()?;
        Ok((page_id, PageGuard::new(self.clone(), page_id, page)))
    }

    /// Fetch the requested page, pinning it. On a miss the page is
    /// read in from the disk manager, evicting some unpinned frame to
    /// make room; fails with PoolExhausted when none is available.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageGuard> {
        let page = self.fetch_pinned(page_id)?;
        Ok(PageGuard::new(self.clone(), page_id, page))
    }

    /// Fetch the requested page and take its read latch for the
    /// guard's lifetime. The latch is acquired after the pin is taken
    /// and after the pool latch is released.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard> {
        Ok(ReadPageGuard::new(self.fetch_page(page_id)?))
    }

    /// Fetch the requested page and take its write latch for the
    /// guard's lifetime. The latch is acquired after the pin is taken
    /// and after the pool latch is released.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard> {
        Ok(WritePageGuard::new(self.fetch_page(page_id)?))
    }

    fn fetch_pinned(&self, page_id: PageId) -> Result<Page> {
        if page_id == INVALID_PAGE_ID {
            return Err(Error::InvalidPageId(page_id));
        }
        let mut inner = self.inner.lock()?;
        if let Some(page) = inner.pin_resident(page_id) {
            return Ok(page);
        }
        let frame_id = inner.claim_frame()?;
        let swap = inner.install(frame_id, page_id);
        drop(inner);

        swap.load()
    }

    /// Unpin the target page. Returns false if the page is not in the
    /// buffer pool or its pin count is already zero. The dirty hint
    /// OR-merges into the frame's dirty flag; once the pin count
    /// reaches zero the frame becomes evictable.
    ///
    /// Guards call this on drop; calling it by hand is only needed
    /// when pinning was done by hand too.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        inner.unpin(page_id, is_dirty)
    }

    /// Write the page's current bytes through the disk manager,
    /// regardless of the dirty flag, then clear the flag. Returns
    /// false if the page is not resident.
    ///
    /// The pin count and evictability are unchanged once the call
    /// returns; internally a transient pin keeps the frame from
    /// turning over while the pool latch is released around the disk
    /// write.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };
        inner.frames[frame_id].pin_count += 1;
        inner.replacer.set_evictable(frame_id, false);
        let page = inner.pages[frame_id].clone();
        let disk = Arc::clone(&inner.disk);
        drop(inner);

        let latch = page.read();
        debug_assert_eq!(page_id, latch.id());
        let result = disk.write_page(page_id, &latch.data);
        if result.is_ok() {
            // the read latch is still held, so no writer can slip a
            // modification between the disk write and the clear
            let mut inner = self.inner.lock()?;
            inner.frames[frame_id].is_dirty = false;
        }
        drop(latch);

        self.unpin_page(page_id, false);
        result.map(|_| true)
    }

    /// Flush every resident page. The resident set is snapshotted
    /// under the pool latch and each page is flushed outside it, so
    /// pages fetched or evicted concurrently may or may not be
    /// included. No ordering among the flushes is guaranteed.
    pub fn flush_all(&self) -> Result<()> {
        let inner = self.inner.lock()?;
        let page_ids: Vec<PageId> = inner.page_table.keys().copied().collect();
        drop(inner);

        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Delete a page from the buffer pool, returning its frame to the
    /// free list and invoking the disk manager's deallocate hook. A
    /// page that is not resident was already deleted as far as the
    /// pool is concerned: the call is idempotent and returns true. A
    /// pinned page cannot be deleted; the call returns false.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        if inner.frames[frame_id].pin_count != 0 {
            return Ok(false);
        }
        debug_assert!(inner.replacer.is_evictable(frame_id));

        // detach the frame while the pool latch is held: afterwards no
        // other operation can reach it until it re-enters the free
        // list. Seizing the byte latch cannot block, same as install.
        inner.page_table.remove(&page_id);
        inner.replacer.remove(frame_id);
        let was_dirty = inner.frames[frame_id].is_dirty;
        inner.frames[frame_id].reset();
        let mut latch = inner.pages[frame_id].write();
        let disk = Arc::clone(&inner.disk);
        drop(inner);

        if was_dirty {
            disk.write_page(page_id, &latch.data)?;
        }
        latch.id = INVALID_PAGE_ID;
        latch.data.fill(0);
        drop(latch);
        disk.deallocate_page(page_id)?;
        debug!("deleted page {}, frame {} freed", page_id, frame_id);

        let mut inner = self.inner.lock()?;
        inner.free_list.push(frame_id);
        Ok(true)
    }

    /// Number of frames the pool was built with.
    pub fn pool_size(&self) -> usize {
        match self.inner.lock() {
            Ok(inner) => inner.pool_size,
            Err(poisoned) => poisoned.into_inner().pool_size,
        }
    }
}
