use std::ops::{Deref, DerefMut};

use crate::storage::page::{Page, PageId, PageReadLatch, PageWriteLatch};

use super::bufferpool::BufferPoolManager;

/// Scoped handle over a pinned page. Holding the guard is what keeps
/// the page resident: it owns exactly one unit of the page's pin
/// count, and dropping it gives that unit back along with the
/// accumulated dirty hint, whatever path the scope exits through.
///
/// Guards are move-only; moving one transfers the unpin obligation
/// with it. A failed fetch returns an error rather than a guard, so a
/// guard over nothing cannot exist.
pub struct PageGuard {
    pool: BufferPoolManager,
    page: Page,
    page_id: PageId,
    is_dirty: bool,
}

impl PageGuard {
    pub(crate) fn new(pool: BufferPoolManager, page_id: PageId, page: Page) -> Self {
        PageGuard { pool, page, page_id, is_dirty: false }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Take the page's read latch for the duration of the returned
    /// lease and expose the bytes.
    pub fn read(&self) -> PageRead {
        PageRead { latch: self.page.read() }
    }

    /// Take the page's write latch for the duration of the returned
    /// lease and expose the bytes mutably. The page is marked dirty.
    pub fn write(&mut self) -> PageWrite {
        self.is_dirty = true;
        PageWrite { latch: self.page.write() }
    }

    /// Mark the page dirty without touching the bytes.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub(crate) fn page(&self) -> &Page {
        &self.page
    }

    pub(crate) fn set_dirty(&mut self) {
        self.is_dirty = true;
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.is_dirty);
    }
}

/// Transient read lease handed out by a basic guard.
pub struct PageRead {
    latch: PageReadLatch,
}

impl Deref for PageRead {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.latch.data
    }
}

/// Transient write lease handed out by a basic guard.
pub struct PageWrite {
    latch: PageWriteLatch,
}

impl Deref for PageWrite {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.latch.data
    }
}

impl DerefMut for PageWrite {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.latch.data
    }
}

/// Guard that additionally holds the page's reader latch for its
/// whole lifetime, so the bytes cannot change underneath it.
pub struct ReadPageGuard {
    // field order matters: the latch is released before the unpin in
    // the inner guard runs
    latch: PageReadLatch,
    guard: PageGuard,
}

impl ReadPageGuard {
    pub(crate) fn new(guard: PageGuard) -> Self {
        let latch = guard.page().read();
        ReadPageGuard { latch, guard }
    }

    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.latch.data
    }
}

/// Guard that additionally holds the page's writer latch for its
/// whole lifetime, giving the holder exclusive access to the bytes.
pub struct WritePageGuard {
    // field order matters: the latch is released before the unpin in
    // the inner guard runs
    latch: PageWriteLatch,
    guard: PageGuard,
}

impl WritePageGuard {
    pub(crate) fn new(guard: PageGuard) -> Self {
        let latch = guard.page().write();
        WritePageGuard { latch, guard }
    }

    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    /// Mark the page dirty without touching the bytes.
    pub fn mark_dirty(&mut self) {
        self.guard.set_dirty();
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.latch.data
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.guard.set_dirty();
        &mut self.latch.data
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crate::error::Result;
    use crate::storage::memory::Memory;

    use super::super::bufferpool::BufferPoolManager;

    fn new_pool(pool_size: usize) -> (BufferPoolManager, Arc<Memory>) {
        let disk = Arc::new(Memory::new());
        (BufferPoolManager::new(disk.clone(), pool_size, 2), disk)
    }

    #[test]
    fn test_guard_releases_pin_on_drop() -> Result<()> {
        let (bpm, _) = new_pool(2);

        let (page_id, guard) = bpm.new_page()?;
        drop(guard);

        // the pin is gone: a manual unpin finds the count at zero
        assert_eq!(false, bpm.unpin_page(page_id, false));

        {
            let _guard = bpm.fetch_page(page_id)?;
        }
        assert_eq!(false, bpm.unpin_page(page_id, false));

        Ok(())
    }

    #[test]
    fn test_write_guard_carries_dirty_hint() -> Result<()> {
        let (bpm, disk) = new_pool(1);

        let (page_id, guard) = bpm.new_page()?;
        drop(guard);

        // write through a write guard, then force the frame to turn
        // over; the dirty bytes must reach the disk manager
        {
            let mut w = bpm.fetch_page_write(page_id)?;
            w[..5].copy_from_slice(b"dirty");
        }
        let (other, guard) = bpm.new_page()?;
        assert_ne!(page_id, other);
        drop(guard);

        let image = disk.get(page_id)?.expect("evicted page written back");
        assert_eq!(b"dirty", &image[..5]);

        Ok(())
    }

    #[test]
    fn test_read_guards_share_the_latch() -> Result<()> {
        let (bpm, _) = new_pool(2);

        let (page_id, guard) = bpm.new_page()?;
        drop(guard);

        let a = bpm.fetch_page_read(page_id)?;
        let b = bpm.fetch_page_read(page_id)?;
        assert_eq!(a[0], b[0]);
        drop(a);
        drop(b);

        Ok(())
    }

    #[test]
    fn test_read_guard_excludes_writers() -> Result<()> {
        let (bpm, _) = new_pool(2);

        let (page_id, mut guard) = bpm.new_page()?;
        guard.write()[0] = 1;
        drop(guard);

        let reader = bpm.fetch_page_read(page_id)?;
        let pool = bpm.clone();
        let writer = thread::spawn(move || {
            let mut w = pool.fetch_page_write(page_id).unwrap();
            w[0] = 2;
        });

        // while the read latch is held the writer cannot have run,
        // no matter how the threads are scheduled
        thread::sleep(Duration::from_millis(20));
        assert_eq!(1, reader[0]);
        drop(reader);

        writer.join().unwrap();
        let reader = bpm.fetch_page_read(page_id)?;
        assert_eq!(2, reader[0]);

        Ok(())
    }

    #[test]
    fn test_dirty_flag_survives_clean_unpin() -> Result<()> {
        let (bpm, disk) = new_pool(1);

        let (page_id, mut guard) = bpm.new_page()?;
        guard.write()[..4].copy_from_slice(b"keep");
        drop(guard);

        // a later clean pin/unpin cycle must not wash out the flag
        {
            let _guard = bpm.fetch_page(page_id)?;
        }

        let (_, guard) = bpm.new_page()?;
        drop(guard);
        let image = disk.get(page_id)?.expect("dirty page written back");
        assert_eq!(b"keep", &image[..4]);

        Ok(())
    }
}
