use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

/// Identifier of a data page. Ids are drawn from a monotonically
/// increasing process-local counter and are never reused within a
/// process run, not even after the page is deleted.
pub type PageId = i64;

/// Sentinel id meaning "no page".
pub const INVALID_PAGE_ID: PageId = -1;

/// Size of a data page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Owned read lease on a page's byte buffer.
pub type PageReadLatch = ArcRwLockReadGuard<RawRwLock, PageBuf>;

/// Owned write lease on a page's byte buffer.
pub type PageWriteLatch = ArcRwLockWriteGuard<RawRwLock, PageBuf>;

/// The bytes of one frame, plus the latch-side copy of the resident
/// page id. The copy is only updated while the write latch is held
/// during frame turnover, so a latch holder always sees an id that is
/// consistent with the bytes next to it.
pub struct PageBuf {
    pub(crate) id: PageId,
    pub(crate) data: Vec<u8>,
}

impl PageBuf {
    fn new() -> Self {
        PageBuf { id: INVALID_PAGE_ID, data: vec![0; PAGE_SIZE] }
    }

    /// The page the bytes currently belong to, or the sentinel while
    /// the frame resides no page.
    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// A page's byte buffer behind its reader-writer latch. Cloning is
/// cheap and shares the buffer: the pool keeps one handle per frame
/// and every guard standing over the page keeps another, so a latch
/// lease can outlive any borrow of the pool.
#[derive(Clone)]
pub struct Page {
    buf: Arc<RwLock<PageBuf>>,
}

impl Page {
    pub(crate) fn new() -> Self {
        Page { buf: Arc::new(RwLock::new(PageBuf::new())) }
    }

    pub(crate) fn read(&self) -> PageReadLatch {
        self.buf.read_arc()
    }

    pub(crate) fn write(&self) -> PageWriteLatch {
        self.buf.write_arc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_starts_zeroed() {
        let page = Page::new();
        let latch = page.read();
        assert_eq!(INVALID_PAGE_ID, latch.id());
        assert_eq!(PAGE_SIZE, latch.as_slice().len());
        assert!(latch.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clones_share_bytes() {
        let page = Page::new();
        let other = page.clone();
        {
            let mut latch = page.write();
            latch.data[0] = 42;
        }
        let latch = other.read();
        assert_eq!(42, latch.as_slice()[0]);
    }
}
