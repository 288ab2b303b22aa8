use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod file;
pub mod memory;
pub mod page;

use self::page::PageId;

/// The disk manager moves whole pages between memory and the storage
/// medium. The buffer pool is its only caller and addresses it purely
/// by page id; how the bytes are laid out underneath is the disk
/// manager's business.
///
/// The trait is designed as `trait object` compatible so the pool can
/// hold a `dyn DiskManager` chosen at runtime, and all methods take
/// `&self` so callers may invoke it without any outer lock held.
pub trait DiskManager: Debug + Send + Sync {
    /// Fill `buf` with the stored contents of the page, blocking until
    /// complete. A page that was never written reads back as zeroes.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persist `data` as the contents of the page, blocking until the
    /// disk manager has accepted the bytes.
    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()>;

    /// Hook invoked when the buffer pool deletes a page. The default
    /// does nothing; an implementation may reclaim the slot.
    fn deallocate_page(&self, _page_id: PageId) -> Result<()> {
        Ok(())
    }

    /// Flushes any buffered data to the underlying storage medium.
    fn flush(&self) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StorageType {
    Memory,
}

pub fn new_disk_manager(typ: StorageType) -> Result<Arc<dyn DiskManager>> {
    match typ {
        StorageType::Memory => Ok(Arc::new(memory::Memory::new())),
    }
}
