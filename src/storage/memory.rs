use std::collections::HashMap;
use std::sync::RwLock;

use super::page::PageId;
use super::DiskManager;
use crate::error::Result;

/// An in-memory disk manager backed by a hash map of page images.
/// Nothing survives the process, which makes it the workhorse for
/// tests: a test can hold onto the concrete type and inspect exactly
/// which pages the buffer pool wrote back.
#[derive(Debug)]
pub struct Memory {
    pages: RwLock<HashMap<PageId, Vec<u8>>>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory { pages: RwLock::new(HashMap::new()) }
    }

    /// The stored image of a page, if it was ever written.
    pub fn get(&self, page_id: PageId) -> Result<Option<Vec<u8>>> {
        let pages = self.pages.read()?;
        Ok(pages.get(&page_id).cloned())
    }

    /// Number of pages ever written and not deallocated.
    pub fn len(&self) -> Result<usize> {
        let pages = self.pages.read()?;
        Ok(pages.len())
    }
}

impl DiskManager for Memory {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let pages = self.pages.read()?;
        match pages.get(&page_id) {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                buf[n..].fill(0);
            }
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        let mut pages = self.pages.write()?;
        pages.insert(page_id, data.to_vec());
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        let mut pages = self.pages.write()?;
        pages.remove(&page_id);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PAGE_SIZE;

    #[test]
    fn test_page_roundtrip() -> Result<()> {
        let m = Memory::new();

        let mut image = vec![0u8; PAGE_SIZE];
        image[..5].copy_from_slice(b"hello");
        m.write_page(3, &image)?;

        let mut buf = vec![0xffu8; PAGE_SIZE];
        m.read_page(3, &mut buf)?;
        assert_eq!(image, buf);

        Ok(())
    }

    #[test]
    fn test_missing_page_reads_zeroes() -> Result<()> {
        let m = Memory::new();

        let mut buf = vec![0xffu8; PAGE_SIZE];
        m.read_page(7, &mut buf)?;
        assert!(buf.iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_deallocate_drops_image() -> Result<()> {
        let m = Memory::new();

        m.write_page(1, &vec![1u8; PAGE_SIZE])?;
        assert_eq!(1, m.len()?);

        m.deallocate_page(1)?;
        assert_eq!(None, m.get(1)?);
        assert_eq!(0, m.len()?);

        // deallocating an unknown page is a no-op
        m.deallocate_page(42)?;

        Ok(())
    }
}
