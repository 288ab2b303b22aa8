use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use super::page::{PageId, PAGE_SIZE};
use super::DiskManager;
use crate::error::Result;

/// A disk manager over a single data file. Page `n` occupies the
/// page-sized slot at byte offset `n * PAGE_SIZE`; deleted pages keep
/// their slot (ids are never reused, so the hole is permanent until
/// some compaction layer above cares).
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
}

impl FileDisk {
    /// Open the data file at `path`, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<FileDisk> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(FileDisk { file: Mutex::new(file) })
    }

    fn offset(page_id: PageId) -> Result<u64> {
        let id = u64::try_from(page_id)?;
        Ok(id * PAGE_SIZE as u64)
    }
}

impl DiskManager for FileDisk {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let mut file = self.file.lock()?;
        file.seek(SeekFrom::Start(Self::offset(page_id)?))?;
        // a slot past the end of the file was never written; it and
        // the tail of a short read come back zeroed
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf[filled..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        let mut file = self.file.lock()?;
        file.seek(SeekFrom::Start(Self::offset(page_id)?))?;
        file.write_all(data)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let file = self.file.lock()?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_roundtrip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let disk = FileDisk::open(dir.path().join("pages.db"))?;

        let mut image = vec![0u8; PAGE_SIZE];
        image[..5].copy_from_slice(b"hello");
        disk.write_page(2, &image)?;
        disk.flush()?;

        let mut buf = vec![0xffu8; PAGE_SIZE];
        disk.read_page(2, &mut buf)?;
        assert_eq!(image, buf);

        Ok(())
    }

    #[test]
    fn test_unwritten_slot_reads_zeroes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let disk = FileDisk::open(dir.path().join("pages.db"))?;

        // page 5 was never written; neither was anything before it
        let mut buf = vec![0xffu8; PAGE_SIZE];
        disk.read_page(5, &mut buf)?;
        assert!(buf.iter().all(|&b| b == 0));

        // a write to a later page leaves earlier holes zeroed
        disk.write_page(3, &vec![9u8; PAGE_SIZE])?;
        disk.read_page(1, &mut buf)?;
        assert!(buf.iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_reopen_sees_previous_writes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pages.db");

        let image = vec![7u8; PAGE_SIZE];
        {
            let disk = FileDisk::open(&path)?;
            disk.write_page(0, &image)?;
            disk.flush()?;
        }

        let disk = FileDisk::open(&path)?;
        let mut buf = vec![0u8; PAGE_SIZE];
        disk.read_page(0, &mut buf)?;
        assert_eq!(image, buf);

        Ok(())
    }
}
