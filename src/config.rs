use serde::Deserialize;

use crate::buffer::bufferpool::BufferPoolManager;
use crate::error::Result;
use crate::storage::{new_disk_manager, StorageType};

#[derive(Debug, PartialEq, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub storage_type: StorageType,
    /// number of frames in the buffer pool, >= 1.
    pub pool_size: usize,
    /// history depth of the lru-k replacer, >= 1.
    pub replacer_k: usize,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("storage_type", "memory")?
            .set_default("log_level", "debug")?
            .set_default("pool_size", 64)?
            .set_default("replacer_k", 2)?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("PAGEBOX"));
        Ok(cfg.build()?.try_deserialize()?)
    }

    /// Build a buffer pool manager over the configured disk manager.
    pub fn open_pool(&self) -> Result<BufferPoolManager> {
        let disk = new_disk_manager(self.storage_type)?;
        Ok(BufferPoolManager::new(disk, self.pool_size, self.replacer_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let cfg = Config::new("")?;
        assert_eq!(LogLevel::Debug, cfg.log_level);
        assert_eq!(StorageType::Memory, cfg.storage_type);
        assert_eq!(64, cfg.pool_size);
        assert_eq!(2, cfg.replacer_k);
        Ok(())
    }

    #[test]
    fn test_open_pool() -> Result<()> {
        let cfg = Config::new("")?;
        let bpm = cfg.open_pool()?;
        assert_eq!(cfg.pool_size, bpm.pool_size());

        let (page_id, guard) = bpm.new_page()?;
        assert_eq!(0, page_id);
        drop(guard);
        Ok(())
    }
}
