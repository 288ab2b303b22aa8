use std::fmt::{Display, Formatter};
use std::num::TryFromIntError;
use std::sync::PoisonError;

use config::ConfigError;
use serde::{Deserialize, Serialize};

use crate::storage::page::PageId;

pub type Result<T> = std::result::Result<T, Error>;

// All except Internal are considered user-facing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    Internal(String),
    /// The buffer pool could not obtain a frame: the free list is
    /// empty and no resident frame is evictable. Transient; the
    /// caller may retry after releasing some guards.
    PoolExhausted,
    /// The sentinel page id was passed where a real page id is
    /// required. A bug in the layer above.
    InvalidPageId(PageId),
}

impl Error {
    pub fn internal<E: ToString>(msg: E) -> Error {
        Error::Internal(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(s) => write!(f, "{}", s),
            Error::PoolExhausted => {
                write!(f, "buffer pool has no free or evictable frame")
            }
            Error::InvalidPageId(id) => write!(f, "invalid page id {}", id),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::internal(err)
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Error::internal(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::internal(err)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::internal(err)
    }
}
