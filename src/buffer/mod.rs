/// Index of a frame in the buffer pool's array, in `[0, pool_size)`.
pub type FrameId = usize;

/// How a page access came about. The stock LRU-K policy treats all
/// kinds alike; the interface carries the kind so a policy could, for
/// example, keep sequential scans from flushing the hot set.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AccessType {
    Lookup,
    Scan,
}

/// Replacer tracks frame usage for replacement in case the buffer
/// pool is full.
pub trait Replacer: Send + Sync {
    /// Record the event that the given frame id is accessed at the
    /// current timestamp. Create a new entry for access history if the
    /// frame id has not been seen before; new entries start out
    /// non-evictable until the pool says otherwise.
    fn record_access(&self, frame_id: FrameId, access_type: AccessType);

    /// Find the frame to evict with the replacement policy (e.g.
    /// backward k-distance). Only frames that are marked as evictable
    /// are candidates for eviction.
    ///
    /// Successful eviction of a frame decrements the size of the
    /// replacer and removes the frame's access history.
    ///
    /// Return the frame id if a frame is evicted successfully, None if
    /// no frame can be evicted.
    fn evict(&self) -> Option<FrameId>;

    /// Toggle whether a frame is evictable or non-evictable. This
    /// function also controls the replacer size: the size equals the
    /// number of evictable entries.
    ///
    /// If a frame was previously evictable and is to be set
    /// non-evictable the size decrements; the opposite toggle
    /// increments it. Unknown frames are ignored.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Check if a frame is evictable. If the frame is not found,
    /// return true.
    fn is_evictable(&self, frame_id: FrameId) -> bool;

    /// Remove a frame from the replacer, along with its access
    /// history, decrementing the size. Unlike evict this ignores the
    /// replacement policy and removes the specified frame, whatever
    /// its backward k-distance.
    ///
    /// Removing a non-evictable frame is a caller bug and asserts.
    /// Unknown frames are ignored.
    fn remove(&self, frame_id: FrameId);

    /// Number of evictable frames currently tracked.
    fn size(&self) -> usize;
}

pub mod bufferpool;
pub mod guard;
pub mod replacer;
