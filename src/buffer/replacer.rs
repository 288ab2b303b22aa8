use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{AccessType, FrameId, Replacer};

/// Ordering key of an eviction candidate. Candidates order victim
/// first: larger backward k-distance wins, ties go to the earliest
/// recorded access (classic LRU), then to the smaller frame id so the
/// order is deterministic.
#[derive(Debug, Eq, PartialEq)]
struct KDistance {
    frame_id: FrameId,
    distance: usize,
    earliest: usize,
}

impl PartialOrd for KDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.distance.cmp(&other.distance).reverse() {
            Ordering::Equal => match self.earliest.cmp(&other.earliest) {
                Ordering::Equal => self.frame_id.cmp(&other.frame_id),
                ord => ord,
            },
            ord => ord,
        }
    }
}

struct LruKNode {
    k: usize,
    frame_id: FrameId,
    is_evictable: bool,
    /// the last K access timestamps of the frame, oldest first.
    history: VecDeque<usize>,
}

impl LruKNode {
    fn new(frame_id: FrameId, k: usize) -> Self {
        assert!(k > 0, "replacer k should be larger than zero");
        LruKNode { history: VecDeque::with_capacity(k), k, frame_id, is_evictable: false }
    }

    fn record_access(&mut self, timestamp: usize) {
        if self.history.len() == self.k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp)
    }

    /// Backward k-distance of the node at time `now`. A node with
    /// fewer than k recorded accesses has +inf distance; within that
    /// class the earliest recorded access decides. With a full window
    /// the front entry is the k-th most recent access, and the
    /// distance is measured from it to `now`.
    fn k_distance(&self, now: usize) -> KDistance {
        let earliest = *self.history.front().unwrap_or(&0);
        if self.history.len() < self.k {
            return KDistance { frame_id: self.frame_id, distance: usize::MAX, earliest };
        }
        KDistance { frame_id: self.frame_id, distance: now - earliest, earliest }
    }
}

/// LruKReplacer implements the LRU-k replacement policy.
///
/// The LRU-k algorithm evicts the frame whose backward k-distance is
/// the maximum over all evictable frames. Backward k-distance is
/// computed as the difference in time between the current timestamp
/// and the timestamp of the k-th previous access.
///
/// A frame with fewer than k recorded accesses is given +inf as its
/// backward k-distance. When multiple frames have +inf backward
/// k-distance, the classical LRU algorithm picks the victim among
/// them by earliest recorded access.
///
/// Time is a logical clock owned by the replacer, incremented on every
/// recorded access; it has no relation to the wall clock.
pub struct LruKReplacer {
    nodes: HashMap<FrameId, LruKNode>,
    current_timestamp: usize,
    current_size: usize,
    replacer_size: usize,
    k: usize,
}

impl LruKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let nodes = HashMap::new();
        LruKReplacer { nodes, current_timestamp: 0, current_size: 0, replacer_size: size, k }
    }

    /// Record the event that the given frame id is accessed at the
    /// current timestamp, creating the node on first sight. Frame ids
    /// at or beyond the pool size are a caller bug.
    fn record_access(&mut self, frame_id: FrameId) {
        assert!(frame_id < self.replacer_size, "frame id {} out of range", frame_id);
        let k = self.k;
        let node = self.nodes.entry(frame_id).or_insert_with(|| LruKNode::new(frame_id, k));
        node.record_access(self.current_timestamp);
        self.current_timestamp += 1;
    }

    /// Find the evictable frame with the largest backward k-distance
    /// and evict it, removing its access history. Return the frame id,
    /// or None if no frame is evictable.
    fn evict(&mut self) -> Option<FrameId> {
        let now = self.current_timestamp;
        let victim = self
            .nodes
            .values()
            .filter(|node| node.is_evictable)
            .map(|node| node.k_distance(now))
            .min()?;
        self.nodes.remove(&victim.frame_id);
        self.current_size -= 1;
        Some(victim.frame_id)
    }

    /// Toggle whether a frame is evictable or non-evictable,
    /// maintaining the evictable count. Unknown frames and no-op
    /// toggles leave everything unchanged.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(node) = self.nodes.get_mut(&frame_id) else {
            return;
        };
        if node.is_evictable == evictable {
            return;
        }
        node.is_evictable = evictable;
        if evictable {
            self.current_size += 1;
        } else {
            self.current_size -= 1;
        }
    }

    /// Check if a frame is evictable. If the frame is not found,
    /// return true.
    fn is_evictable(&self, frame_id: FrameId) -> bool {
        match self.nodes.get(&frame_id) {
            Some(node) => node.is_evictable,
            None => true,
        }
    }

    /// Remove the frame and its access history regardless of its
    /// k-distance. Removing a non-evictable frame asserts; unknown
    /// frames are ignored.
    fn remove(&mut self, frame_id: FrameId) {
        let Some(node) = self.nodes.get(&frame_id) else {
            return;
        };
        assert!(node.is_evictable, "remove on a non-evictable frame {}", frame_id);
        self.nodes.remove(&frame_id);
        self.current_size -= 1;
    }

    fn size(&self) -> usize {
        self.current_size
    }
}

/// SyncLruKReplacer is the thread-safe version of the LRU-k policy;
/// all the heavy lifting happens in the wrapped LruKReplacer.
pub struct SyncLruKReplacer {
    inner: Mutex<LruKReplacer>,
}

impl SyncLruKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let inner = Mutex::new(LruKReplacer::new(k, size));
        SyncLruKReplacer { inner }
    }
}

impl Replacer for SyncLruKReplacer {
    fn record_access(&self, frame_id: FrameId, _access_type: AccessType) {
        // the lru-k policy does not distinguish access kinds
        let mut guard = self.inner.lock().unwrap();
        guard.record_access(frame_id)
    }

    fn evict(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock().unwrap();
        guard.evict()
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut guard = self.inner.lock().unwrap();
        guard.set_evictable(frame_id, evictable)
    }

    fn is_evictable(&self, frame_id: FrameId) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.is_evictable(frame_id)
    }

    fn remove(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.remove(frame_id)
    }

    fn size(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.size()
    }
}
