//! Fundamental types and compile-time tunables for the zset engine.

/// A sorted-set member. Members are unique, non-empty, UTF-8 strings no
/// longer than [`MAX_MEMBER_LEN`] bytes.
pub type Member = String;

/// Maximum length, in bytes, of a member string.
pub const MAX_MEMBER_LEN: usize = 10;

/// Maximum number of levels a node's forward tower may span.
pub const MAX_LEVEL: usize = 15;

/// Probability `p` used by the geometric level-selection draw, the same
/// value the original skiplist used to keep expected tower height at
/// `log(1/p) N`.
pub const SKIPLIST_P: f64 = 0.25;

/// Number of staged writes the persistent dict will buffer before forcing
/// a flush to the backing store, independent of LRU pressure.
pub const BULK_WRITE_THRESHOLD: usize = 256;

/// Default number of live node slots the LRU write buffer holds before it
/// starts evicting clean entries to make room.
pub const DEFAULT_LRU_CAPACITY: usize = 1024;

/// Key under which the root sentinel node is persisted. Never evicted from
/// the LRU ring; never visited by range scans.
pub const ZSET_ROOT_KEY: &str = "";

/// Lifecycle state of a dict entry sitting in the LRU write buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LruState {
    /// In sync with the persistent store; safe to evict without writing.
    Ok,
    /// Modified since it was last persisted; must be flushed before evicting.
    Dirty,
    /// Logically removed; must be deleted from the persistent store on flush.
    Expired,
}
