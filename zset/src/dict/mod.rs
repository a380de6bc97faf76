//! The `Dict` abstraction: where node records actually live.
//!
//! The engine is written entirely against this trait, so it never knows
//! whether a member's node sits in a plain hash map or behind an
//! LRU-bounded write-through cache over a persistent store. Every method
//! takes and returns a `Self::Handle` rather than a borrowed reference —
//! the engine never holds a reference across two dict calls, only a
//! handle it resolves fresh each time through [`Dict::get`]/[`Dict::get_mut`].

pub mod memory;
pub mod persistent;

use zset_core::{Result, Score};

use crate::node::NodeRecord;

pub trait Dict<S: Score> {
    /// Opaque reference to a live node. Cheap to copy, resolved through
    /// `get`/`get_mut` rather than dereferenced directly.
    type Handle: Copy + Eq;

    /// Handle to the dedicated root sentinel, stable for the dict's lifetime.
    fn root(&self) -> Self::Handle;

    /// True if this dict was opened against a store that already held data
    /// — the engine uses this once, right after construction, to decide
    /// whether to run the cold-open recovery scan instead of starting at
    /// cardinality zero.
    fn recovered(&self) -> bool;

    /// Looks up a node by member. Flushes any pending batch first, so a
    /// lookup always sees the effect of prior writes in the same batch.
    fn find(&mut self, member: &str) -> Option<Self::Handle>;

    fn get(&self, handle: Self::Handle) -> &NodeRecord<S>;
    fn get_mut(&mut self, handle: Self::Handle) -> &mut NodeRecord<S>;

    /// Allocates storage for a brand-new member and returns its handle.
    /// The returned node starts at level 0 with no forward entries set;
    /// the caller fills it in.
    fn new_key_buffer(&mut self, member: &str) -> Self::Handle;

    /// Removes a node from the live working set. Backends whose delete is
    /// staged rather than immediate (e.g. the persistent dict's write
    /// buffer) may keep the slot resident until that delete is durable,
    /// rather than free it here — freeing it early would let a lookup that
    /// falls through to the backing store resurrect the still-durable old
    /// data.
    fn erase(&mut self, handle: Self::Handle);

    /// Grows the write buffer to stay roughly proportional to cardinality.
    /// A no-op for backends with no bounded working set.
    fn resize_lru_capacity(&mut self, card: usize);

    /// Forces a single handle's record to the persistent store immediately,
    /// bypassing the batch.
    fn persist(&mut self, handle: Self::Handle) -> Result<()>;

    /// Stages `handle` to be written on the next flush.
    fn batch_add(&mut self, handle: Self::Handle);

    /// Stages `handle` to be deleted on the next flush.
    fn batch_delete(&mut self, handle: Self::Handle);

    /// Flushes every staged write and delete to the persistent store in one
    /// batch. A no-op for backends with nothing to flush.
    fn batch_persist(&mut self) -> Result<()>;
}
