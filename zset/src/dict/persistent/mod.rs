//! A `Dict` backed by an LRU-bounded write-through cache over a persistent
//! key/value store: the recoverable backend, grounded in the original
//! RocksDB-backed dict but generalized over any [`KvStore`].

pub mod lru;
pub mod store;

use std::collections::HashMap;
use std::path::Path;

use log::{debug, trace, warn};
use zset_core::{Error, LruState, Result, Score, BULK_WRITE_THRESHOLD, DEFAULT_LRU_CAPACITY, ZSET_ROOT_KEY};

use crate::dict::persistent::lru::{LruRing, RingHandle};
use crate::dict::persistent::store::{FjallStore, KvStore};
use crate::dict::Dict;
use crate::node::NodeRecord;

/// A handle into a [`PersistentDict`]: either the dedicated root sentinel,
/// kept resident outside the LRU ring, or a live ring slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Root,
    Ring(RingHandle),
}

enum PendingOp {
    /// `ring` is `Some` for a ring-resident node (reset to `Ok` once this
    /// put lands), `None` for the root sentinel (kept outside the ring).
    Put {
        key: Vec<u8>,
        value: Vec<u8>,
        ring: Option<RingHandle>,
    },
    /// `ring` is the slot to finally unlink from the ring once this delete
    /// actually lands in the store (the slot itself stays resident, marked
    /// `Expired`, until then — see `PersistentDict::erase`).
    Delete { key: Vec<u8>, ring: Option<RingHandle> },
}

pub struct PersistentDict<S: Score, K: KvStore = FjallStore> {
    store: K,
    lru: LruRing<S>,
    root: NodeRecord<S>,
    recovered: bool,
    pending: Vec<PendingOp>,
}

impl<S: Score> PersistentDict<S, FjallStore> {
    /// Opens (or creates) a persistent dict rooted at `path`, backed by an
    /// embedded `fjall` keyspace, with the default initial LRU capacity.
    pub fn open(path: &Path, error_if_exists: bool) -> Result<Self> {
        let store = FjallStore::open(path, error_if_exists)?;
        Self::with_store(store, DEFAULT_LRU_CAPACITY)
    }

    /// Like [`PersistentDict::open`], but with a caller-chosen initial LRU
    /// capacity instead of [`DEFAULT_LRU_CAPACITY`].
    pub fn open_with_capacity(path: &Path, error_if_exists: bool, capacity: usize) -> Result<Self> {
        let store = FjallStore::open(path, error_if_exists)?;
        Self::with_store(store, capacity)
    }
}

impl<S: Score, K: KvStore> PersistentDict<S, K> {
    /// Wraps an already-open store. Used directly by callers supplying a
    /// custom [`KvStore`] implementation, and by [`PersistentDict::open`].
    pub fn with_store(store: K, initial_capacity: usize) -> Result<Self> {
        let existing = store
            .get(ZSET_ROOT_KEY.as_bytes())
            .map_err(|e| Error::BackendOpen(e.to_string()))?;

        let (root, recovered) = match existing {
            Some(bytes) => {
                debug!("recovering zset root from persistent store");
                (NodeRecord::decode(&bytes)?, true)
            }
            None => (NodeRecord::root(), false),
        };

        Ok(Self {
            store,
            lru: LruRing::new(initial_capacity),
            root,
            recovered,
            pending: Vec::new(),
        })
    }

    /// Whether the staged batch has grown large enough, or the ring is
    /// tight enough, that it should drain now rather than wait for
    /// teardown. Mirrors `ROCKSDB_BULK_WRITE_SIZE` triggering a flush in the
    /// original engine.
    fn should_flush(&self) -> bool {
        self.pending.len() >= BULK_WRITE_THRESHOLD || self.lru.at_capacity()
    }

    /// Flushes only if a threshold has tripped. Used on the hot path
    /// (lookups, post-mutation) where an unconditional flush would defeat
    /// the point of batching.
    fn maybe_flush(&mut self) -> Result<()> {
        if self.should_flush() {
            self.flush_pending()
        } else {
            Ok(())
        }
    }

    /// Unconditionally drains the pending batch to the store. Used before
    /// an eviction that would otherwise drop an unflushed write, and on
    /// teardown.
    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // A member can be staged for delete-then-put within one flush window
        // (a `Zadd` score change reinserts under the same key). Keep only
        // each key's most recent op so the write batch reflects the final
        // state rather than applying every put before every delete. Ring
        // handles are tracked from every staged op, not just the survivor —
        // the reinsert allocates a fresh ring slot, so the superseded one
        // still needs its own cleanup even though its delete never reaches
        // the store.
        let mut last: HashMap<Vec<u8>, PendingOp> = HashMap::new();
        let mut settled = Vec::new();
        let mut expired = Vec::new();
        for op in self.pending.drain(..) {
            match &op {
                PendingOp::Put { ring: Some(h), .. } => settled.push(*h),
                PendingOp::Delete { ring: Some(h), .. } => expired.push(*h),
                _ => {}
            }
            let key = match &op {
                PendingOp::Put { key, .. } => key.clone(),
                PendingOp::Delete { key, .. } => key.clone(),
            };
            last.insert(key, op);
        }

        let mut puts = Vec::new();
        let mut deletes = Vec::new();
        for op in last.into_values() {
            match op {
                PendingOp::Put { key, value, .. } => puts.push((key, value)),
                PendingOp::Delete { key, .. } => deletes.push(key),
            }
        }
        trace!("flushing {} put(s), {} delete(s)", puts.len(), deletes.len());
        self.store.write_batch(puts, deletes)?;
        for h in settled {
            self.lru.settle(h);
        }
        // Only now that the delete is durable is it safe to drop the shadow
        // slot from the ring; see `rocksdb_dict.h`'s `lru_->Remove(key)` on
        // this same path.
        for h in expired {
            self.lru.remove(h);
        }
        Ok(())
    }

    /// Forces a flush before an allocation that might evict the LRU tail,
    /// so an eviction never silently drops an unflushed dirty/expired slot.
    fn ensure_room_for_eviction(&mut self) {
        if self.lru.at_capacity() && !self.lru.tail_is_ok() {
            if let Err(e) = self.flush_pending() {
                warn!("failed to flush before LRU eviction: {e}");
            }
        }
    }

    fn load(&mut self, member: &str) -> Result<Option<RingHandle>> {
        let bytes = match self.store.get(member.as_bytes())? {
            Some(b) => b,
            None => return Ok(None),
        };
        let record = NodeRecord::decode(&bytes)?;
        self.ensure_room_for_eviction();
        let (handle, evicted) = self.lru.insert(member, record, LruState::Ok);
        if let Some((member, _, state)) = evicted {
            trace!("LRU evicted {member} (was {state:?})");
        }
        Ok(Some(handle))
    }
}

impl<S: Score, K: KvStore> Drop for PersistentDict<S, K> {
    /// Teardown must flush any pending writes/deletes before the store
    /// handle is released, per the engine's durability contract.
    fn drop(&mut self) {
        if let Err(e) = self.flush_pending() {
            warn!("failed to flush pending writes on teardown: {e}");
        }
    }
}

impl<S: Score, K: KvStore> Dict<S> for PersistentDict<S, K> {
    type Handle = Handle;

    fn root(&self) -> Handle {
        Handle::Root
    }

    fn recovered(&self) -> bool {
        self.recovered
    }

    fn find(&mut self, member: &str) -> Option<Handle> {
        if let Err(e) = self.maybe_flush() {
            warn!("failed to flush pending writes before lookup: {e}");
        }
        if let Some(handle) = self.lru.handle_of(member) {
            // An `Expired` slot is a shadow of a deleted member kept resident
            // only until its delete flushes — it must not be resurrected by
            // a lookup that falls through to the store early.
            if self.lru.state(handle) == LruState::Expired {
                return None;
            }
            self.lru.promote(handle);
            return Some(Handle::Ring(handle));
        }
        match self.load(member) {
            Ok(Some(handle)) => Some(Handle::Ring(handle)),
            Ok(None) => None,
            Err(e) => {
                warn!("store lookup for {member:?} failed: {e}");
                None
            }
        }
    }

    fn get(&self, handle: Handle) -> &NodeRecord<S> {
        match handle {
            Handle::Root => &self.root,
            Handle::Ring(h) => self.lru.record(h),
        }
    }

    fn get_mut(&mut self, handle: Handle) -> &mut NodeRecord<S> {
        match handle {
            Handle::Root => &mut self.root,
            Handle::Ring(h) => self.lru.record_mut(h),
        }
    }

    fn new_key_buffer(&mut self, member: &str) -> Handle {
        self.ensure_room_for_eviction();
        let (handle, evicted) =
            self.lru
                .insert(member, NodeRecord::new(member, S::default(), 0), LruState::Dirty);
        if let Some((member, _, state)) = evicted {
            trace!("LRU evicted {member} (was {state:?}) to make room for new key");
        }
        Handle::Ring(handle)
    }

    fn erase(&mut self, _handle: Handle) {
        // A no-op on this backend: `batch_delete` already marked the slot
        // `Expired` and it must stay resident as a shadow until that delete
        // is durable, or a lookup that misses the (prematurely vacated)
        // ring would fall through to `load` and reload the still-durable
        // old bytes. The slot is actually freed by `flush_pending`, once
        // its delete has landed in the store.
    }

    fn resize_lru_capacity(&mut self, card: usize) {
        let target = card.next_power_of_two().max(DEFAULT_LRU_CAPACITY);
        self.lru.resize(target);
    }

    fn persist(&mut self, handle: Handle) -> Result<()> {
        let (key, bytes) = match handle {
            Handle::Root => (ZSET_ROOT_KEY.as_bytes().to_vec(), self.root.encode()),
            Handle::Ring(h) => {
                let record = self.lru.record(h);
                (record.member.as_bytes().to_vec(), record.encode())
            }
        };
        self.store.write_batch(vec![(key, bytes)], Vec::new())
    }

    fn batch_add(&mut self, handle: Handle) {
        let (key, value, ring) = match handle {
            Handle::Root => (ZSET_ROOT_KEY.as_bytes().to_vec(), self.root.encode(), None),
            Handle::Ring(h) => {
                self.lru.set_state(h, LruState::Dirty);
                let record = self.lru.record(h);
                (
                    record.member.as_bytes().to_vec(),
                    record.encode(),
                    Some(h),
                )
            }
        };
        self.pending.push(PendingOp::Put { key, value, ring });
    }

    fn batch_delete(&mut self, handle: Handle) {
        let (key, ring) = match handle {
            Handle::Root => return, // the root sentinel is never deleted
            Handle::Ring(h) => {
                self.lru.set_state(h, LruState::Expired);
                (self.lru.record(h).member.as_bytes().to_vec(), Some(h))
            }
        };
        self.pending.push(PendingOp::Delete { key, ring });
    }

    fn batch_persist(&mut self) -> Result<()> {
        self.maybe_flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_dict(dir: &TempDir) -> PersistentDict<i64> {
        PersistentDict::open(dir.path(), false).unwrap()
    }

    #[test]
    fn fresh_open_is_not_recovered() {
        let dir = TempDir::new().unwrap();
        let dict = open_dict(&dir);
        assert!(!dict.recovered());
    }

    #[test]
    fn persist_and_reopen_round_trips_root() {
        let dir = TempDir::new().unwrap();
        {
            let mut dict = open_dict(&dir);
            dict.get_mut(dict.root()).level = 3;
            let root = dict.root();
            dict.persist(root).unwrap();
        }
        let dict: PersistentDict<i64> = PersistentDict::open(dir.path(), false).unwrap();
        assert!(dict.recovered());
        assert_eq!(dict.get(dict.root()).level, 3);
    }

    #[test]
    fn error_if_exists_rejects_nonempty_store() {
        let dir = TempDir::new().unwrap();
        {
            let mut dict = open_dict(&dir);
            dict.get_mut(dict.root()).level = 1;
            let root = dict.root();
            dict.persist(root).unwrap();
        }
        let reopened: Result<PersistentDict<i64>> = PersistentDict::open(dir.path(), true);
        assert!(matches!(reopened, Err(Error::AlreadyExists)));
    }

    #[test]
    fn find_reloads_from_store_after_eviction() {
        let dir = TempDir::new().unwrap();
        let mut dict: PersistentDict<i64> = PersistentDict::with_store(
            crate::dict::persistent::store::FjallStore::open(dir.path(), false).unwrap(),
            1,
        )
        .unwrap();

        let h = dict.new_key_buffer("alice");
        dict.get_mut(h).score = 10;
        dict.batch_add(h);
        dict.batch_persist().unwrap(); // capacity 1 is already at_capacity(): flushes now

        // Capacity is 1 and "alice" is clean; inserting "bob" evicts it from
        // the ring, but it is already durable.
        let h2 = dict.new_key_buffer("bob");
        dict.get_mut(h2).score = 20;

        let found = dict.find("alice").expect("reloaded from store");
        assert_eq!(dict.get(found).score, 10);
    }

    #[test]
    fn erased_member_does_not_resurrect_before_or_after_flush() {
        let dir = TempDir::new().unwrap();
        {
            let mut dict = open_dict(&dir);
            let h = dict.new_key_buffer("alice");
            dict.get_mut(h).score = 10;
            dict.persist(h).unwrap(); // durable, bypassing the batch

            // Mirrors `Zset::impl_zrem`'s call order: stage the delete, then
            // erase. The delete hasn't flushed yet (below threshold), so
            // the still-durable bytes must not resurface on a lookup.
            dict.batch_delete(h);
            dict.erase(h);
            assert!(dict.find("alice").is_none(), "staged delete must hide the member");
            // dict drops here, forcing the staged delete to flush.
        }

        let mut reopened: PersistentDict<i64> = PersistentDict::open(dir.path(), false).unwrap();
        assert!(
            reopened.find("alice").is_none(),
            "deleted member must not survive a reopen once the delete is durable"
        );
    }

    #[test]
    fn batch_persist_defers_below_threshold_but_teardown_flushes() {
        let dir = TempDir::new().unwrap();
        {
            let mut dict = open_dict(&dir);
            let h = dict.new_key_buffer("alice");
            dict.get_mut(h).score = 7;
            dict.batch_add(h);
            dict.batch_persist().unwrap(); // below threshold: no-op
            assert!(
                dict.store.get(b"alice").unwrap().is_none(),
                "a single staged write should not flush eagerly"
            );
            // dict drops here, forcing a teardown flush.
        }
        let mut reopened: PersistentDict<i64> = PersistentDict::open(dir.path(), false).unwrap();
        let h = reopened.find("alice").expect("teardown flushed the write");
        assert_eq!(reopened.get(h).score, 7);
    }

    #[test]
    fn eviction_forces_a_flush_of_a_dirty_tail() {
        let dir = TempDir::new().unwrap();
        let mut dict: PersistentDict<i64> = PersistentDict::with_store(
            crate::dict::persistent::store::FjallStore::open(dir.path(), false).unwrap(),
            1,
        )
        .unwrap();
        let h1 = dict.new_key_buffer("alice");
        dict.get_mut(h1).score = 1;
        dict.batch_add(h1);

        // Capacity is 1 and "alice" is still dirty; allocating "bob" must
        // flush "alice" first rather than silently dropping its write.
        let h2 = dict.new_key_buffer("bob");
        dict.get_mut(h2).score = 2;
        dict.batch_add(h2);

        assert_eq!(dict.store.get(b"alice").unwrap().is_some(), true);
    }
}
