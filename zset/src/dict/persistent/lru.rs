//! A bounded LRU ring: a doubly-linked list threaded through a flat `Vec`
//! of slots, so promote/evict are pointer-swap cheap and every live node
//! gets a stable integer handle for as long as it stays resident.

use std::collections::HashMap;

use zset_core::{LruState, Score};

use crate::node::NodeRecord;

/// A handle into the ring. Stable only while the entry stays resident —
/// once evicted, re-inserting the same member yields a different handle.
pub type RingHandle = u32;

struct Slot<S> {
    prev: Option<RingHandle>,
    next: Option<RingHandle>,
    record: NodeRecord<S>,
    state: LruState,
}

/// Fixed-capacity, most-recently-used-at-head cache of node records.
pub struct LruRing<S: Score> {
    capacity: usize,
    slots: Vec<Option<Slot<S>>>,
    free_list: Vec<RingHandle>,
    index: HashMap<String, RingHandle>,
    head: Option<RingHandle>,
    tail: Option<RingHandle>,
}

impl<S: Score> LruRing<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: Vec::new(),
            free_list: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// All slots occupied, but *safe to reuse*: the tail's write (if any)
    /// is already durable. `false` when capacity is reached but the tail is
    /// still dirty/expired — the caller must flush before evicting it.
    pub fn is_full(&self) -> bool {
        self.at_capacity() && self.tail_is_ok()
    }

    pub fn at_capacity(&self) -> bool {
        self.index.len() >= self.capacity
    }

    /// `true` if there's no tail yet, or the tail's pending write has
    /// already been staged/flushed.
    pub fn tail_is_ok(&self) -> bool {
        match self.tail {
            Some(h) => self.state(h) == LruState::Ok,
            None => true,
        }
    }

    /// Grows the ring's capacity, never shrinks it — a smaller `capacity`
    /// than the current one is ignored.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = self.capacity.max(capacity).max(1);
    }

    pub fn handle_of(&self, member: &str) -> Option<RingHandle> {
        self.index.get(member).copied()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.index.contains_key(member)
    }

    pub fn record(&self, handle: RingHandle) -> &NodeRecord<S> {
        &self.slots[handle as usize]
            .as_ref()
            .expect("dangling LRU ring handle")
            .record
    }

    pub fn record_mut(&mut self, handle: RingHandle) -> &mut NodeRecord<S> {
        &mut self.slots[handle as usize]
            .as_mut()
            .expect("dangling LRU ring handle")
            .record
    }

    pub fn state(&self, handle: RingHandle) -> LruState {
        self.slots[handle as usize]
            .as_ref()
            .expect("dangling LRU ring handle")
            .state
    }

    pub fn set_state(&mut self, handle: RingHandle, state: LruState) {
        self.slots[handle as usize]
            .as_mut()
            .expect("dangling LRU ring handle")
            .state = state;
    }

    /// Marks a just-flushed entry `Ok`, tolerating a handle whose slot was
    /// since freed (the node was erased before its staged write flushed).
    pub fn settle(&mut self, handle: RingHandle) {
        if let Some(Some(slot)) = self.slots.get_mut(handle as usize) {
            slot.state = LruState::Ok;
        }
    }

    fn unlink(&mut self, handle: RingHandle) {
        let (prev, next) = {
            let slot = self.slots[handle as usize].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p as usize].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n as usize].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, handle: RingHandle) {
        let old_head = self.head;
        {
            let slot = self.slots[handle as usize].as_mut().unwrap();
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h as usize].as_mut().unwrap().prev = Some(handle);
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
    }

    /// Moves an already-resident entry to the front (most recently used).
    pub fn promote(&mut self, handle: RingHandle) {
        if self.head == Some(handle) {
            return;
        }
        self.unlink(handle);
        self.push_front(handle);
    }

    /// Inserts a brand-new entry at the front, evicting the tail first if
    /// the ring is full (`is_full()`, which only holds once the tail is
    /// `Ok`). Callers that need to make room for an allocation are
    /// responsible for flushing first if the tail isn't `Ok` yet — this
    /// never evicts an unflushed write on its own. Returns the new handle
    /// and, if an eviction happened, the evicted member and its record.
    pub fn insert(
        &mut self,
        member: &str,
        record: NodeRecord<S>,
        state: LruState,
    ) -> (RingHandle, Option<(String, NodeRecord<S>, LruState)>) {
        let evicted = if self.is_full() {
            self.evict_tail()
        } else {
            None
        };

        let handle = match self.free_list.pop() {
            Some(h) => {
                self.slots[h as usize] = Some(Slot {
                    prev: None,
                    next: None,
                    record,
                    state,
                });
                h
            }
            None => {
                self.slots.push(Some(Slot {
                    prev: None,
                    next: None,
                    record,
                    state,
                }));
                (self.slots.len() - 1) as RingHandle
            }
        };
        self.index.insert(member.to_string(), handle);
        self.push_front(handle);
        (handle, evicted)
    }

    fn evict_tail(&mut self) -> Option<(String, NodeRecord<S>, LruState)> {
        let handle = self.tail?;
        self.unlink(handle);
        let slot = self.slots[handle as usize].take().unwrap();
        if self.index.get(&slot.record.member) == Some(&handle) {
            self.index.remove(&slot.record.member);
        }
        self.free_list.push(handle);
        Some((slot.record.member.clone(), slot.record, slot.state))
    }

    /// Finalizes a flushed delete: unlinks and frees the slot. Tolerates a
    /// handle whose slot was already freed, and leaves the member index
    /// alone if it has since been repointed at a different handle (a
    /// reinsert under the same member key, staged before this one's delete
    /// flushed).
    pub fn remove(&mut self, handle: RingHandle) -> Option<NodeRecord<S>> {
        if self.slots.get(handle as usize).map_or(true, Option::is_none) {
            return None;
        }
        self.unlink(handle);
        let slot = self.slots[handle as usize].take().unwrap();
        if self.index.get(&slot.record.member) == Some(&handle) {
            self.index.remove(&slot.record.member);
        }
        self.free_list.push(handle);
        Some(slot.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_and_promotes() {
        let mut ring: LruRing<i64> = LruRing::new(2);
        let (a, evicted) = ring.insert("a", NodeRecord::new("a", 1, 0), LruState::Ok);
        assert!(evicted.is_none());
        let (_b, evicted) = ring.insert("b", NodeRecord::new("b", 2, 0), LruState::Ok);
        assert!(evicted.is_none());
        ring.promote(a);
        let (_c, evicted) = ring.insert("c", NodeRecord::new("c", 3, 0), LruState::Ok);
        // "b" was least recently used (a was promoted), so it gets evicted.
        assert_eq!(evicted.unwrap().0, "b");
        assert!(ring.handle_of("b").is_none());
        assert!(ring.handle_of("a").is_some());
        assert!(ring.handle_of("c").is_some());
    }

    #[test]
    fn remove_frees_slot_for_reuse() {
        let mut ring: LruRing<i64> = LruRing::new(4);
        let (h, _) = ring.insert("a", NodeRecord::new("a", 1, 0), LruState::Dirty);
        ring.remove(h);
        assert!(ring.handle_of("a").is_none());
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn resize_never_shrinks() {
        let mut ring: LruRing<i64> = LruRing::new(4);
        ring.resize(16);
        ring.resize(8); // smaller than current: ignored
        ring.insert("a", NodeRecord::new("a", 1, 0), LruState::Ok);
        // 15 more fits exactly at capacity 16 (total 16) without evicting "a".
        // At the (wrongly shrunk) capacity of 8 "a" would have been evicted
        // long before this loop finished.
        for i in 0..15 {
            ring.insert(&format!("m{i}"), NodeRecord::new(format!("m{i}"), i, 0), LruState::Ok);
        }
        assert!(ring.handle_of("a").is_some(), "capacity should not have shrunk back below 16");
    }
}
