//! A flat in-memory `Dict`: a growable slot pool plus a freelist, the same
//! shape as a memory-pool-backed hash map over pointers — reused here as a
//! hash map over slot indices instead of raw pointers.

use std::collections::HashMap;

use zset_core::{Result, Score};

use crate::dict::Dict;
use crate::node::NodeRecord;

/// A handle into [`InMemoryDict`]'s slot pool.
pub type Handle = u32;

pub struct InMemoryDict<S: Score> {
    slots: Vec<Option<NodeRecord<S>>>,
    free_list: Vec<Handle>,
    index: HashMap<String, Handle>,
    root: Handle,
}

impl<S: Score> InMemoryDict<S> {
    pub fn new() -> Self {
        Self {
            slots: vec![Some(NodeRecord::root())],
            free_list: Vec::new(),
            index: HashMap::new(),
            root: 0,
        }
    }

    fn alloc(&mut self, node: NodeRecord<S>) -> Handle {
        if let Some(handle) = self.free_list.pop() {
            self.slots[handle as usize] = Some(node);
            handle
        } else {
            self.slots.push(Some(node));
            (self.slots.len() - 1) as Handle
        }
    }
}

impl<S: Score> Default for InMemoryDict<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Score> Dict<S> for InMemoryDict<S> {
    type Handle = Handle;

    fn root(&self) -> Handle {
        self.root
    }

    fn recovered(&self) -> bool {
        false
    }

    fn find(&mut self, member: &str) -> Option<Handle> {
        self.index.get(member).copied()
    }

    fn get(&self, handle: Handle) -> &NodeRecord<S> {
        self.slots[handle as usize]
            .as_ref()
            .expect("dangling in-memory dict handle")
    }

    fn get_mut(&mut self, handle: Handle) -> &mut NodeRecord<S> {
        self.slots[handle as usize]
            .as_mut()
            .expect("dangling in-memory dict handle")
    }

    fn new_key_buffer(&mut self, member: &str) -> Handle {
        let handle = self.alloc(NodeRecord::new(member, S::default(), 0));
        self.index.insert(member.to_string(), handle);
        handle
    }

    fn erase(&mut self, handle: Handle) {
        if let Some(node) = self.slots[handle as usize].take() {
            self.index.remove(&node.member);
        }
        self.free_list.push(handle);
    }

    fn resize_lru_capacity(&mut self, _card: usize) {
        // Unbounded: every member stays resident.
    }

    fn persist(&mut self, _handle: Handle) -> Result<()> {
        Ok(())
    }

    fn batch_add(&mut self, _handle: Handle) {}

    fn batch_delete(&mut self, _handle: Handle) {}

    fn batch_persist(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_buffer_is_findable() {
        let mut dict: InMemoryDict<i64> = InMemoryDict::new();
        let h = dict.new_key_buffer("alice");
        assert_eq!(dict.find("alice"), Some(h));
        assert_eq!(dict.get(h).member, "alice");
    }

    #[test]
    fn erase_frees_the_slot_for_reuse() {
        let mut dict: InMemoryDict<i64> = InMemoryDict::new();
        let h1 = dict.new_key_buffer("alice");
        dict.erase(h1);
        assert_eq!(dict.find("alice"), None);
        let h2 = dict.new_key_buffer("bob");
        assert_eq!(h1, h2);
        assert_eq!(dict.get(h2).member, "bob");
    }

    #[test]
    fn root_is_never_findable_by_member() {
        let mut dict: InMemoryDict<i64> = InMemoryDict::new();
        assert_eq!(dict.find(""), None);
        assert_eq!(dict.get(dict.root()).member, "");
    }
}
