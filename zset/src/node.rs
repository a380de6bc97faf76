//! The node record: one skiplist tower plus the member/score it represents.
//!
//! Every node, including the dedicated root sentinel, owns a fixed-size
//! array of forward entries — one slot per possible level, regardless of
//! the node's own tower height. Levels above a node's height simply stay at
//! their default (no target, zero span), which keeps indexing by level
//! branch-free and mirrors how the node is laid out once persisted.

use std::cmp::Ordering;

use bytes::{Buf, BufMut, BytesMut};
use zset_core::{Error, Result, Score, MAX_LEVEL};

/// A single level of a node's forward tower: the next node at that level,
/// its score (cached so range scans don't need an extra lookup), and the
/// number of nodes skipped over to reach it.
#[derive(Debug, Clone)]
pub struct ForwardEntry<S> {
    /// `None` means this level's forward pointer is the tail sentinel —
    /// nothing sorts after it.
    pub target: Option<String>,
    pub score: S,
    pub span: u32,
}

impl<S: Score> Default for ForwardEntry<S> {
    fn default() -> Self {
        Self {
            target: None,
            score: S::default(),
            span: 0,
        }
    }
}

/// A node in the skiplist: its own (member, score) pair, the height of its
/// tower, and one [`ForwardEntry`] per level up to [`MAX_LEVEL`].
///
/// The root sentinel is a `NodeRecord` like any other, with an empty
/// member; its `level` field doubles as the skiplist's current max level,
/// persisted so a cold open can recover it without rescanning everything.
#[derive(Debug, Clone)]
pub struct NodeRecord<S> {
    pub member: String,
    pub score: S,
    pub level: usize,
    pub forward: Vec<ForwardEntry<S>>,
}

impl<S: Score> NodeRecord<S> {
    pub fn new(member: impl Into<String>, score: S, level: usize) -> Self {
        Self {
            member: member.into(),
            score,
            level,
            forward: (0..MAX_LEVEL).map(|_| ForwardEntry::default()).collect(),
        }
    }

    /// The dedicated root sentinel: empty member, default score, no levels
    /// until the first insert extends it.
    pub fn root() -> Self {
        Self::new(String::new(), S::default(), 0)
    }

    pub fn forward(&self, level: usize) -> &ForwardEntry<S> {
        &self.forward[level - 1]
    }

    pub fn forward_mut(&mut self, level: usize) -> &mut ForwardEntry<S> {
        &mut self.forward[level - 1]
    }

    /// Span at `level`, or 0 above the node's own height — matching the
    /// convention that unused levels never get spans.
    pub fn step(&self, level: usize) -> u32 {
        if level <= self.level {
            self.forward(level).span
        } else {
            0
        }
    }

    pub fn set_step(&mut self, level: usize, step: u32) {
        self.forward_mut(level).span = step;
    }

    pub fn inc_step(&mut self, level: usize) {
        self.forward_mut(level).span += 1;
    }

    pub fn dec_step(&mut self, level: usize) {
        self.forward_mut(level).span -= 1;
    }

    pub fn set_forward(&mut self, level: usize, target: Option<&str>, score: S) {
        let entry = self.forward_mut(level);
        entry.target = target.map(|m| m.to_string());
        entry.score = score;
    }

    pub fn clear_forward(&mut self, level: usize) {
        let entry = self.forward_mut(level);
        entry.target = None;
        entry.span = 0;
    }

    /// Orders this node's forward entry at `level` against `(score, member)`.
    /// `Less` means the forward entry sorts before the target and traversal
    /// should keep advancing; `Greater` covers both "forward entry sorts
    /// after" and "there is no forward entry" (treated as +infinity).
    pub fn compare(&self, level: usize, score: &S, member: &str) -> Ordering {
        let entry = self.forward(level);
        match &entry.target {
            None => Ordering::Greater,
            Some(fwd_member) => match entry.score.cmp_score(score) {
                Ordering::Equal => fwd_member.as_str().cmp(member),
                ord => ord,
            },
        }
    }

    pub fn member_compare(&self, level: usize, member: &str) -> Ordering {
        match &self.forward(level).target {
            None => Ordering::Greater,
            Some(fwd_member) => fwd_member.as_str().cmp(member),
        }
    }

    pub fn score_compare(&self, level: usize, score: &S) -> Ordering {
        let entry = self.forward(level);
        match &entry.target {
            None => Ordering::Greater,
            Some(_) => entry.score.cmp_score(score),
        }
    }

    /// Orders this node's own (member, score) — not a forward entry —
    /// against `(score, member)`. The root sentinel's member is always
    /// empty, so it naturally sorts as +infinity here too.
    pub fn own_compare(&self, score: &S, member: &str) -> Ordering {
        if self.member.is_empty() {
            Ordering::Greater
        } else {
            match self.score.cmp_score(score) {
                Ordering::Equal => self.member.as_str().cmp(member),
                ord => ord,
            }
        }
    }

    pub fn own_score_compare(&self, score: &S) -> Ordering {
        if self.member.is_empty() {
            Ordering::Greater
        } else {
            self.score.cmp_score(score)
        }
    }

    /// Encodes this node to the binary layout stored by the persistent dict:
    /// own (member, score), tower height, then one fixed-width tuple of
    /// (presence, member, score, span) per level up to `MAX_LEVEL`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(self.level as u8);
        buf.put_u16_le(self.member.len() as u16);
        buf.put_slice(self.member.as_bytes());
        let mut score_bytes = Vec::with_capacity(S::SIZE);
        self.score.write_bytes(&mut score_bytes);
        buf.put_slice(&score_bytes);

        for level in 1..=MAX_LEVEL {
            let entry = self.forward(level);
            match &entry.target {
                None => buf.put_u8(0),
                Some(member) => {
                    buf.put_u8(1);
                    buf.put_u16_le(member.len() as u16);
                    buf.put_slice(member.as_bytes());
                    let mut score_bytes = Vec::with_capacity(S::SIZE);
                    entry.score.write_bytes(&mut score_bytes);
                    buf.put_slice(&score_bytes);
                    buf.put_u32_le(entry.span);
                }
            }
        }
        buf.to_vec()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = data;
        if cursor.remaining() < 1 + 2 {
            return Err(Error::Corruption("node record too small".to_string()));
        }
        let level = cursor.get_u8() as usize;
        let member_len = cursor.get_u16_le() as usize;
        if cursor.remaining() < member_len + S::SIZE {
            return Err(Error::Corruption("node record truncated".to_string()));
        }
        let member = std::str::from_utf8(&cursor[..member_len])
            .map_err(|e| Error::Corruption(e.to_string()))?
            .to_string();
        cursor.advance(member_len);
        let score = S::read_bytes(&cursor[..S::SIZE]);
        cursor.advance(S::SIZE);

        let mut node = NodeRecord::new(member, score, level);
        for lvl in 1..=MAX_LEVEL {
            if cursor.remaining() < 1 {
                return Err(Error::Corruption("node record missing level tuple".to_string()));
            }
            let present = cursor.get_u8();
            if present == 0 {
                continue;
            }
            if cursor.remaining() < 2 {
                return Err(Error::Corruption("node record truncated".to_string()));
            }
            let fwd_len = cursor.get_u16_le() as usize;
            if cursor.remaining() < fwd_len + S::SIZE + 4 {
                return Err(Error::Corruption("node record truncated".to_string()));
            }
            let fwd_member = std::str::from_utf8(&cursor[..fwd_len])
                .map_err(|e| Error::Corruption(e.to_string()))?
                .to_string();
            cursor.advance(fwd_len);
            let fwd_score = S::read_bytes(&cursor[..S::SIZE]);
            cursor.advance(S::SIZE);
            let span = cursor.get_u32_le();
            node.set_forward(lvl, Some(fwd_member.as_str()), fwd_score);
            node.set_step(lvl, span);
        }
        Ok(node)
    }
}
