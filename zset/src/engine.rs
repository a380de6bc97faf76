//! The sorted-set engine: an augmented skiplist indexed by (score, member)
//! order, written entirely against the [`Dict`] abstraction so the same
//! traversal and mutation code runs whether members live in a flat
//! in-memory map or behind an LRU-bounded persistent cache.
//!
//! Every level-`i` forward pointer caches a span — the number of nodes
//! skipped to reach it — which is what turns `Zrank`/`Zrange` from an O(N)
//! walk into an O(log N) descent: see [`Zset::find_by_rank`].

use std::cmp::Ordering;

use log::warn;
use rand::Rng;
use zset_core::{Error, Result, Score, MAX_LEVEL, MAX_MEMBER_LEN, SKIPLIST_P};

use crate::config::EngineOptions;
use crate::dict::memory::InMemoryDict;
use crate::dict::persistent::store::FjallStore;
use crate::dict::persistent::PersistentDict;
use crate::dict::Dict;

fn validate_member(member: &str) -> Result<()> {
    if member.is_empty() {
        return Err(Error::EmptyMember);
    }
    if member.len() > MAX_MEMBER_LEN {
        return Err(Error::MemberTooLong {
            len: member.len(),
            max: MAX_MEMBER_LEN,
        });
    }
    Ok(())
}

fn rand_level() -> usize {
    let mut level = 1;
    let mut rng = rand::thread_rng();
    while level < MAX_LEVEL && rng.gen::<f64>() < SKIPLIST_P {
        level += 1;
    }
    level
}

/// Sums level-1 spans across the whole skiplist to reconstruct
/// cardinality on a cold open, where only the root's tower height
/// survives in the persisted record.
fn find_last<S: Score, D: Dict<S>>(dict: &mut D, root: D::Handle, max_level: usize) -> u32 {
    let mut total = 0u32;
    let mut ms = root;
    for level in (1..=max_level).rev() {
        loop {
            let target = dict.get(ms).forward(level).target.clone();
            let target = match target {
                Some(t) => t,
                None => break,
            };
            total += dict.get(ms).step(level);
            ms = dict.find(&target).expect("forward pointer must resolve");
        }
    }
    total
}

/// An embedded sorted set: unique string members ordered by `(score,
/// member)`, navigable by member, rank, score range, or lex range.
pub struct Zset<S: Score, D: Dict<S>> {
    dict: D,
    root: D::Handle,
    max_level: usize,
    card: u32,
}

impl<S: Score, D: Dict<S>> Zset<S, D> {
    /// Wraps an already-constructed dict, running the cold-open recovery
    /// scan if the dict reports it was opened against existing data.
    pub fn open(mut dict: D) -> Result<Self> {
        let root = dict.root();
        let (max_level, card) = if dict.recovered() {
            let max_level = dict.get(root).level;
            let card = find_last(&mut dict, root, max_level);
            (max_level, card)
        } else {
            (0, 0)
        };
        dict.persist(root)?;
        Ok(Self {
            dict,
            root,
            max_level,
            card,
        })
    }

    fn advance_member(&mut self, handle: D::Handle, level: usize) -> D::Handle {
        let target = self
            .dict
            .get(handle)
            .forward(level)
            .target
            .clone()
            .expect("advance_member called on an empty forward entry");
        self.dict
            .find(&target)
            .expect("forward pointer must resolve to a live node")
    }

    fn find_by_lex(&mut self, member: &str) -> D::Handle {
        let mut ms = self.root;
        for level in (1..=self.max_level).rev() {
            while self.dict.get(ms).member_compare(level, member) == Ordering::Less {
                ms = self.advance_member(ms, level);
            }
        }
        ms
    }

    fn find_by_score(&mut self, score: &S) -> D::Handle {
        let mut ms = self.root;
        for level in (1..=self.max_level).rev() {
            while self.dict.get(ms).score_compare(level, score) == Ordering::Less {
                ms = self.advance_member(ms, level);
            }
        }
        ms
    }

    fn find_by_rank(&mut self, rank: u32) -> Option<D::Handle> {
        if rank > self.card {
            return None;
        }
        if rank == 0 {
            return Some(self.root);
        }
        let mut ms = self.root;
        let mut remaining = rank;
        for level in (1..=self.max_level).rev() {
            loop {
                if self.dict.get(ms).forward(level).target.is_none() {
                    break;
                }
                let cur_step = self.dict.get(ms).step(level);
                if cur_step > remaining {
                    break;
                }
                ms = self.advance_member(ms, level);
                remaining -= cur_step;
                if remaining == 0 {
                    return Some(ms);
                }
            }
        }
        None
    }

    fn impl_zadd(&mut self, member: &str, score: S) {
        let rand_level = rand_level();
        let mut prev: Vec<D::Handle> = vec![self.root; MAX_LEVEL + 1];
        let mut prev_step = vec![0u32; MAX_LEVEL + 1];

        let mut ms = self.root;
        let mut total_step = 0u32;
        for level in (1..=self.max_level).rev() {
            while self.dict.get(ms).compare(level, &score, member) == Ordering::Less {
                total_step += self.dict.get(ms).step(level);
                ms = self.advance_member(ms, level);
            }
            prev_step[level] = total_step;
            prev[level] = ms;
        }

        let new_handle = self.dict.new_key_buffer(member);
        {
            let new_node = self.dict.get_mut(new_handle);
            new_node.score = score;
            new_node.level = rand_level;
        }

        for level in 1..=rand_level {
            if level <= self.max_level {
                let p = prev[level];
                let (fwd_target, fwd_score, fwd_step) = {
                    let node = self.dict.get(p);
                    let entry = node.forward(level);
                    (entry.target.clone(), entry.score, node.step(level))
                };
                let left_size = prev_step[1] - prev_step[level];
                if let Some(target) = fwd_target {
                    let new_node = self.dict.get_mut(new_handle);
                    new_node.set_forward(level, Some(&target), fwd_score);
                    new_node.set_step(level, fwd_step - left_size);
                }
                self.dict.get_mut(p).set_step(level, left_size + 1);
            } else {
                prev[level] = self.root;
                self.dict
                    .get_mut(self.root)
                    .set_step(level, prev_step[1] + 1);
            }
            let p = prev[level];
            self.dict.get_mut(p).set_forward(level, Some(member), score);
        }

        let mut updated_level = rand_level;
        for level in (rand_level + 1)..=self.max_level {
            let p = prev[level];
            if self.dict.get(p).forward(level).target.is_none() {
                break;
            }
            self.dict.get_mut(p).inc_step(level);
            updated_level = level;
        }

        for level in 1..=updated_level {
            if level == 1 || prev[level] != prev[level - 1] {
                self.dict.batch_add(prev[level]);
            }
        }
        self.dict.batch_add(new_handle);

        self.card += 1;
        self.max_level = self.max_level.max(rand_level);
        let root = self.root;
        self.dict.get_mut(root).level = self.max_level;

        if let Err(e) = self.dict.batch_persist() {
            warn!("failed to persist zadd batch: {e}");
        }
    }

    fn impl_zcount(&mut self, score: &S, equal_ok: bool) -> u32 {
        let mut ms = self.root;
        let mut total = 0u32;
        for level in (1..=self.max_level).rev() {
            loop {
                let cmp = self.dict.get(ms).score_compare(level, score);
                let advance = if equal_ok {
                    cmp != Ordering::Greater
                } else {
                    cmp == Ordering::Less
                };
                if !advance {
                    break;
                }
                total += self.dict.get(ms).step(level);
                ms = self.advance_member(ms, level);
            }
        }
        total
    }

    fn impl_zrank(&mut self, member: &str, score: &S) -> u32 {
        let mut ms = self.root;
        let mut total = 0u32;
        for level in (1..=self.max_level).rev() {
            loop {
                if self.dict.get(ms).compare(level, score, member) == Ordering::Greater {
                    break;
                }
                total += self.dict.get(ms).step(level);
                ms = self.advance_member(ms, level);
            }
            if self.dict.get(ms).own_compare(score, member) == Ordering::Equal {
                return total;
            }
        }
        0
    }

    fn impl_zrem(&mut self, member: &str, score: S) -> D::Handle {
        let mut prev: Vec<D::Handle> = vec![self.root; MAX_LEVEL + 1];
        let mut ms = self.root;
        for level in (1..=self.max_level).rev() {
            loop {
                let cmp = self.dict.get(ms).compare(level, &score, member);
                if cmp != Ordering::Less {
                    break;
                }
                ms = self.advance_member(ms, level);
            }
            prev[level] = ms;
        }

        let next = self.advance_member(ms, 1);
        let level = self.dict.get(next).level;

        for lvl in 1..=level {
            let fwd_target = self.dict.get(next).forward(lvl).target.clone();
            match fwd_target {
                None => {
                    let p = prev[lvl];
                    self.dict.get_mut(p).clear_forward(lvl);
                }
                Some(member2) => {
                    let next2 = self
                        .dict
                        .find(&member2)
                        .expect("forward pointer must resolve");
                    let (n2_member, n2_score) = {
                        let node = self.dict.get(next2);
                        (node.member.clone(), node.score)
                    };
                    let next_step = self.dict.get(next).step(lvl);
                    let p = prev[lvl];
                    let p_step = self.dict.get(p).step(lvl);
                    let node = self.dict.get_mut(p);
                    node.set_forward(lvl, Some(&n2_member), n2_score);
                    node.set_step(lvl, p_step + next_step - 1);
                }
            }
        }

        let mut updated_level = level;
        for lvl in (level + 1)..=self.max_level {
            let p = prev[lvl];
            if self.dict.get(p).forward(lvl).target.is_some() {
                self.dict.get_mut(p).dec_step(lvl);
                updated_level = lvl;
            } else {
                break;
            }
        }

        for lvl in 1..=updated_level {
            if lvl == 1 || prev[lvl] != prev[lvl - 1] {
                self.dict.batch_add(prev[lvl]);
            }
        }
        self.dict.batch_delete(next);
        self.dict.erase(next);

        self.card -= 1;
        while self.max_level > 0
            && self
                .dict
                .get(self.root)
                .forward(self.max_level)
                .target
                .is_none()
        {
            self.max_level -= 1;
        }
        let root = self.root;
        let max_level = self.max_level;
        self.dict.get_mut(root).level = max_level;

        if let Err(e) = self.dict.batch_persist() {
            warn!("failed to persist zrem batch: {e}");
        }
        ms
    }

    // ---- public API -----------------------------------------------------

    /// Adds `member` with `score`, or updates its score if already present.
    /// Returns 1 if a new member was added, 0 if an existing one was
    /// updated (or left unchanged because the score was already equal).
    pub fn zadd(&mut self, member: &str, score: S) -> Result<u32> {
        validate_member(member)?;
        let existing = self.dict.find(member);
        if let Some(h) = existing {
            if self.dict.get(h).score.cmp_score(&score) == Ordering::Equal {
                return Ok(0);
            }
            let old_score = self.dict.get(h).score;
            self.impl_zrem(member, old_score);
        }
        self.impl_zadd(member, score);
        if existing.is_none() {
            self.dict.resize_lru_capacity(self.card as usize);
        }
        Ok(existing.is_none() as u32)
    }

    pub fn zcard(&self) -> u32 {
        self.card
    }

    pub fn zcount(&mut self, min_score: S, max_score: S) -> u32 {
        if min_score.cmp_score(&max_score) == Ordering::Greater {
            return 0;
        }
        self.impl_zcount(&max_score, true) - self.impl_zcount(&min_score, false)
    }

    /// Adds `increment` to `member`'s score (treating an absent member as
    /// score zero) and returns the resulting score.
    pub fn zincrby(&mut self, member: &str, mut increment: S) -> Result<S> {
        if member.is_empty() {
            return Err(Error::EmptyMember);
        }
        if let Some(h) = self.dict.find(member) {
            increment += self.dict.get(h).score;
        }
        self.zadd(member, increment)?;
        Ok(increment)
    }

    /// Stores the intersection of `self` and `other` into `dest`, summing
    /// scores for members present in both. Always iterates the smaller
    /// input to keep the lookup count proportional to `min(|a|, |b|)`.
    pub fn zinterstore<D2: Dict<S>, DD: Dict<S>>(
        &mut self,
        other: &mut Zset<S, D2>,
        dest: &mut Zset<S, DD>,
    ) {
        if self.card > other.zcard() {
            return other.zinterstore(self, dest);
        }
        let mut ms = self.root;
        loop {
            let member = match self.dict.get(ms).forward(1).target.clone() {
                Some(m) => m,
                None => break,
            };
            let score_a = self.dict.get(ms).forward(1).score;
            if let Some(score_b) = other.zscore(&member) {
                let mut combined = score_a;
                combined += score_b;
                let _ = dest.zadd(&member, combined);
            }
            ms = self.advance_member(ms, 1);
        }
    }

    pub fn zlexcount(&mut self, start: &str, with_start: bool, stop: &str, with_stop: bool) -> u32 {
        if self.card == 0 || start > stop {
            return 0;
        }
        let ms = self.find_by_lex(start);
        let mbr = match self.dict.get(ms).forward(1).target.clone() {
            Some(m) => m,
            None => return 0,
        };
        let start_found = mbr == start;
        let start_rank = self.zrank(&mbr);

        let mut stop_rank = self.card;
        let mut stop_found = false;
        let ms2 = self.find_by_lex(stop);
        if let Some(mbr2) = self.dict.get(ms2).forward(1).target.clone() {
            let cmp = mbr2.as_str().cmp(stop);
            stop_rank = self.zrank(&mbr2) - u32::from(cmp == Ordering::Greater);
            stop_found = cmp == Ordering::Equal;
        }

        let mut count = stop_rank + 1 - start_rank;
        if start_found && !with_start {
            count -= 1;
        }
        if stop_found && !with_stop {
            count -= 1;
        }
        count
    }

    /// Pops the `count` highest-scoring members, highest first.
    pub fn zpopmax(&mut self, count: u32) -> Vec<String> {
        let (members, _) = self.zpopmax_impl(count);
        members
    }

    pub fn zpopmax_with_scores(&mut self, count: u32) -> Vec<(String, S)> {
        let (members, scores) = self.zpopmax_impl(count);
        members.into_iter().zip(scores).collect()
    }

    fn zpopmax_impl(&mut self, count: u32) -> (Vec<String>, Vec<S>) {
        if count == 0 {
            return (Vec::new(), Vec::new());
        }
        let prev_rank = if self.card > count {
            self.card - count
        } else {
            0
        };
        let prev = match self.find_by_rank(prev_rank) {
            Some(h) => h,
            None => return (Vec::new(), Vec::new()),
        };
        let pop_count = self.card - prev_rank;
        let mut members = Vec::with_capacity(pop_count as usize);
        let mut scores = Vec::with_capacity(pop_count as usize);
        for _ in 0..pop_count {
            let (member, score) = {
                let entry = self.dict.get(prev).forward(1);
                (
                    entry
                        .target
                        .clone()
                        .expect("pop count matches actual nodes"),
                    entry.score,
                )
            };
            self.impl_zrem(&member, score);
            members.push(member);
            scores.push(score);
        }
        members.reverse();
        scores.reverse();
        (members, scores)
    }

    /// Pops the `count` lowest-scoring members, lowest first.
    pub fn zpopmin(&mut self, count: u32) -> Vec<String> {
        let (members, _) = self.zpopmin_impl(count);
        members
    }

    pub fn zpopmin_with_scores(&mut self, count: u32) -> Vec<(String, S)> {
        let (members, scores) = self.zpopmin_impl(count);
        members.into_iter().zip(scores).collect()
    }

    fn zpopmin_impl(&mut self, count: u32) -> (Vec<String>, Vec<S>) {
        if count == 0 {
            return (Vec::new(), Vec::new());
        }
        let prev = self.root;
        let pop_count = count.min(self.card);
        let mut members = Vec::with_capacity(pop_count as usize);
        let mut scores = Vec::with_capacity(pop_count as usize);
        for _ in 0..pop_count {
            let (member, score) = {
                let entry = self.dict.get(prev).forward(1);
                (
                    entry
                        .target
                        .clone()
                        .expect("pop count matches actual nodes"),
                    entry.score,
                )
            };
            self.impl_zrem(&member, score);
            members.push(member);
            scores.push(score);
        }
        (members, scores)
    }

    pub fn zrange(&mut self, start: u32, stop: u32, limit: u32) -> Vec<String> {
        self.zrange_impl(start, stop, limit)
            .into_iter()
            .map(|(m, _)| m)
            .collect()
    }

    pub fn zrange_with_scores(&mut self, start: u32, stop: u32, limit: u32) -> Vec<(String, S)> {
        self.zrange_impl(start, stop, limit)
    }

    fn zrange_impl(&mut self, start: u32, stop: u32, limit: u32) -> Vec<(String, S)> {
        let start = start.max(1);
        let stop = stop.min(self.card);
        if start > stop {
            return Vec::new();
        }
        let mut ms = match self.find_by_rank(start - 1) {
            Some(h) => h,
            None => return Vec::new(),
        };
        let mut out = Vec::new();
        for _ in start..=stop {
            ms = self.advance_member(ms, 1);
            let node = self.dict.get(ms);
            out.push((node.member.clone(), node.score));
            if limit != 0 && out.len() as u32 == limit {
                return out;
            }
        }
        out
    }

    pub fn zrangebylex(
        &mut self,
        start: &str,
        with_start: bool,
        stop: &str,
        with_stop: bool,
        limit: u32,
    ) -> Vec<String> {
        self.zrangebylex_impl(start, with_start, stop, with_stop, limit)
            .into_iter()
            .map(|(m, _)| m)
            .collect()
    }

    pub fn zrangebylex_with_scores(
        &mut self,
        start: &str,
        with_start: bool,
        stop: &str,
        with_stop: bool,
        limit: u32,
    ) -> Vec<(String, S)> {
        self.zrangebylex_impl(start, with_start, stop, with_stop, limit)
    }

    fn zrangebylex_impl(
        &mut self,
        start: &str,
        with_start: bool,
        stop: &str,
        with_stop: bool,
        limit: u32,
    ) -> Vec<(String, S)> {
        let mut count = self.zlexcount(start, with_start, stop, with_stop);
        if count == 0 {
            return Vec::new();
        }
        let mut ms = self.find_by_lex(start);
        if !with_start && self.dict.get(ms).forward(1).target.as_deref() == Some(start) {
            ms = self.advance_member(ms, 1);
        }
        if limit != 0 && limit < count {
            count = limit;
        }
        let mut out = Vec::with_capacity(count as usize);
        for i in 1..=count {
            let node = self.dict.get(ms);
            let entry = node.forward(1);
            out.push((
                entry
                    .target
                    .clone()
                    .expect("lex range count matches actual nodes"),
                entry.score,
            ));
            if i < count {
                ms = self.advance_member(ms, 1);
            }
        }
        out
    }

    pub fn zrangebyscore(&mut self, min_score: S, max_score: S, limit: u32) -> Vec<String> {
        self.zrangebyscore_impl(min_score, max_score, limit)
            .into_iter()
            .map(|(m, _)| m)
            .collect()
    }

    pub fn zrangebyscore_with_scores(
        &mut self,
        min_score: S,
        max_score: S,
        limit: u32,
    ) -> Vec<(String, S)> {
        self.zrangebyscore_impl(min_score, max_score, limit)
    }

    fn zrangebyscore_impl(&mut self, min_score: S, max_score: S, limit: u32) -> Vec<(String, S)> {
        if min_score.cmp_score(&max_score) == Ordering::Greater {
            return Vec::new();
        }
        let mut ms = self.find_by_score(&min_score);
        let mut out = Vec::new();
        loop {
            let entry = self.dict.get(ms).forward(1);
            let (target, score) = match &entry.target {
                Some(t) => (t.clone(), entry.score),
                None => break,
            };
            if score.cmp_score(&max_score) == Ordering::Greater {
                break;
            }
            ms = self.advance_member(ms, 1);
            out.push((target, score));
            if limit != 0 && out.len() as u32 == limit {
                return out;
            }
        }
        out
    }

    pub fn zrank(&mut self, member: &str) -> u32 {
        if member.is_empty() {
            return 0;
        }
        let h = match self.dict.find(member) {
            Some(h) => h,
            None => return 0,
        };
        let score = self.dict.get(h).score;
        self.impl_zrank(member, &score)
    }

    pub fn zrem(&mut self, member: &str) -> u32 {
        if member.is_empty() {
            return 0;
        }
        let h = match self.dict.find(member) {
            Some(h) => h,
            None => return 0,
        };
        let score = self.dict.get(h).score;
        self.impl_zrem(member, score);
        1
    }

    pub fn zremrangebylex(
        &mut self,
        start: &str,
        with_start: bool,
        stop: &str,
        with_stop: bool,
    ) -> u32 {
        let removed = self.zlexcount(start, with_start, stop, with_stop);
        if removed == 0 {
            return 0;
        }
        let mut ms = self.find_by_lex(start);
        if !with_start && self.dict.get(ms).forward(1).target.as_deref() == Some(start) {
            ms = self.advance_member(ms, 1);
        }
        for _ in 0..removed {
            let (member, score) = {
                let entry = self.dict.get(ms).forward(1);
                (
                    entry
                        .target
                        .clone()
                        .expect("lex range count matches actual removable nodes"),
                    entry.score,
                )
            };
            self.impl_zrem(&member, score);
        }
        removed
    }

    pub fn zremrangebyrank(&mut self, start: u32, stop: u32) -> u32 {
        let start = start.max(1);
        let stop = stop.min(self.card);
        if start > stop {
            return 0;
        }
        let ms = match self.find_by_rank(start - 1) {
            Some(h) => h,
            None => return 0,
        };
        for _ in start..=stop {
            let (member, score) = {
                let entry = self.dict.get(ms).forward(1);
                (
                    entry
                        .target
                        .clone()
                        .expect("rank range count matches actual removable nodes"),
                    entry.score,
                )
            };
            self.impl_zrem(&member, score);
        }
        stop - start + 1
    }

    pub fn zremrangebyscore(&mut self, min_score: S, max_score: S) -> u32 {
        if min_score.cmp_score(&max_score) == Ordering::Greater {
            return 0;
        }
        let ms = self.find_by_score(&min_score);
        let mut removed = 0u32;
        loop {
            let entry = self.dict.get(ms).forward(1);
            let keep = match &entry.target {
                Some(_) => entry.score.cmp_score(&max_score) != Ordering::Greater,
                None => false,
            };
            if !keep {
                break;
            }
            let (member, score) = {
                let entry = self.dict.get(ms).forward(1);
                (entry.target.clone().unwrap(), entry.score)
            };
            self.impl_zrem(&member, score);
            removed += 1;
        }
        removed
    }

    /// Like [`Zset::zrange`], but highest rank first, respecting `limit` by
    /// keeping the `limit` highest-ranked entries rather than the lowest.
    pub fn zrevrange(&mut self, start: u32, stop: u32, limit: u32) -> Vec<String> {
        let start_adj = start.max(1);
        let stop_adj = stop.min(self.card);
        if start_adj > stop_adj {
            return Vec::new();
        }
        let start_adj = if limit != 0 && stop_adj - start_adj + 1 > limit {
            stop_adj - limit + 1
        } else {
            start_adj
        };
        let mut members = self.zrange(start_adj, stop_adj, 0);
        members.reverse();
        members
    }

    /// Like [`Zset::zrangebyscore`] with `min`/`max` swapped and the result
    /// reversed, keeping the `limit` highest-scoring entries.
    pub fn zrevrangebyscore(&mut self, max_score: S, min_score: S, limit: u32) -> Vec<String> {
        let mut members = self.zrangebyscore(min_score, max_score, 0);
        members.reverse();
        if limit != 0 && (limit as usize) < members.len() {
            members.truncate(limit as usize);
        }
        members
    }

    pub fn zrevrank(&mut self, member: &str) -> u32 {
        if member.is_empty() {
            return 0;
        }
        let h = match self.dict.find(member) {
            Some(h) => h,
            None => return 0,
        };
        let score = self.dict.get(h).score;
        self.card + 1 - self.impl_zrank(member, &score)
    }

    pub fn zscore(&mut self, member: &str) -> Option<S> {
        if member.is_empty() {
            return None;
        }
        let h = self.dict.find(member)?;
        Some(self.dict.get(h).score)
    }

    /// Stores the union of `self` and `other` into `dest`, summing scores
    /// for members present in both.
    pub fn zunionstore<D2: Dict<S>, DD: Dict<S>>(
        &mut self,
        other: &mut Zset<S, D2>,
        dest: &mut Zset<S, DD>,
    ) {
        if self.card > other.zcard() {
            return other.zunionstore(self, dest);
        }
        let mut ms = self.root;
        loop {
            let member = match self.dict.get(ms).forward(1).target.clone() {
                Some(m) => m,
                None => break,
            };
            let score_a = self.dict.get(ms).forward(1).score;
            let _ = dest.zadd(&member, score_a);
            ms = self.advance_member(ms, 1);
        }
        let mut ms = other.root;
        loop {
            let member = match other.dict.get(ms).forward(1).target.clone() {
                Some(m) => m,
                None => break,
            };
            let score_b = other.dict.get(ms).forward(1).score;
            let _ = dest.zincrby(&member, score_b);
            ms = other.advance_member(ms, 1);
        }
    }
}

impl<S: Score> Zset<S, InMemoryDict<S>> {
    /// A zset backed by a plain in-memory dict — no persistence, unbounded.
    pub fn new_in_memory() -> Self {
        Self::open(InMemoryDict::new()).expect("an in-memory dict never fails to open")
    }
}

impl<S: Score> Zset<S, PersistentDict<S, FjallStore>> {
    /// A zset backed by an LRU-bounded, `fjall`-persisted dict.
    pub fn open_persistent(options: &EngineOptions) -> Result<Self> {
        let dict = PersistentDict::open_with_capacity(
            &options.path,
            options.error_if_exists,
            options.initial_lru_capacity,
        )?;
        Self::open(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zadd_and_zscore() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        assert_eq!(z.zadd("alice", 10).unwrap(), 1);
        assert_eq!(z.zadd("bob", 20).unwrap(), 1);
        assert_eq!(z.zadd("alice", 10).unwrap(), 0); // unchanged score
        assert_eq!(z.zcard(), 2);
        assert_eq!(z.zscore("alice"), Some(10));
        assert_eq!(z.zscore("carol"), None);
    }

    #[test]
    fn zadd_rejects_bad_members() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        assert!(matches!(z.zadd("", 1), Err(Error::EmptyMember)));
        assert!(matches!(
            z.zadd("this-member-is-too-long", 1),
            Err(Error::MemberTooLong { .. })
        ));
    }

    #[test]
    fn zrange_is_sorted_by_score_then_member() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        z.zadd("c", 3).unwrap();
        z.zadd("a", 1).unwrap();
        z.zadd("b", 2).unwrap();
        assert_eq!(z.zrange(1, 3, 0), vec!["a", "b", "c"]);
        assert_eq!(z.zrevrange(1, 3, 0), vec!["c", "b", "a"]);
    }

    #[test]
    fn zrank_and_zrevrank() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        z.zadd("a", 1).unwrap();
        z.zadd("b", 2).unwrap();
        z.zadd("c", 3).unwrap();
        assert_eq!(z.zrank("a"), 1);
        assert_eq!(z.zrank("c"), 3);
        assert_eq!(z.zrevrank("c"), 1);
        assert_eq!(z.zrank("nobody"), 0);
    }

    #[test]
    fn zrem_updates_rank_and_card() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        for (m, s) in [("a", 1), ("b", 2), ("c", 3)] {
            z.zadd(m, s).unwrap();
        }
        assert_eq!(z.zrem("b"), 1);
        assert_eq!(z.zcard(), 2);
        assert_eq!(z.zrank("c"), 2);
        assert_eq!(z.zrem("b"), 0);
    }

    #[test]
    fn zincrby_accumulates() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        assert_eq!(z.zincrby("a", 5).unwrap(), 5);
        assert_eq!(z.zincrby("a", 3).unwrap(), 8);
    }

    #[test]
    fn zcount_and_zrangebyscore() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        for (m, s) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            z.zadd(m, s).unwrap();
        }
        assert_eq!(z.zcount(2, 3), 2);
        assert_eq!(z.zrangebyscore(2, 3, 0), vec!["b", "c"]);
        assert_eq!(z.zrevrangebyscore(3, 2, 1), vec!["c"]);
    }

    #[test]
    fn zrangebylex_respects_inclusivity() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        for m in ["a", "b", "c", "d"] {
            z.zadd(m, 0).unwrap();
        }
        assert_eq!(
            z.zrangebylex("b", true, "d", false, 0),
            vec!["b".to_string(), "c".to_string()]
        );
        assert_eq!(z.zlexcount("a", true, "d", true), 4);
    }

    #[test]
    fn zpopmax_and_zpopmin() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        for (m, s) in [("a", 1), ("b", 2), ("c", 3)] {
            z.zadd(m, s).unwrap();
        }
        assert_eq!(z.zpopmax(2), vec!["c", "b"]);
        assert_eq!(z.zcard(), 1);
        assert_eq!(z.zpopmin(1), vec!["a"]);
        assert_eq!(z.zcard(), 0);
    }

    #[test]
    fn zremrangebyrank_and_byscore() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        for (m, s) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            z.zadd(m, s).unwrap();
        }
        assert_eq!(z.zremrangebyrank(1, 2), 2);
        assert_eq!(z.zcard(), 2);
        assert_eq!(z.zrange(1, 10, 0), vec!["c", "d"]);
        assert_eq!(z.zremrangebyscore(4, 4), 1);
        assert_eq!(z.zcard(), 1);
    }

    #[test]
    fn zinterstore_and_zunionstore() {
        let mut a: Zset<i64, _> = Zset::new_in_memory();
        let mut b: Zset<i64, _> = Zset::new_in_memory();
        a.zadd("x", 1).unwrap();
        a.zadd("y", 2).unwrap();
        b.zadd("y", 10).unwrap();
        b.zadd("z", 20).unwrap();

        let mut inter: Zset<i64, _> = Zset::new_in_memory();
        a.zinterstore(&mut b, &mut inter);
        assert_eq!(inter.zcard(), 1);
        assert_eq!(inter.zscore("y"), Some(12));

        let mut union: Zset<i64, _> = Zset::new_in_memory();
        a.zunionstore(&mut b, &mut union);
        assert_eq!(union.zcard(), 3);
        assert_eq!(union.zscore("y"), Some(12));
        assert_eq!(union.zscore("x"), Some(1));
        assert_eq!(union.zscore("z"), Some(20));
    }

    #[test]
    fn large_insert_keeps_rank_consistent() {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        let mut members: Vec<i64> = (0..500).collect();
        // insertion order shouldn't matter to the final ordering
        members.reverse();
        for m in &members {
            z.zadd(&m.to_string(), *m).unwrap();
        }
        assert_eq!(z.zcard(), 500);
        for rank in 1..=500u32 {
            let expected = (rank - 1) as i64;
            assert_eq!(z.zrank(&expected.to_string()), rank);
        }
    }
}
