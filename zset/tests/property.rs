//! Property-based tests checking the skiplist engine against a naive
//! reference model built from a sorted `Vec`, and checking that spans stay
//! internally consistent with rank after arbitrary add/remove sequences.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tempfile::TempDir;
use zset::{EngineOptions, Zset};

#[derive(Debug, Clone)]
enum Op {
    Add(String, i64),
    Rem(String),
}

fn member_strategy() -> impl Strategy<Value = String> {
    "[a-j]{1,5}"
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (member_strategy(), any::<i64>()).prop_map(|(m, s)| Op::Add(m, s)),
        member_strategy().prop_map(Op::Rem),
    ]
}

/// Reference model: a sorted map keyed by (score, member) reproduced as a
/// plain `BTreeMap<String, i64>` re-sorted on every query.
fn reference_rank(model: &BTreeMap<String, i64>, member: &str) -> u32 {
    let mut sorted: Vec<(&String, &i64)> = model.iter().collect();
    sorted.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
    sorted
        .iter()
        .position(|(m, _)| m.as_str() == member)
        .map(|idx| idx as u32 + 1)
        .unwrap_or(0)
}

fn reference_range(model: &BTreeMap<String, i64>) -> Vec<String> {
    let mut sorted: Vec<(&String, &i64)> = model.iter().collect();
    sorted.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
    sorted.into_iter().map(|(m, _)| m.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

    #[test]
    fn matches_reference_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        let mut model: BTreeMap<String, i64> = BTreeMap::new();

        for op in &ops {
            match op {
                Op::Add(member, score) => {
                    z.zadd(member, *score).unwrap();
                    model.insert(member.clone(), *score);
                }
                Op::Rem(member) => {
                    z.zrem(member);
                    model.remove(member);
                }
            }
        }

        prop_assert_eq!(z.zcard() as usize, model.len());
        prop_assert_eq!(z.zrange(1, u32::MAX, 0), reference_range(&model));

        for member in model.keys() {
            prop_assert_eq!(z.zrank(member), reference_rank(&model, member));
            prop_assert_eq!(z.zscore(member), model.get(member).copied());
        }
    }

    #[test]
    fn rank_is_a_bijection_onto_one_through_card(
        members in prop::collection::hash_set(member_strategy(), 1..100)
    ) {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        for (i, member) in members.iter().enumerate() {
            z.zadd(member, i as i64).unwrap();
        }

        let mut ranks: Vec<u32> = members.iter().map(|m| z.zrank(m)).collect();
        ranks.sort_unstable();
        let expected: Vec<u32> = (1..=members.len() as u32).collect();
        prop_assert_eq!(ranks, expected);
    }

    #[test]
    fn zrevrank_is_card_plus_one_minus_zrank(
        members in prop::collection::hash_set(member_strategy(), 1..100)
    ) {
        let mut z: Zset<i64, _> = Zset::new_in_memory();
        for (i, member) in members.iter().enumerate() {
            z.zadd(member, i as i64).unwrap();
        }
        let card = z.zcard();
        for member in &members {
            prop_assert_eq!(z.zrevrank(member), card + 1 - z.zrank(member));
        }
    }
}

proptest! {
    // Disk-backed: each case opens a real `fjall` keyspace, so keep the
    // case count and op-sequence length well below the in-memory suite's.
    #![proptest_config(ProptestConfig { cases: 20, ..ProptestConfig::default() })]

    #[test]
    fn matches_reference_model_persistent(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let dir = TempDir::new().unwrap();
        let options = EngineOptions {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };

        let mut model: BTreeMap<String, i64> = BTreeMap::new();
        let mut removed: Vec<String> = Vec::new();
        {
            let mut z: Zset<i64, _> = Zset::open_persistent(&options).unwrap();
            for op in &ops {
                match op {
                    Op::Add(member, score) => {
                        z.zadd(member, *score).unwrap();
                        model.insert(member.clone(), *score);
                        removed.retain(|m| m != member);
                    }
                    Op::Rem(member) => {
                        z.zrem(member);
                        if model.remove(member).is_some() || !removed.contains(member) {
                            removed.push(member.clone());
                        }
                    }
                }
            }

            prop_assert_eq!(z.zcard() as usize, model.len());
            prop_assert_eq!(z.zrange(1, u32::MAX, 0), reference_range(&model));
            for member in model.keys() {
                prop_assert_eq!(z.zrank(member), reference_rank(&model, member));
                prop_assert_eq!(z.zscore(member), model.get(member).copied());
            }
            // A removed member must read back as gone even while its delete
            // is still only staged in the write buffer, not yet flushed —
            // the persistent dict must never resurrect it from a stale,
            // still-durable store entry.
            for member in &removed {
                if !model.contains_key(member) {
                    prop_assert_eq!(z.zscore(member), None);
                    prop_assert_eq!(z.zrank(member), 0);
                }
            }
            // `z` drops here, forcing any still-staged writes/deletes to flush.
        }

        // Recovery round trip: reopen against the same path and confirm the
        // final state, including removals, survived the restart.
        let reopened: Zset<i64, _> = Zset::open_persistent(&options).unwrap();
        prop_assert_eq!(reopened.zcard() as usize, model.len());
        for member in model.keys() {
            prop_assert_eq!(reopened.zscore(member), model.get(member).copied());
            prop_assert_eq!(reopened.zrank(member), reference_rank(&model, member));
        }
        for member in &removed {
            if !model.contains_key(member) {
                prop_assert_eq!(reopened.zscore(member), None);
            }
        }
    }
}
