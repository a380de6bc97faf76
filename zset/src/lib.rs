//! An embedded sorted-set (ZSet) engine: an augmented skiplist for
//! ordered, ranked access to unique string members, paired with a
//! pluggable [`Dict`] backend.
//!
//! Two backends ship here:
//!
//! - [`InMemoryDict`] — a flat slot pool, unbounded, no persistence.
//! - [`PersistentDict`] — an LRU-bounded write-through cache over an
//!   embedded `fjall` keyspace, recoverable across restarts.
//!
//! # Example
//!
//! ```no_run
//! use zset::Zset;
//!
//! let mut scores: Zset<i64, _> = Zset::new_in_memory();
//! scores.zadd("alice", 10).unwrap();
//! scores.zadd("bob", 20).unwrap();
//! assert_eq!(scores.zrange(1, 2, 0), vec!["alice", "bob"]);
//! ```

pub mod config;
pub mod dict;
pub mod engine;
pub mod node;

pub use config::EngineOptions;
pub use dict::memory::InMemoryDict;
pub use dict::persistent::store::FjallStore;
pub use dict::persistent::PersistentDict;
pub use dict::Dict;
pub use engine::Zset;
pub use node::NodeRecord;
pub use zset_core::{Error, Result, Score};
