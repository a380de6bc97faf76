//! Error types for the zset engine.

use thiserror::Error;

/// The error type returned by zset and its dict backends.
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred talking to the persistent backend.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A member string was empty; members must be non-empty.
    #[error("member must not be empty")]
    EmptyMember,

    /// A member string exceeded `MAX_MEMBER_LEN`.
    #[error("member length {len} exceeds the {max}-byte limit")]
    MemberTooLong { len: usize, max: usize },

    /// Opening the persistent backend failed.
    #[error("backend failed to open: {0}")]
    BackendOpen(String),

    /// `error_if_exists` was set and the backend already holds data.
    #[error("store already exists and error_if_exists was set")]
    AlreadyExists,

    /// The underlying store failed to answer a point lookup.
    #[error("store get failed: {0}")]
    StoreGet(String),

    /// The underlying store failed to commit a write batch.
    #[error("store write failed: {0}")]
    StoreWrite(String),

    /// A persisted node record failed to decode.
    #[error("corruption detected: {0}")]
    Corruption(String),
}

/// A specialized `Result` for zset operations.
pub type Result<T> = std::result::Result<T, Error>;
