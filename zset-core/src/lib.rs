//! Shared types, tunables, error handling, and the [`Score`] trait for the
//! zset sorted-set engine.
//!
//! - [`error`] — the crate-wide [`Error`]/[`Result`].
//! - [`types`] — member and configuration types shared by both dict
//!   backends and the engine.
//! - [`score`] — the [`Score`] trait callers implement to order their own
//!   aggregate score types.

pub mod error;
pub mod score;
pub mod types;

pub use error::{Error, Result};
pub use score::Score;
pub use types::*;
