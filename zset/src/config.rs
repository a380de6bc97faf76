//! Configuration for the persistent dict backend.

use std::path::PathBuf;

use zset_core::DEFAULT_LRU_CAPACITY;

/// Options controlling how a [`crate::PersistentDict`] opens and sizes
/// itself. Has no effect on the in-memory backend, which has nothing to
/// configure.
///
/// # Example
///
/// ```
/// use zset::EngineOptions;
///
/// let options = EngineOptions {
///     path: "./data/my-zset".into(),
///     error_if_exists: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory the persistent store opens (and creates, if missing).
    pub path: PathBuf,

    /// If set, opening a path that already holds data fails instead of
    /// recovering it.
    pub error_if_exists: bool,

    /// Initial number of node slots the LRU write buffer holds before it
    /// starts evicting clean entries.
    pub initial_lru_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/zset"),
            error_if_exists: false,
            initial_lru_capacity: DEFAULT_LRU_CAPACITY,
        }
    }
}
