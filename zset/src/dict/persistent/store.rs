//! The persistent log-structured store collaborator: a point-lookup,
//! batch-write, ordered-scan key/value contract the persistent dict writes
//! through to once its LRU write buffer needs to flush.

use std::path::Path;

use zset_core::{Error, Result};

/// What a persistent dict needs from its backing store. Kept narrow and
/// backend-agnostic so a different embedded KV engine could stand in for
/// `fjall` without touching the dict or engine code.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Commits a batch of puts and deletes atomically.
    fn write_batch(&self, puts: Vec<(Vec<u8>, Vec<u8>)>, deletes: Vec<Vec<u8>>) -> Result<()>;

    fn is_empty(&self) -> Result<bool>;

    /// An iterator over `(key, value)` pairs in key order, starting at the
    /// first key greater than or equal to `start`.
    fn scan_from<'a>(
        &'a self,
        start: &[u8],
    ) -> Result<Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + 'a>>;
}

/// A `fjall`-backed [`KvStore`]: a pure-Rust embeddable LSM-tree, standing
/// in for the out-of-scope persistent store this engine writes through to.
pub struct FjallStore {
    keyspace: fjall::Keyspace,
    partition: fjall::PartitionHandle,
}

impl FjallStore {
    /// Opens (or creates) the store rooted at `path`. If `error_if_exists`
    /// is set and the partition already holds data, returns
    /// `Error::AlreadyExists` instead of opening it.
    pub fn open(path: &Path, error_if_exists: bool) -> Result<Self> {
        let keyspace = fjall::Config::new(path)
            .open()
            .map_err(|e| Error::BackendOpen(e.to_string()))?;
        let partition = keyspace
            .open_partition("zset", fjall::PartitionCreateOptions::default())
            .map_err(|e| Error::BackendOpen(e.to_string()))?;

        if error_if_exists && !partition.is_empty().map_err(|e| Error::BackendOpen(e.to_string()))? {
            return Err(Error::AlreadyExists);
        }

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl KvStore for FjallStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.partition
            .get(key)
            .map(|opt| opt.map(|slice| slice.to_vec()))
            .map_err(|e| Error::StoreGet(e.to_string()))
    }

    fn write_batch(&self, puts: Vec<(Vec<u8>, Vec<u8>)>, deletes: Vec<Vec<u8>>) -> Result<()> {
        let mut batch = self.keyspace.batch();
        for (key, value) in puts {
            batch.insert(&self.partition, key, value);
        }
        for key in deletes {
            batch.remove(&self.partition, key);
        }
        batch.commit().map_err(|e| Error::StoreWrite(e.to_string()))
    }

    fn is_empty(&self) -> Result<bool> {
        self.partition
            .is_empty()
            .map_err(|e| Error::StoreGet(e.to_string()))
    }

    fn scan_from<'a>(
        &'a self,
        start: &[u8],
    ) -> Result<Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + 'a>> {
        let iter = self
            .partition
            .range(start.to_vec()..)
            .map(|res| {
                res.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(|e| Error::StoreGet(e.to_string()))
            });
        Ok(Box::new(iter))
    }
}
