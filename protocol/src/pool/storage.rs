//! # Pool Storage — Durable Record of Accepted Transactions
//!
//! The persistence layer for the transaction pool, built on sled's
//! embedded key-value store. Every transaction the pool accepts is
//! mirrored here until it is confirmed, evicted, replaced, or pruned, so
//! a crashed worker can be restarted and the pool repopulated from disk.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees" (analogous to column families
//! in RocksDB or tables in SQL). We use two:
//!
//! | Tree            | Key                | Value                          |
//! |-----------------|--------------------|--------------------------------|
//! | `pool_entries`  | `sequence` (8B BE) | `bincode(StoredTransaction)`   |
//! | `pool_hashes`   | `hash` (UTF-8)     | `sequence` (8B BE)             |
//!
//! Sequences are sled-generated monotonic IDs stored big-endian, so
//! lexicographic iteration over `pool_entries` *is* admission order —
//! exactly what repopulation needs to reproduce the original pool, and
//! what gives every entry its insertion-order tiebreak.
//!
//! ## Durability
//!
//! Accepting a transaction flushes to disk before the acknowledgment
//! leaves the worker. Removals are not flushed eagerly — replaying an
//! already-removed transaction on restart is harmless (it fails
//! re-validation), while losing an accepted one is not.

use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during pool storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// An on-disk record cannot be decoded. This is the class of failure
    /// that is fatal to the pool worker: the record is removed from the
    /// replay path, but the event is loud because it means the store and
    /// the code disagree about reality.
    #[error("corrupt storage record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// StoredTransaction
// ---------------------------------------------------------------------------

/// The durable form of an accepted pool transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    /// Chain height when the pool accepted the transaction. Drives the
    /// age-based pruning sweep.
    pub block_number: u64,
    /// Transaction hash — the unique key.
    pub hash: String,
    /// Hex-encoded sender public key, kept so the sender can be
    /// re-derived without decoding the payload.
    pub sender_public_key: String,
    /// The full serialized transaction.
    pub serialized: Vec<u8>,
}

// ---------------------------------------------------------------------------
// PoolStore
// ---------------------------------------------------------------------------

/// sled-backed durable pool storage.
///
/// # Thread Safety
///
/// sled is inherently thread-safe, but the pool never relies on that:
/// all access happens under the pool-wide lock, single-file.
#[derive(Debug, Clone)]
pub struct PoolStore {
    /// The underlying sled database handle.
    db: Db,
    /// Stored transactions keyed by admission sequence (big-endian u64).
    entries: Tree,
    /// Reverse index: transaction hash -> admission sequence.
    hashes: Tree,
}

impl PoolStore {
    /// Open or create a pool store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary store that lives in memory and is cleaned up
    /// automatically when dropped.
    ///
    /// Ideal for unit tests — no filesystem side effects, no cleanup.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let entries = db.open_tree("pool_entries")?;
        let hashes = db.open_tree("pool_hashes")?;
        Ok(Self {
            db,
            entries,
            hashes,
        })
    }

    /// Persist an accepted transaction, assigning and returning its
    /// admission sequence. Flushes before returning.
    pub fn add(&self, stored: &StoredTransaction) -> StoreResult<u64> {
        let sequence = self.db.generate_id()?;
        let key = sequence.to_be_bytes();
        let value = bincode::serialize(stored)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.entries.insert(&key[..], value)?;
        self.hashes.insert(stored.hash.as_bytes(), &key[..])?;
        self.db.flush()?;

        Ok(sequence)
    }

    /// Whether a transaction with this hash is on record.
    pub fn has(&self, hash: &str) -> StoreResult<bool> {
        Ok(self.hashes.contains_key(hash.as_bytes())?)
    }

    /// All stored transactions in admission order, with their sequences.
    pub fn all(&self) -> StoreResult<Vec<(u64, StoredTransaction)>> {
        let mut result = Vec::new();
        for item in self.entries.iter() {
            let (key, value) = item?;
            result.push(Self::decode(&key, &value)?);
        }
        Ok(result)
    }

    /// Stored transactions accepted at or before `block_number`, newest
    /// admission first (so pruning cascades hit dependents before their
    /// ancestors).
    pub fn older_than(&self, block_number: u64) -> StoreResult<Vec<(u64, StoredTransaction)>> {
        let mut result = Vec::new();
        for item in self.entries.iter().rev() {
            let (key, value) = item?;
            let (sequence, stored) = Self::decode(&key, &value)?;
            if stored.block_number <= block_number {
                result.push((sequence, stored));
            }
        }
        Ok(result)
    }

    /// Remove a transaction by hash. Unknown hashes are a no-op.
    pub fn remove(&self, hash: &str) -> StoreResult<()> {
        if let Some(key) = self.hashes.remove(hash.as_bytes())? {
            self.entries.remove(key)?;
        }
        Ok(())
    }

    /// Delete every stored transaction. Used by the pool's full flush.
    pub fn clear(&self) -> StoreResult<()> {
        self.entries.clear()?;
        self.hashes.clear()?;
        self.db.flush()?;
        Ok(())
    }

    /// Number of stored transactions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn decode(key: &[u8], value: &[u8]) -> StoreResult<(u64, StoredTransaction)> {
        let sequence_bytes: [u8; 8] = key
            .try_into()
            .map_err(|_| StoreError::Corrupt(format!("bad sequence key length {}", key.len())))?;
        let stored = bincode::deserialize(value)
            .map_err(|e| StoreError::Corrupt(format!("undecodable entry: {e}")))?;
        Ok((u64::from_be_bytes(sequence_bytes), stored))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(hash: &str, block_number: u64) -> StoredTransaction {
        StoredTransaction {
            block_number,
            hash: hash.to_string(),
            sender_public_key: "aa".repeat(32),
            serialized: vec![1, 2, 3],
        }
    }

    #[test]
    fn add_assigns_monotonic_sequences() {
        let store = PoolStore::open_temporary().unwrap();
        let a = store.add(&stored("tx-a", 1)).unwrap();
        let b = store.add(&stored("tx-b", 1)).unwrap();
        let c = store.add(&stored("tx-c", 2)).unwrap();
        assert!(a < b && b < c);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn has_reflects_contents() {
        let store = PoolStore::open_temporary().unwrap();
        assert!(!store.has("tx-a").unwrap());
        store.add(&stored("tx-a", 1)).unwrap();
        assert!(store.has("tx-a").unwrap());
    }

    #[test]
    fn all_returns_admission_order() {
        let store = PoolStore::open_temporary().unwrap();
        store.add(&stored("first", 1)).unwrap();
        store.add(&stored("second", 9)).unwrap();
        store.add(&stored("third", 3)).unwrap();

        let hashes: Vec<String> = store
            .all()
            .unwrap()
            .into_iter()
            .map(|(_, s)| s.hash)
            .collect();
        assert_eq!(hashes, vec!["first", "second", "third"]);
    }

    #[test]
    fn older_than_filters_and_reverses() {
        let store = PoolStore::open_temporary().unwrap();
        store.add(&stored("old-1", 5)).unwrap();
        store.add(&stored("fresh", 50)).unwrap();
        store.add(&stored("old-2", 10)).unwrap();

        let old: Vec<String> = store
            .older_than(10)
            .unwrap()
            .into_iter()
            .map(|(_, s)| s.hash)
            .collect();
        assert_eq!(old, vec!["old-2", "old-1"], "newest admission first");
    }

    #[test]
    fn remove_deletes_both_indices() {
        let store = PoolStore::open_temporary().unwrap();
        store.add(&stored("tx-a", 1)).unwrap();
        store.add(&stored("tx-b", 1)).unwrap();

        store.remove("tx-a").unwrap();

        assert!(!store.has("tx-a").unwrap());
        assert!(store.has("tx-b").unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn remove_unknown_hash_is_noop() {
        let store = PoolStore::open_temporary().unwrap();
        store.add(&stored("tx-a", 1)).unwrap();
        store.remove("missing").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_empties_the_store() {
        let store = PoolStore::open_temporary().unwrap();
        store.add(&stored("tx-a", 1)).unwrap();
        store.add(&stored("tx-b", 1)).unwrap();

        store.clear().unwrap();

        assert!(store.is_empty());
        assert!(!store.has("tx-a").unwrap());
    }

    #[test]
    fn contents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool");

        let sequence = {
            let store = PoolStore::open(&path).unwrap();
            store.add(&stored("persistent", 7)).unwrap()
        };

        let store = PoolStore::open(&path).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, sequence);
        assert_eq!(all[0].1.hash, "persistent");
        assert_eq!(all[0].1.block_number, 7);
    }
}
