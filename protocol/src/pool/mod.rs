//! # Transaction Pool
//!
//! The working set of transactions waiting for block inclusion, and the
//! hardest-working subsystem in the node. The pool holds a per-sender,
//! nonce-ordered view of pending transactions validated against
//! *speculative* state — confirmed chain state plus the predicted effect
//! of everything already admitted — and keeps that view consistent while
//! blocks commit, chains reorganize, and the network keeps shoving new
//! transactions at it.
//!
//! ## Architecture
//!
//! ```text
//! sender_state.rs   — per-sender speculative nonce/balance cursor
//! sender_mempool.rs — per-sender nonce-ordered working set
//! mempool.rs        — registry of sender mempools
//! storage.rs        — sled-backed durable record for crash recovery
//! service.rs        — admission, commit, re-add, flush, eviction, pruning
//! collator.rs       — block candidate selection
//! policy.rs         — pluggable eviction/replacement priority rule
//! lock.rs           — the pool-wide FIFO lock
//! worker.rs         — message-passing fault-isolation boundary
//! ```
//!
//! ## Concurrency model
//!
//! One lock. All of it. Every mutating operation (admission, commit,
//! re-add, flush, eviction) and every consistent read (collation
//! snapshots) acquires the pool-wide [`lock::PoolLock`] in FIFO order.
//! Per-sender isolation is a logical partitioning, not a concurrency
//! boundary; there are no per-sender locks to get wrong.

pub mod collator;
pub mod lock;
pub mod mempool;
pub mod policy;
pub mod sender_mempool;
pub mod sender_state;
pub mod service;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::transaction::Transaction;

pub use collator::{Collator, CollatorConfig};
pub use lock::PoolLock;
pub use mempool::{Mempool, SenderSnapshot};
pub use policy::{GasPricePolicy, PriorityPolicy};
pub use sender_mempool::SenderMempool;
pub use sender_state::SenderState;
pub use service::{AddOutcome, ReAddReport, Service};
pub use storage::{PoolStore, StoreError, StoredTransaction};
pub use worker::{spawn_pool_worker, PoolCommand, PoolHandle, PoolWorkerHandle, WorkerError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for pool behaviour.
///
/// Defaults come from [`crate::config`] and are tuned for a public
/// network. Tests shrink them to force the interesting paths (eviction,
/// per-sender caps) with small fixtures.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Global capacity. When the pool holds this many transactions, a
    /// new one is only accepted if it outbids the current lowest-priority
    /// entry, which is evicted to make room.
    pub max_transactions_in_pool: usize,

    /// Maximum pending transactions per sender.
    pub max_transactions_per_sender: usize,

    /// Senders exempt from the per-sender cap (e.g. the local faucet on
    /// a devnet). Empty in production.
    pub allowed_senders: Vec<String>,

    /// Maximum serialized transaction size in bytes.
    pub max_transaction_bytes: usize,

    /// Blocks a transaction may wait unconfirmed before it is presumed
    /// stale and pruned.
    pub max_transaction_age: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_transactions_in_pool: config::MAX_TRANSACTIONS_IN_POOL,
            max_transactions_per_sender: config::MAX_TRANSACTIONS_PER_SENDER,
            allowed_senders: Vec::new(),
            max_transaction_bytes: config::MAX_TRANSACTION_BYTES,
            max_transaction_age: config::MAX_TRANSACTION_AGE,
        }
    }
}

// ---------------------------------------------------------------------------
// PoolEntry
// ---------------------------------------------------------------------------

/// A transaction as held by the pool: the transaction itself plus the
/// bookkeeping the pool's ordering rules need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    /// The admitted transaction.
    pub transaction: Transaction,

    /// Pool-wide monotonic admission sequence, assigned by storage at
    /// first acceptance and stable across re-adds. Breaks priority ties
    /// deterministically: earlier admission wins.
    pub sequence: u64,

    /// Chain height when the transaction was accepted. Drives age-based
    /// pruning.
    pub accepted_at_block: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by pool operations.
///
/// All of these are answers, not faults: they travel back to the caller
/// through the worker's request/response contract. The only condition
/// fatal to the pool worker is storage-level corruption, surfaced via
/// [`StoreError`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// Bad signature, malformed payload, or failed pre-simulation. The
    /// transaction never touches speculative state.
    #[error("transaction {hash} failed validation: {reason}")]
    Validation { hash: String, reason: String },

    /// The nonce does not match the sender's expected next nonce.
    #[error("tx {hash}: nonce {got} does not match expected {expected} for {sender}")]
    NonceMismatch {
        hash: String,
        sender: String,
        expected: u64,
        got: u64,
    },

    /// The speculative balance cannot cover the worst-case charge.
    #[error("tx {hash}: sender {sender} has {available} but needs {required}")]
    InsufficientFunds {
        hash: String,
        sender: String,
        required: u64,
        available: u64,
    },

    /// The pool is at capacity and the incoming transaction does not
    /// outbid the lowest-priority entry.
    #[error("pool is full ({capacity} transactions, lowest gas price {lowest_gas_price})")]
    PoolFull {
        capacity: usize,
        lowest_gas_price: u64,
    },

    /// The sender already has too many pending transactions.
    #[error("sender {sender} exceeded per-sender limit of {limit}")]
    SenderExceededLimit { sender: String, limit: usize },

    /// The serialized transaction exceeds the size ceiling.
    #[error("tx {hash}: {size} bytes exceeds the {max} byte limit")]
    OversizedTransaction {
        hash: String,
        size: usize,
        max: usize,
    },

    /// A same-nonce replacement that does not improve on the transaction
    /// it would displace.
    #[error("replacement for nonce {nonce} underpriced: offered {offered}, current {current}")]
    ReplacementUnderpriced {
        nonce: u64,
        offered: u64,
        current: u64,
    },

    /// The durable pool store failed. Depending on the variant this is
    /// fatal to the worker (corruption) or transient (I/O).
    #[error("pool storage error: {0}")]
    Storage(#[from] StoreError),
}
