//! The pool service: admission, commit, re-add, flush.
//!
//! [`Service`] is the single entry point for everything that mutates the
//! pool. It owns the sender registry and the durable store, and wraps
//! both in the pool-wide FIFO lock so that every operation — network
//! admission, block commit, reorg replay, capacity eviction, age pruning
//! — observes and produces a consistent pool.
//!
//! Ordering discipline for admission: persist first, insert second,
//! un-persist on rejection. A transaction that made it into memory but
//! not onto disk would silently vanish across a worker restart; the
//! reverse merely wastes one re-validation.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::lock::PoolLock;
use super::mempool::{Mempool, SenderSnapshot};
use super::policy::PriorityPolicy;
use super::storage::{PoolStore, StoredTransaction};
use super::{PoolConfig, PoolEntry, PoolError};
use crate::state::ExecutionState;
use crate::transaction::{verify_transaction, Transaction};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a successful admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The transaction entered the pool.
    Added,
    /// The hash was already on record. Idempotent no-op: resubmitting a
    /// transaction is success, not an error.
    AlreadyKnown,
}

/// Accounting from a full pool replay ([`Service::re_add_transactions`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReAddReport {
    /// Stored transactions that re-entered the pool.
    pub restored: usize,
    /// Stored transactions past the age limit, deleted without replay.
    pub expired: usize,
    /// Hashes that failed re-validation and were deleted.
    pub failures: Vec<String>,
}

/// The registry and store, guarded together — they must never disagree
/// for longer than one critical section.
#[derive(Debug)]
struct PoolInner {
    mempool: Mempool,
    storage: PoolStore,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The transaction pool service.
pub struct Service {
    config: Arc<PoolConfig>,
    policy: Arc<dyn PriorityPolicy>,
    provider: Arc<dyn ExecutionState>,
    inner: PoolLock<PoolInner>,
}

impl Service {
    /// Build a service over the given store, provider, and priority
    /// policy. One per node instance — there is no global pool.
    pub fn new(
        config: PoolConfig,
        policy: Arc<dyn PriorityPolicy>,
        provider: Arc<dyn ExecutionState>,
        storage: PoolStore,
    ) -> Self {
        let config = Arc::new(config);
        let mempool = Mempool::new(
            Arc::clone(&config),
            Arc::clone(&policy),
            Arc::clone(&provider),
        );
        Self {
            config,
            policy,
            provider,
            inner: PoolLock::new(PoolInner { mempool, storage }),
        }
    }

    /// Total transactions currently in the pool.
    pub async fn pool_size(&self) -> usize {
        self.inner.exclusive().await.mempool.size()
    }

    /// Admit a broadcast transaction.
    ///
    /// Signature and structural verification run before the transaction
    /// touches any speculative state. A duplicate hash reports
    /// [`AddOutcome::AlreadyKnown`] and changes nothing. When the pool is
    /// full the incoming transaction must outbid the lowest-priority
    /// entry, which is evicted to make room; otherwise the add fails with
    /// [`PoolError::PoolFull`].
    pub async fn add_transaction(&self, transaction: Transaction) -> Result<AddOutcome, PoolError> {
        verify_transaction(&transaction).map_err(|e| PoolError::Validation {
            hash: transaction.hash.clone(),
            reason: e.to_string(),
        })?;

        let mut inner = self.inner.exclusive().await;

        if inner.storage.has(&transaction.hash)? {
            debug!(hash = %transaction.hash, "duplicate transaction ignored");
            return Ok(AddOutcome::AlreadyKnown);
        }

        let accepted_at_block = self.provider.block_number();
        let stored = StoredTransaction {
            block_number: accepted_at_block,
            hash: transaction.hash.clone(),
            sender_public_key: transaction.sender_public_key.clone().unwrap_or_default(),
            serialized: transaction.to_bytes(),
        };
        let sequence = inner.storage.add(&stored)?;

        match self.insert(&mut inner, transaction.clone(), sequence, accepted_at_block) {
            Ok(displaced) => {
                for entry in &displaced {
                    inner.storage.remove(&entry.transaction.hash)?;
                    debug!(hash = %entry.transaction.hash, "removed overwritten tx");
                }
                debug!(hash = %transaction.hash, "tx added to pool");
                Ok(AddOutcome::Added)
            }
            Err(error) => {
                inner.storage.remove(&transaction.hash)?;
                warn!(hash = %transaction.hash, %error, "tx failed to enter pool");
                Err(error)
            }
        }
    }

    /// Explicitly remove a transaction (and its higher-nonce successors)
    /// for a sender. Returns the removed hashes.
    pub async fn remove_transaction(
        &self,
        address: &str,
        hash: &str,
    ) -> Result<Vec<String>, PoolError> {
        let mut inner = self.inner.exclusive().await;

        let removed = inner.mempool.remove(address, hash);
        let mut hashes = Vec::with_capacity(removed.len());
        for entry in removed {
            inner.storage.remove(&entry.transaction.hash)?;
            debug!(hash = %entry.transaction.hash, "removed tx");
            hashes.push(entry.transaction.hash);
        }
        Ok(hashes)
    }

    /// Apply a confirmed block's effect on the pool.
    ///
    /// Each affected sender is re-validated against refreshed confirmed
    /// state: entries the block consumed fail the nonce check and drop
    /// out permanently (this is the one removal path that means
    /// "successfully applied", not "re-queue me"). Afterwards the pool
    /// prunes aged entries and re-enforces its capacity bound.
    pub async fn commit(&self, senders: &[String], consumed_gas: u64) -> Result<(), PoolError> {
        let mut inner = self.inner.exclusive().await;

        let dropped = inner.mempool.re_add_senders(senders);
        for entry in &dropped {
            inner.storage.remove(&entry.transaction.hash)?;
            debug!(hash = %entry.transaction.hash, "removed applied tx");
        }

        self.prune_aged(&mut inner)?;
        self.enforce_capacity(&mut inner)?;

        info!(
            block = self.provider.block_number(),
            senders = senders.len(),
            applied = dropped.len(),
            consumed_gas,
            pool_size = inner.mempool.size(),
            "pool committed"
        );
        Ok(())
    }

    /// Rebuild the pool from storage through full re-validation.
    ///
    /// Used on worker start (crash recovery) and after a chain reorg
    /// invalidated all speculative state. The in-memory registry is
    /// flushed and every stored transaction is replayed in admission
    /// order; entries past the age limit are deleted without replay, and
    /// entries that fail re-validation are deleted and reported.
    pub async fn re_add_transactions(&self) -> Result<ReAddReport, PoolError> {
        let mut inner = self.inner.exclusive().await;

        inner.mempool.flush();

        let expiry = self
            .provider
            .block_number()
            .checked_sub(self.config.max_transaction_age);

        let mut report = ReAddReport::default();

        for (sequence, stored) in inner.storage.all()? {
            if expiry.is_some_and(|threshold| stored.block_number <= threshold) {
                inner.storage.remove(&stored.hash)?;
                debug!(hash = %stored.hash, "not re-adding expired tx");
                report.expired += 1;
                continue;
            }

            let transaction = match Transaction::from_bytes(&stored.serialized) {
                Ok(tx) => tx,
                Err(error) => {
                    inner.storage.remove(&stored.hash)?;
                    warn!(hash = %stored.hash, %error, "undecodable stored tx dropped");
                    report.failures.push(stored.hash);
                    continue;
                }
            };

            match self.insert(&mut inner, transaction, sequence, stored.block_number) {
                Ok(displaced) => {
                    for entry in &displaced {
                        inner.storage.remove(&entry.transaction.hash)?;
                    }
                    report.restored += 1;
                }
                Err(error) => {
                    inner.storage.remove(&stored.hash)?;
                    debug!(hash = %stored.hash, %error, "failed to re-add stored tx");
                    report.failures.push(stored.hash);
                }
            }
        }

        if report.restored > 0 {
            info!(count = report.restored, "previously stored transactions re-added");
        }
        if report.expired > 0 {
            info!(count = report.expired, "previously stored transactions expired");
        }
        if !report.failures.is_empty() {
            warn!(
                count = report.failures.len(),
                "previously stored transactions failed re-adding"
            );
        }

        Ok(report)
    }

    /// Clear the registry and the durable store. Full resynchronization.
    pub async fn flush(&self) -> Result<(), PoolError> {
        let mut inner = self.inner.exclusive().await;
        inner.mempool.flush();
        inner.storage.clear()?;
        info!("pool flushed");
        Ok(())
    }

    /// Consistent per-sender snapshots for the collator, taken under the
    /// pool lock and sorted by address for reproducibility.
    pub async fn sender_snapshots(&self) -> Vec<SenderSnapshot> {
        let inner = self.inner.exclusive().await;
        let mut snapshots = inner.mempool.snapshots();
        snapshots.sort_by(|a, b| a.address.cmp(&b.address));
        snapshots
    }

    // -----------------------------------------------------------------------
    // Internal helpers (all run under the lock)
    // -----------------------------------------------------------------------

    /// Insert into the registry, enforcing the global capacity bound.
    fn insert(
        &self,
        inner: &mut PoolInner,
        transaction: Transaction,
        sequence: u64,
        accepted_at_block: u64,
    ) -> Result<Vec<PoolEntry>, PoolError> {
        let capacity = self.config.max_transactions_in_pool;

        if inner.mempool.size() >= capacity {
            self.prune_aged(inner)?;
        }

        if inner.mempool.size() >= capacity {
            match inner.mempool.lowest_priority() {
                Some(lowest) if self.policy.outbids(&transaction, &lowest) => {
                    self.evict(inner, &lowest)?;
                }
                Some(lowest) => {
                    return Err(PoolError::PoolFull {
                        capacity,
                        lowest_gas_price: lowest.transaction.gas_price,
                    });
                }
                // Capacity zero or registry empty at capacity — nothing
                // to trade out; fall through and let the add decide.
                None => {}
            }
        }

        inner.mempool.add(transaction, sequence, accepted_at_block)
    }

    /// Evict one entry via the eviction path (not the commit path — the
    /// transaction was never applied, so re-broadcast remains legal).
    fn evict(&self, inner: &mut PoolInner, entry: &PoolEntry) -> Result<(), PoolError> {
        let removed = inner
            .mempool
            .remove(&entry.transaction.sender, &entry.transaction.hash);
        for removed_entry in removed {
            inner.storage.remove(&removed_entry.transaction.hash)?;
            debug!(
                hash = %removed_entry.transaction.hash,
                gas_price = removed_entry.transaction.gas_price,
                "evicted lowest priority tx"
            );
        }
        Ok(())
    }

    /// Remove every transaction that has waited longer than the age
    /// limit, cascading through its dependents.
    ///
    /// A dependent removed by an earlier cascade can itself appear in
    /// the aged scan; the purged set keeps the sweep idempotent.
    fn prune_aged(&self, inner: &mut PoolInner) -> Result<usize, PoolError> {
        let Some(threshold) = self
            .provider
            .block_number()
            .checked_sub(self.config.max_transaction_age)
        else {
            return Ok(0);
        };

        let mut purged: HashSet<String> = HashSet::new();
        for (_, stored) in inner.storage.older_than(threshold)? {
            if purged.contains(&stored.hash) {
                continue;
            }

            let transaction = Transaction::from_bytes(&stored.serialized).map_err(|e| {
                PoolError::Storage(super::StoreError::Corrupt(format!(
                    "stored tx {}: {e}",
                    stored.hash
                )))
            })?;

            let removed = inner.mempool.remove(&transaction.sender, &stored.hash);

            inner.storage.remove(&stored.hash)?;
            purged.insert(stored.hash.clone());
            debug!(hash = %stored.hash, "removed old tx");

            for entry in removed {
                if purged.insert(entry.transaction.hash.clone()) {
                    inner.storage.remove(&entry.transaction.hash)?;
                    debug!(hash = %entry.transaction.hash, "removed old tx dependent");
                }
            }
        }
        Ok(purged.len())
    }

    /// Evict lowest-priority entries until the pool fits its capacity.
    fn enforce_capacity(&self, inner: &mut PoolInner) -> Result<usize, PoolError> {
        let mut evicted = 0;
        while inner.mempool.size() > self.config.max_transactions_in_pool {
            let Some(lowest) = inner.mempool.lowest_priority() else {
                break;
            };
            self.evict(inner, &lowest)?;
            evicted += 1;
        }
        Ok(evicted)
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
