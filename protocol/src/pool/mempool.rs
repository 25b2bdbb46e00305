//! Registry of per-sender mempools.
//!
//! The [`Mempool`] owns the `address → SenderMempool` mapping and nothing
//! else owns it — there is no global, no singleton; the service threads
//! one registry through all callers. Sender pools are created lazily on
//! first admission and garbage-collected the moment they are disposable,
//! which is what bounds the registry's memory to the live working set.
//!
//! The registry is where nonces below a sender's speculative cursor get
//! routed through the replacement path instead of failing outright: a
//! sender re-bidding an occupied slot is a feature, not a mistake.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::policy::PriorityPolicy;
use super::sender_mempool::SenderMempool;
use super::{PoolConfig, PoolEntry, PoolError};
use crate::state::ExecutionState;
use crate::transaction::Transaction;

/// A consistent copy of one sender's pending queue, taken under the pool
/// lock for the collator.
#[derive(Debug, Clone)]
pub struct SenderSnapshot {
    /// The sender's address.
    pub address: String,
    /// Confirmed spendable balance at snapshot time.
    pub balance: u64,
    /// Pending entries in ascending nonce order.
    pub entries: Vec<PoolEntry>,
}

/// The sender registry.
pub struct Mempool {
    config: Arc<PoolConfig>,
    policy: Arc<dyn PriorityPolicy>,
    provider: Arc<dyn ExecutionState>,
    senders: HashMap<String, SenderMempool>,
}

impl std::fmt::Debug for Mempool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mempool")
            .field("senders", &self.senders.len())
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

impl Mempool {
    /// Create an empty registry.
    pub fn new(
        config: Arc<PoolConfig>,
        policy: Arc<dyn PriorityPolicy>,
        provider: Arc<dyn ExecutionState>,
    ) -> Self {
        Self {
            config,
            policy,
            provider,
            senders: HashMap::new(),
        }
    }

    /// Total transactions across all sender pools.
    pub fn size(&self) -> usize {
        self.senders.values().map(SenderMempool::size).sum()
    }

    /// `true` when no sender holds anything.
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Whether a sender currently has a pool.
    pub fn has_sender(&self, address: &str) -> bool {
        self.senders.contains_key(address)
    }

    /// Borrow one sender's pool, if it exists.
    pub fn sender(&self, address: &str) -> Option<&SenderMempool> {
        self.senders.get(address)
    }

    /// Iterate all live sender pools.
    pub fn sender_mempools(&self) -> impl Iterator<Item = &SenderMempool> {
        self.senders.values()
    }

    /// Admit a transaction, creating the sender's pool on first contact.
    ///
    /// A nonce below the sender's speculative cursor targets an occupied
    /// or consumed slot and is routed through the replacement path;
    /// everything else is a plain append. Returns the entries displaced
    /// by a replacement (empty for a plain add) so the caller can purge
    /// them from storage. Disposable pools are collected on every exit
    /// path, including failures.
    pub fn add(
        &mut self,
        transaction: Transaction,
        sequence: u64,
        accepted_at_block: u64,
    ) -> Result<Vec<PoolEntry>, PoolError> {
        let address = transaction.sender.clone();

        let pool = match self.senders.entry(address.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                debug!(%address, "sender pool created");
                vacant.insert(SenderMempool::configure(
                    Arc::clone(&self.config),
                    Arc::clone(&self.policy),
                    Arc::clone(&self.provider),
                    &address,
                ))
            }
        };

        let result = if transaction.nonce < pool.next_nonce() {
            match pool.replace(transaction.clone(), sequence, accepted_at_block) {
                // No occupied slot matched: fall through to a normal add
                // so the caller gets a consistent error instead of
                // silence.
                Ok(displaced) if displaced.is_empty() => pool
                    .add(transaction, sequence, accepted_at_block)
                    .map(|()| Vec::new()),
                other => other,
            }
        } else {
            pool.add(transaction, sequence, accepted_at_block)
                .map(|()| Vec::new())
        };

        self.dispose_if_empty(&address);
        result
    }

    /// Remove a transaction (and its higher-nonce successors) from a
    /// sender's pool. Unknown senders and hashes remove nothing.
    pub fn remove(&mut self, address: &str, hash: &str) -> Vec<PoolEntry> {
        let Some(pool) = self.senders.get_mut(address) else {
            return Vec::new();
        };
        let removed = pool.remove(hash);
        self.dispose_if_empty(address);
        removed
    }

    /// Re-validate the given senders against refreshed confirmed state,
    /// returning every entry that fell out. The block-commit path.
    pub fn re_add_senders(&mut self, addresses: &[String]) -> Vec<PoolEntry> {
        let mut dropped = Vec::new();

        for address in addresses {
            let Some(pool) = self.senders.get_mut(address) else {
                continue;
            };
            dropped.extend(pool.re_add());
            self.dispose_if_empty(address);
        }

        dropped
    }

    /// The pool-wide eviction candidate: among each sender's *latest*
    /// transaction (the only one removable without orphaning a nonce),
    /// the minimum under the priority policy.
    pub fn lowest_priority(&self) -> Option<PoolEntry> {
        self.senders
            .values()
            .filter_map(|pool| pool.from_latest().next())
            .min_by(|a, b| self.policy.eviction_order(a, b))
            .cloned()
    }

    /// Copy out every sender's queue for the collator.
    pub fn snapshots(&self) -> Vec<SenderSnapshot> {
        self.senders
            .iter()
            .filter(|(_, pool)| !pool.is_disposable())
            .map(|(address, pool)| SenderSnapshot {
                address: address.clone(),
                balance: self.provider.balance_of(address),
                entries: pool.from_earliest().cloned().collect(),
            })
            .collect()
    }

    /// Drop every sender pool.
    pub fn flush(&mut self) {
        self.senders.clear();
    }

    fn dispose_if_empty(&mut self, address: &str) {
        if self
            .senders
            .get(address)
            .is_some_and(SenderMempool::is_disposable)
        {
            self.senders.remove(address);
            debug!(%address, "sender pool disposed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::policy::GasPricePolicy;
    use crate::state::{AccountState, StateLedger};
    use crate::transaction::TransactionBuilder;

    fn fixture() -> (Mempool, Arc<StateLedger>) {
        let ledger = Arc::new(StateLedger::new());
        let mempool = Mempool::new(
            Arc::new(PoolConfig::default()),
            Arc::new(GasPricePolicy),
            Arc::clone(&ledger) as _,
        );
        (mempool, ledger)
    }

    fn fund(ledger: &StateLedger, address: &str) {
        ledger.set_account(address, AccountState::with_balance(u64::MAX / 2));
    }

    fn tx(sender: &str, nonce: u64, gas_price: u64) -> Transaction {
        TransactionBuilder::new()
            .sender(sender)
            .receiver("orbit1receiver")
            .value(100)
            .gas_price(gas_price)
            .gas_limit(21_000)
            .nonce(nonce)
            .timestamp(1_700_000_000_000)
            .build()
    }

    #[test]
    fn size_sums_across_senders() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");
        fund(&ledger, "orbit1bob");

        mempool.add(tx("orbit1alice", 0, 10), 1, 0).unwrap();
        mempool.add(tx("orbit1alice", 1, 10), 2, 0).unwrap();
        mempool.add(tx("orbit1bob", 0, 10), 3, 0).unwrap();

        assert_eq!(mempool.size(), 3);
        assert!(mempool.has_sender("orbit1alice"));
        assert!(mempool.has_sender("orbit1bob"));
        assert_eq!(mempool.sender_mempools().count(), 2);
        assert_eq!(mempool.sender("orbit1alice").unwrap().size(), 2);
    }

    #[test]
    fn failed_first_add_leaves_no_empty_pool() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");

        // Wrong nonce: the lazily created pool must not linger.
        let result = mempool.add(tx("orbit1alice", 9, 10), 1, 0);
        assert!(result.is_err());
        assert!(!mempool.has_sender("orbit1alice"));
        assert_eq!(mempool.size(), 0);
    }

    #[test]
    fn below_cursor_nonce_routes_to_replacement() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");

        let old = tx("orbit1alice", 0, 10);
        mempool.add(old.clone(), 1, 0).unwrap();

        let displaced = mempool.add(tx("orbit1alice", 0, 20), 2, 0).unwrap();
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].transaction.hash, old.hash);
        assert_eq!(mempool.size(), 1);

        let held = mempool.sender("orbit1alice").unwrap();
        assert_eq!(held.from_earliest().next().unwrap().transaction.gas_price, 20);
    }

    #[test]
    fn consumed_nonce_falls_through_to_honest_error() {
        let (mut mempool, ledger) = fixture();
        ledger.set_account(
            "orbit1alice",
            AccountState {
                nonce: 5,
                balance: u64::MAX / 2,
            },
        );

        mempool.add(tx("orbit1alice", 5, 10), 1, 0).unwrap();

        // Nonce 3 is beneath everything held — no slot, plain-add error.
        let result = mempool.add(tx("orbit1alice", 3, 50), 2, 0);
        assert!(matches!(result, Err(PoolError::NonceMismatch { .. })));
    }

    #[test]
    fn remove_disposes_emptied_sender() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");

        let only = tx("orbit1alice", 0, 10);
        mempool.add(only.clone(), 1, 0).unwrap();
        let removed = mempool.remove("orbit1alice", &only.hash);

        assert_eq!(removed.len(), 1);
        assert!(!mempool.has_sender("orbit1alice"));
    }

    #[test]
    fn remove_unknown_sender_is_noop() {
        let (mut mempool, _) = fixture();
        assert!(mempool.remove("orbit1ghost", "hash").is_empty());
    }

    #[test]
    fn re_add_senders_drops_consumed_entries() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");
        fund(&ledger, "orbit1bob");

        mempool.add(tx("orbit1alice", 0, 10), 1, 0).unwrap();
        mempool.add(tx("orbit1alice", 1, 10), 2, 0).unwrap();
        mempool.add(tx("orbit1bob", 0, 10), 3, 0).unwrap();

        // A block consumed alice's nonce 0; bob untouched.
        ledger.set_account(
            "orbit1alice",
            AccountState {
                nonce: 1,
                balance: u64::MAX / 2,
            },
        );

        let dropped = mempool.re_add_senders(&["orbit1alice".to_string()]);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].transaction.nonce, 0);
        assert_eq!(mempool.size(), 2);
    }

    #[test]
    fn lowest_priority_considers_only_latest_per_sender() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");
        fund(&ledger, "orbit1bob");

        // Alice's nonce-0 transaction is the cheapest in the pool, but
        // evicting it would orphan her nonce 1 — only the latest entry
        // per sender is a candidate.
        mempool.add(tx("orbit1alice", 0, 1), 1, 0).unwrap();
        mempool.add(tx("orbit1alice", 1, 100), 2, 0).unwrap();
        mempool.add(tx("orbit1bob", 0, 50), 3, 0).unwrap();

        let candidate = mempool.lowest_priority().unwrap();
        assert_eq!(candidate.transaction.sender, "orbit1bob");
        assert_eq!(candidate.transaction.gas_price, 50);
    }

    #[test]
    fn snapshots_are_nonce_ordered_copies() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");

        mempool.add(tx("orbit1alice", 0, 10), 1, 0).unwrap();
        mempool.add(tx("orbit1alice", 1, 10), 2, 0).unwrap();

        let snapshots = mempool.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].address, "orbit1alice");
        let nonces: Vec<u64> = snapshots[0]
            .entries
            .iter()
            .map(|e| e.transaction.nonce)
            .collect();
        assert_eq!(nonces, vec![0, 1]);
    }

    #[test]
    fn flush_clears_everything() {
        let (mut mempool, ledger) = fixture();
        fund(&ledger, "orbit1alice");
        mempool.add(tx("orbit1alice", 0, 10), 1, 0).unwrap();

        mempool.flush();
        assert_eq!(mempool.size(), 0);
        assert!(mempool.is_empty());
    }
}
