//! Per-sender nonce-ordered working set.
//!
//! A [`SenderMempool`] holds one account's pending transactions in
//! strictly ascending nonce order — it is a sequence, not a priority
//! structure — and owns the [`SenderState`] cursor that validates every
//! mutation. The registry creates one on a sender's first accepted
//! transaction and disposes of it the moment it is empty.
//!
//! The order invariant needs no sorting: [`SenderState::apply`] only
//! admits the exact next nonce, so appends are ordered by construction
//! and removal always takes a suffix.

use std::sync::Arc;

use tracing::debug;

use super::policy::PriorityPolicy;
use super::sender_state::SenderState;
use super::{PoolConfig, PoolEntry, PoolError};
use crate::state::ExecutionState;
use crate::transaction::Transaction;

/// One sender's slice of the pool.
#[derive(Debug)]
pub struct SenderMempool {
    config: Arc<PoolConfig>,
    policy: Arc<dyn PriorityPolicy>,
    state: SenderState,
    /// Held transactions, strictly ascending by nonce.
    transactions: Vec<PoolEntry>,
}

impl SenderMempool {
    /// Create a sender pool for `address`, seeding its cursor from
    /// confirmed state.
    pub fn configure(
        config: Arc<PoolConfig>,
        policy: Arc<dyn PriorityPolicy>,
        provider: Arc<dyn ExecutionState>,
        address: &str,
    ) -> Self {
        let state = SenderState::configure(provider, address, config.max_transaction_bytes);
        Self {
            config,
            policy,
            state,
            transactions: Vec::new(),
        }
    }

    /// Number of held transactions.
    pub fn size(&self) -> usize {
        self.transactions.len()
    }

    /// `true` iff this pool holds nothing and the registry may drop it.
    pub fn is_disposable(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Next nonce this sender is expected to use, counting held
    /// transactions.
    pub fn next_nonce(&self) -> u64 {
        self.state.next_nonce()
    }

    /// Held transactions from the lowest nonce up. Lazy, restartable.
    pub fn from_earliest(&self) -> impl DoubleEndedIterator<Item = &PoolEntry> {
        self.transactions.iter()
    }

    /// Held transactions from the highest nonce down. Lazy, restartable.
    pub fn from_latest(&self) -> impl Iterator<Item = &PoolEntry> {
        self.transactions.iter().rev()
    }

    /// Admit a transaction at this sender's next nonce.
    ///
    /// Enforces the per-sender cap (unless the sender is on the
    /// `allowed_senders` exemption list), then delegates validation to
    /// the state cursor. Failures propagate unchanged and nothing is
    /// inserted.
    pub fn add(
        &mut self,
        transaction: Transaction,
        sequence: u64,
        accepted_at_block: u64,
    ) -> Result<(), PoolError> {
        if self.transactions.len() >= self.config.max_transactions_per_sender
            && !self.config.allowed_senders.contains(&transaction.sender)
        {
            return Err(PoolError::SenderExceededLimit {
                sender: transaction.sender.clone(),
                limit: self.config.max_transactions_per_sender,
            });
        }

        self.state.apply(&transaction)?;

        debug_assert!(
            self.transactions
                .last()
                .map_or(true, |last| last.transaction.nonce + 1 == transaction.nonce),
            "apply admitted a non-consecutive nonce"
        );

        self.transactions.push(PoolEntry {
            transaction,
            sequence,
            accepted_at_block,
        });
        Ok(())
    }

    /// Remove the transaction with `hash` and every transaction with a
    /// strictly higher nonce — a gap would make the rest unprocessable.
    ///
    /// The cursor is reverted highest-nonce-first. Returns the removed
    /// set in descending nonce order so the caller can decide whether to
    /// re-queue; an unknown hash removes nothing.
    pub fn remove(&mut self, hash: &str) -> Vec<PoolEntry> {
        let Some(index) = self
            .transactions
            .iter()
            .position(|entry| entry.transaction.hash == hash)
        else {
            return Vec::new();
        };

        let mut removed = self.transactions.split_off(index);
        removed.reverse();
        for entry in &removed {
            self.state.revert(&entry.transaction);
        }
        removed
    }

    /// Replace the same-nonce slot with a better-paying transaction.
    ///
    /// Returns the displaced entries: just the old occupant when the
    /// substitution succeeds in place, or the old occupant plus any tail
    /// transactions that failed re-validation when the slot had to be
    /// rebuilt. An empty result means no replacement was possible and
    /// the caller should treat the transaction as a normal add (which
    /// will produce the honest error).
    pub fn replace(
        &mut self,
        transaction: Transaction,
        sequence: u64,
        accepted_at_block: u64,
    ) -> Result<Vec<PoolEntry>, PoolError> {
        let Some(index) = self
            .transactions
            .iter()
            .position(|entry| entry.transaction.nonce == transaction.nonce)
        else {
            // Nonce is below everything held: already consumed on-chain.
            return Ok(Vec::new());
        };

        let occupant = self.transactions[index].clone();
        if !self
            .policy
            .allows_replacement(&occupant.transaction, &transaction)
        {
            return Err(PoolError::ReplacementUnderpriced {
                nonce: transaction.nonce,
                offered: transaction.gas_price,
                current: occupant.transaction.gas_price,
            });
        }

        // Fast path: swap the reservation in place and keep the tail.
        if self.state.replace(
            &occupant.transaction,
            &transaction,
            self.state.next_nonce(),
        )? {
            self.transactions[index] = PoolEntry {
                transaction,
                sequence,
                accepted_at_block,
            };
            return Ok(vec![occupant]);
        }

        // Slow path: revert the slot and its tail, then rebuild with the
        // replacement at the front. Tail entries that no longer validate
        // (the pricier replacement may have eaten their budget) are
        // dropped and reported.
        let mut tail = self.transactions.split_off(index);
        for entry in tail.iter().rev() {
            self.state.revert(&entry.transaction);
        }

        let mut displaced = vec![tail.remove(0)];
        let mut pending = vec![PoolEntry {
            transaction,
            sequence,
            accepted_at_block,
        }];
        pending.extend(tail);

        for entry in pending {
            match self.add(
                entry.transaction.clone(),
                entry.sequence,
                entry.accepted_at_block,
            ) {
                Ok(()) => {}
                Err(error) => {
                    debug!(
                        hash = %entry.transaction.hash,
                        %error,
                        "dropped while rebuilding replaced tail"
                    );
                    displaced.push(entry);
                }
            }
        }

        Ok(displaced)
    }

    /// Re-validate every held transaction against a freshly reset
    /// cursor, returning the subset that no longer passes.
    ///
    /// Used after a block commit touching this sender and after reorgs:
    /// entries consumed by the chain fail the nonce check and fall out;
    /// the survivors are re-applied in order with their original
    /// admission sequence preserved.
    pub fn re_add(&mut self) -> Vec<PoolEntry> {
        self.state.reset();

        let held = std::mem::take(&mut self.transactions);
        let mut dropped = Vec::new();

        for entry in held {
            match self.add(
                entry.transaction.clone(),
                entry.sequence,
                entry.accepted_at_block,
            ) {
                Ok(()) => {}
                Err(error) => {
                    debug!(
                        hash = %entry.transaction.hash,
                        %error,
                        "dropped during re-validation"
                    );
                    dropped.push(entry);
                }
            }
        }

        dropped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
