//! Per-sender speculative nonce/balance cursor.
//!
//! A [`SenderState`] is the pool's working model of one account: the
//! confirmed nonce and balance pulled from the execution-state provider,
//! advanced speculatively as pending transactions are applied and wound
//! back as they are reverted. It is owned by exactly one
//! [`super::SenderMempool`] and mutated by nothing else — per-sender
//! isolation is enforced by ownership, not by locks.
//!
//! The cursor invariant: after `apply(tx)` succeeds,
//! `next_nonce() == tx.nonce + 1` and the balance has reserved the
//! transaction's worst-case charge.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::PoolError;
use crate::state::ExecutionState;
use crate::transaction::Transaction;

/// Speculative validation state for a single sender.
pub struct SenderState {
    /// The account this cursor models.
    address: String,

    /// Confirmed-state provider, queried at configure/reset time and for
    /// pre-simulation during apply.
    provider: Arc<dyn ExecutionState>,

    /// Serialized-size ceiling for a single transaction.
    max_transaction_bytes: usize,

    /// Next expected nonce, including the effect of applied pool
    /// transactions.
    nonce: u64,

    /// Remaining spendable balance after reserving the worst-case charge
    /// of every applied pool transaction.
    balance: u64,
}

impl fmt::Debug for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderState")
            .field("address", &self.address)
            .field("nonce", &self.nonce)
            .field("balance", &self.balance)
            .finish()
    }
}

impl SenderState {
    /// Seed a cursor for `address` from confirmed chain state.
    pub fn configure(
        provider: Arc<dyn ExecutionState>,
        address: &str,
        max_transaction_bytes: usize,
    ) -> Self {
        let nonce = provider.nonce_of(address);
        let balance = provider.balance_of(address);

        debug!(address, nonce, balance, "sender state configured");

        Self {
            address: address.to_string(),
            provider,
            max_transaction_bytes,
            nonce,
            balance,
        }
    }

    /// Re-seed from confirmed state, discarding all speculative effects.
    ///
    /// Called when the chain view underneath this sender changed — after
    /// a block commit touching it, or a reorg.
    pub fn reset(&mut self) {
        self.nonce = self.provider.nonce_of(&self.address);
        self.balance = self.provider.balance_of(&self.address);
    }

    /// The next nonce this sender is expected to use, counting applied
    /// pool transactions.
    pub fn next_nonce(&self) -> u64 {
        self.nonce
    }

    /// Speculative balance remaining after all applied reservations.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Validate `tx` against the cursor and, on success, advance it.
    ///
    /// Checks, in order: serialized size, nonce continuity, worst-case
    /// balance coverage, execution pre-simulation. Any failure leaves the
    /// cursor untouched.
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), PoolError> {
        let size = tx.size_bytes();
        if size > self.max_transaction_bytes {
            return Err(PoolError::OversizedTransaction {
                hash: tx.hash.clone(),
                size,
                max: self.max_transaction_bytes,
            });
        }

        if tx.nonce != self.nonce {
            return Err(PoolError::NonceMismatch {
                hash: tx.hash.clone(),
                sender: self.address.clone(),
                expected: self.nonce,
                got: tx.nonce,
            });
        }

        let charge = tx.max_charge();
        if charge > self.balance {
            return Err(PoolError::InsufficientFunds {
                hash: tx.hash.clone(),
                sender: self.address.clone(),
                required: charge,
                available: self.balance,
            });
        }

        let outcome = self.provider.simulate(tx);
        if !outcome.valid {
            return Err(PoolError::Validation {
                hash: tx.hash.clone(),
                reason: outcome
                    .error
                    .unwrap_or_else(|| "simulation rejected transaction".to_string()),
            });
        }

        self.nonce = tx.nonce + 1;
        self.balance -= charge;
        Ok(())
    }

    /// Undo a previously applied transaction's effect on the cursor.
    ///
    /// Reverts must run highest-nonce-first; the caller (the sender
    /// mempool) walks its tail in that order. Sets the cursor back to the
    /// reverted transaction's own nonce and releases its reservation.
    pub fn revert(&mut self, tx: &Transaction) {
        debug_assert_eq!(
            tx.nonce + 1,
            self.nonce,
            "reverts must run in descending nonce order"
        );
        self.nonce = tx.nonce;
        self.balance = self.balance.saturating_add(tx.max_charge());
    }

    /// Atomically substitute `new` for `old` in an already-applied nonce
    /// slot.
    ///
    /// `nonce_offset` is the cursor value at which the replacement is
    /// evaluated — the slot must already be applied beneath it. Returns
    /// `Ok(false)` when the substitution is not feasible in-place (the
    /// released reservation cannot cover the new charge, or the slot is
    /// not actually applied); the caller then falls back to the
    /// revert-and-re-add path. The fee comparison itself belongs to the
    /// pool's priority policy and has already happened by the time this
    /// runs.
    pub fn replace(
        &mut self,
        old: &Transaction,
        new: &Transaction,
        nonce_offset: u64,
    ) -> Result<bool, PoolError> {
        let size = new.size_bytes();
        if size > self.max_transaction_bytes {
            return Err(PoolError::OversizedTransaction {
                hash: new.hash.clone(),
                size,
                max: self.max_transaction_bytes,
            });
        }

        if old.nonce >= nonce_offset {
            // The slot is not beneath the cursor, so nothing was applied
            // that could be swapped out in place.
            return Ok(false);
        }

        let outcome = self.provider.simulate(new);
        if !outcome.valid {
            return Err(PoolError::Validation {
                hash: new.hash.clone(),
                reason: outcome
                    .error
                    .unwrap_or_else(|| "simulation rejected transaction".to_string()),
            });
        }

        let released = self.balance.saturating_add(old.max_charge());
        let charge = new.max_charge();
        if charge > released {
            return Ok(false);
        }

        self.balance = released - charge;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
