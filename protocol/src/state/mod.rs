//! # Execution State Seam
//!
//! What the transaction pool is allowed to ask the chain. The pool never
//! owns confirmed state — it *queries* it through [`ExecutionState`] to
//! seed per-sender speculative cursors and to pre-simulate candidate
//! transactions. Everything behind this trait (the real execution engine,
//! the state trie, the database) is out of the pool's jurisdiction.
//!
//! Two things live here:
//!
//! - [`ExecutionState`] — the provider trait, implemented by whatever
//!   holds confirmed chain state.
//! - [`StateLedger`] — a flat in-memory implementation backing the node
//!   binary and every pool test. Sufficient for correctness; a real
//!   deployment substitutes the execution engine's view.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{BASE_TRANSACTION_GAS, PAYLOAD_BYTE_GAS};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// AccountState
// ---------------------------------------------------------------------------

/// The confirmed state of a single account as the pool sees it.
///
/// Deliberately minimal — the pool only ever reasons about the next
/// expected nonce and the spendable balance. Anything richer belongs to
/// the execution engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Next expected transaction nonce (monotonically increasing).
    pub nonce: u64,
    /// Spendable balance in the smallest native unit.
    pub balance: u64,
}

impl AccountState {
    /// Create an account with the given initial balance and nonce 0.
    pub fn with_balance(balance: u64) -> Self {
        Self { nonce: 0, balance }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Result of pre-simulating a transaction against confirmed state.
///
/// `valid == false` means the execution engine predicts the transaction
/// would fail — the pool rejects it rather than wasting a block slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Whether execution is predicted to succeed.
    pub valid: bool,
    /// Predicted gas consumption.
    pub gas_used: u64,
    /// Failure description when `valid` is false.
    pub error: Option<String>,
}

impl SimulationOutcome {
    /// A successful prediction.
    pub fn ok(gas_used: u64) -> Self {
        Self {
            valid: true,
            gas_used,
            error: None,
        }
    }

    /// A failed prediction with a reason.
    pub fn failed(gas_used: u64, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            gas_used,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionState
// ---------------------------------------------------------------------------

/// Read-only view of confirmed chain state, as consumed by the pool.
///
/// Implementations must be cheap to query — every pool admission hits
/// `nonce_of`/`balance_of` at least once, under the pool-wide lock.
pub trait ExecutionState: Send + Sync {
    /// Next expected nonce for an address per confirmed state.
    /// Unknown addresses start at 0.
    fn nonce_of(&self, address: &str) -> u64;

    /// Confirmed spendable balance for an address. Unknown addresses
    /// hold 0.
    fn balance_of(&self, address: &str) -> u64;

    /// Height of the latest committed block. Stamped onto stored pool
    /// transactions for age-based pruning.
    fn block_number(&self) -> u64;

    /// Predict whether the transaction would execute successfully on top
    /// of confirmed state, and at what gas cost.
    fn simulate(&self, tx: &Transaction) -> SimulationOutcome;
}

// ---------------------------------------------------------------------------
// StateLedger
// ---------------------------------------------------------------------------

/// Flat in-memory account ledger implementing [`ExecutionState`].
///
/// Thread safety: accounts sit behind a `parking_lot::RwLock`, the block
/// cursor is atomic. The ledger is shared between the pool worker and
/// whatever commits blocks via `Arc<StateLedger>`.
#[derive(Debug, Default)]
pub struct StateLedger {
    /// Account states keyed by ORBIT address.
    accounts: RwLock<HashMap<String, AccountState>>,
    /// Height of the latest committed block.
    block_number: AtomicU64,
}

impl StateLedger {
    /// Create an empty ledger at block height 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an account state.
    pub fn set_account(&self, address: &str, state: AccountState) {
        self.accounts.write().insert(address.to_string(), state);
    }

    /// Read an account's state, defaulting for unknown addresses.
    pub fn account(&self, address: &str) -> AccountState {
        self.accounts.read().get(address).cloned().unwrap_or_default()
    }

    /// Record the effect of a committed transaction: bump the sender's
    /// nonce past it and charge the actual cost.
    ///
    /// Called by the block-commit path, never by the pool itself.
    pub fn apply_committed(&self, sender: &str, nonce: u64, charged: u64) {
        let mut accounts = self.accounts.write();
        let entry = accounts.entry(sender.to_string()).or_default();
        entry.nonce = entry.nonce.max(nonce + 1);
        entry.balance = entry.balance.saturating_sub(charged);
    }

    /// Advance the committed block height by one, returning the new height.
    pub fn advance_block(&self) -> u64 {
        self.block_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Set the committed block height directly (sync/reorg bookkeeping).
    pub fn set_block_number(&self, height: u64) {
        self.block_number.store(height, Ordering::SeqCst);
    }
}

impl ExecutionState for StateLedger {
    fn nonce_of(&self, address: &str) -> u64 {
        self.accounts.read().get(address).map_or(0, |a| a.nonce)
    }

    fn balance_of(&self, address: &str) -> u64 {
        self.accounts.read().get(address).map_or(0, |a| a.balance)
    }

    fn block_number(&self) -> u64 {
        self.block_number.load(Ordering::SeqCst)
    }

    fn simulate(&self, tx: &Transaction) -> SimulationOutcome {
        // Flat gas model: base cost plus a per-byte payload charge. The
        // prediction fails when the declared limit cannot cover it.
        let payload_len = tx.payload.as_ref().map_or(0, |p| p.len()) as u64;
        let gas_needed = BASE_TRANSACTION_GAS.saturating_add(payload_len * PAYLOAD_BYTE_GAS);

        if tx.gas_limit < gas_needed {
            return SimulationOutcome::failed(
                gas_needed,
                format!("gas limit {} below required {}", tx.gas_limit, gas_needed),
            );
        }

        SimulationOutcome::ok(gas_needed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
