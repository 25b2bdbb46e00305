//! # Transaction Module
//!
//! Construction, signing, and verification for ORBIT transactions. Every
//! value transfer on the network is represented as a [`Transaction`].
//!
//! ## Architecture
//!
//! ```text
//! builder.rs      — Transaction value type + fluent TransactionBuilder
//! signing.rs      — Transaction signing with Ed25519 keypairs
//! verification.rs — Structural and cryptographic verification
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build** with [`TransactionBuilder`] to assemble the fields.
//! 2. **Sign** via [`sign_transaction`] with the sender's keypair.
//! 3. **Broadcast** the signed transaction to the pool worker.
//! 4. **Verify**: [`verify_transaction`] runs before the transaction is
//!    allowed anywhere near the pool's speculative state.
//! 5. **Collate**: the pool's collator hands it to a block proposer.
//!
//! ## Design Decisions
//!
//! - Transaction hashes are `double_sha256` of the canonical byte
//!   representation (excluding signature and public key), matching
//!   Bitcoin's approach to prevent length-extension attacks. The hash is
//!   the transaction's identity everywhere: pool, storage, wire.
//! - All amounts are `u64` in the smallest denomination. No floating
//!   point anywhere near monetary values.
//! - `gas_price` is the fee bid per gas unit; `gas_limit` caps execution.
//!   `value + gas_price * gas_limit` is the worst-case balance charge the
//!   pool reserves during speculative validation.
//! - The wire/storage form is bincode via [`Transaction::to_bytes`]:
//!   compact, deterministic, and the same bytes the pool persists.

pub mod builder;
pub mod signing;
pub mod verification;

pub use builder::{Transaction, TransactionBuilder};
pub use signing::{sign_transaction, SigningError};
pub use verification::{verify_transaction, TransactionError};
