//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] enforces a disciplined construction flow:
//! set the required fields, call `.build()`, and get back an unsigned
//! [`Transaction`] with a deterministic hash derived from its contents.
//!
//! The builder does not sign — that happens in [`super::signing`]. This
//! separation keeps construction testable without key material.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::TRANSACTION_VERSION;
use crate::crypto::hash::double_sha256;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An ORBIT transaction.
///
/// This is the fundamental unit of state change on the network. The
/// `hash` field is the double-SHA-256 of the canonical serialization of
/// all fields *except* `signature` and `sender_public_key`, so the hash
/// is stable across signing — you can compute it before the transaction
/// is signed and it will not change afterward.
///
/// # Canonical Byte Format
///
/// Signing and hash computation use [`Transaction::signable_bytes`],
/// which deterministically serializes: version, sender, receiver, value,
/// gas price, gas limit, nonce, timestamp, payload. The signature and
/// public key are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash: `hex(double_sha256(signable_bytes))`. Identity
    /// of the transaction everywhere — pool, storage, wire.
    pub hash: String,

    /// Transaction format version at the time of creation. Allows
    /// validators to apply the correct rule set during verification.
    pub version: u16,

    /// Sender's ORBIT address (Bech32-encoded, e.g. `orbit1qw508d6...`).
    pub sender: String,

    /// Receiver's ORBIT address (Bech32-encoded).
    pub receiver: String,

    /// Transfer amount in the smallest native unit.
    pub value: u64,

    /// Fee bid per unit of gas. The pool's priority signal: higher gas
    /// price means earlier block inclusion and later eviction.
    pub gas_price: u64,

    /// Maximum gas the sender allows execution to consume.
    pub gas_limit: u64,

    /// Monotonically increasing per-sender sequence number. Prevents
    /// replay and enforces per-sender ordering.
    pub nonce: u64,

    /// Unix timestamp in milliseconds when the transaction was created.
    pub timestamp: u64,

    /// Optional application-specific payload (contract calls, binary
    /// memos, etc.). For human-readable memos, encode as UTF-8.
    pub payload: Option<Vec<u8>>,

    /// Hex-encoded sender public key. Embedded in the transaction so
    /// that validators can verify the signature without a separate key
    /// lookup. Set during signing.
    pub sender_public_key: Option<String>,

    /// Ed25519 signature over [`Transaction::signable_bytes`],
    /// hex-encoded. `None` for unsigned transactions fresh from the
    /// builder.
    pub signature: Option<String>,
}

impl Transaction {
    /// Returns the canonical byte representation used for signing and
    /// hash computation.
    ///
    /// The format is a deterministic concatenation of fields with
    /// null-byte separators and fixed-width little-endian integers.
    /// JSON/serde is intentionally avoided because field ordering is not
    /// guaranteed across serialization formats.
    ///
    /// Excluded fields: `hash`, `sender_public_key`, `signature`.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        // Format version (2 bytes, LE).
        buf.extend_from_slice(&self.version.to_le_bytes());

        // Sender address.
        buf.extend_from_slice(self.sender.as_bytes());
        buf.push(0x00);

        // Receiver address.
        buf.extend_from_slice(self.receiver.as_bytes());
        buf.push(0x00);

        // Value, gas price, gas limit, nonce, timestamp as LE u64.
        buf.extend_from_slice(&self.value.to_le_bytes());
        buf.extend_from_slice(&self.gas_price.to_le_bytes());
        buf.extend_from_slice(&self.gas_limit.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());

        // Payload (length-prefixed if present).
        if let Some(ref payload) = self.payload {
            buf.push(0x01); // payload-present flag
            buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            buf.extend_from_slice(payload);
        } else {
            buf.push(0x00); // no-payload flag
        }

        buf
    }

    /// Computes the transaction hash from the current field values.
    ///
    /// `hash = hex(double_sha256(signable_bytes))`. Deterministic and
    /// independent of signature state.
    pub fn compute_hash(&self) -> String {
        hex::encode(double_sha256(&self.signable_bytes()))
    }

    /// The pool-facing serialized form: the exact bytes persisted to
    /// storage and carried across the worker boundary.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("transaction serialization is infallible for owned data")
    }

    /// Decode a transaction from its serialized form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Serialized size in bytes. Used for the pool's oversize rejection
    /// and the collator's block byte budget.
    pub fn size_bytes(&self) -> usize {
        self.to_bytes().len()
    }

    /// The worst-case balance charge this transaction can incur:
    /// `value + gas_price * gas_limit`. Saturating because an attacker
    /// controls all three inputs and an overflow must read as "too
    /// expensive", never as "free".
    pub fn max_charge(&self) -> u64 {
        self.value
            .saturating_add(self.gas_price.saturating_mul(self.gas_limit))
    }

    /// Returns `true` if the transaction carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for constructing unsigned [`Transaction`] instances.
///
/// # Usage
///
/// ```rust,no_run
/// use orbit_protocol::transaction::TransactionBuilder;
///
/// let tx = TransactionBuilder::new()
///     .sender("orbit1qw508d6...")
///     .receiver("orbit1pk3y7a...")
///     .value(50_000_000)
///     .gas_price(1_000)
///     .gas_limit(21_000)
///     .nonce(1)
///     .build();
/// ```
///
/// The builder sets `version` to the current transaction version and
/// `timestamp` to the current UTC time by default. Both can be
/// overridden.
pub struct TransactionBuilder {
    version: u16,
    sender: String,
    receiver: String,
    value: u64,
    gas_price: u64,
    gas_limit: u64,
    nonce: u64,
    timestamp: Option<u64>,
    payload: Option<Vec<u8>>,
}

impl TransactionBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - `version`: current transaction format version
    /// - `gas_price`: 0 (caller should set a real bid)
    /// - `gas_limit`: 21 000 (a bare transfer)
    /// - `nonce`: 0
    /// - `timestamp`: set automatically at build time
    pub fn new() -> Self {
        Self {
            version: TRANSACTION_VERSION,
            sender: String::new(),
            receiver: String::new(),
            value: 0,
            gas_price: 0,
            gas_limit: crate::config::BASE_TRANSACTION_GAS,
            nonce: 0,
            timestamp: None,
            payload: None,
        }
    }

    /// Sets the format version. Only needed for testing version upgrades.
    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Sets the sender's ORBIT address.
    pub fn sender(mut self, address: &str) -> Self {
        self.sender = address.to_string();
        self
    }

    /// Sets the receiver's ORBIT address.
    pub fn receiver(mut self, address: &str) -> Self {
        self.receiver = address.to_string();
        self
    }

    /// Sets the transfer amount.
    pub fn value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    /// Sets the gas price (fee bid per gas unit).
    pub fn gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Sets the gas limit.
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the sender's nonce (sequence number).
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the timestamp explicitly (Unix milliseconds).
    ///
    /// If not called, `build()` will use the current UTC time.
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attaches an application-specific payload.
    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = Some(data);
        self
    }

    /// Consumes the builder and produces an unsigned [`Transaction`].
    ///
    /// The hash is computed automatically from the signable bytes. The
    /// `signature` and `sender_public_key` fields are `None`.
    pub fn build(self) -> Transaction {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis() as u64);

        let mut tx = Transaction {
            hash: String::new(),
            version: self.version,
            sender: self.sender,
            receiver: self.receiver,
            value: self.value,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            nonce: self.nonce,
            timestamp,
            payload: self.payload,
            sender_public_key: None,
            signature: None,
        };

        tx.hash = tx.compute_hash();
        tx
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        TransactionBuilder::new()
            .sender("orbit1aaaa")
            .receiver("orbit1bbbb")
            .value(1_000_000)
            .gas_price(100)
            .gas_limit(21_000)
            .nonce(1)
            .timestamp(1_700_000_000_000)
            .build()
    }

    #[test]
    fn builder_produces_deterministic_hash() {
        let tx1 = sample_tx();
        let tx2 = sample_tx();
        assert_eq!(tx1.hash, tx2.hash, "same inputs must produce the same hash");
        assert!(!tx1.hash.is_empty());
    }

    #[test]
    fn hash_is_hex_encoded_64_chars() {
        let tx = sample_tx();
        // double_sha256 produces 32 bytes = 64 hex chars.
        assert_eq!(tx.hash.len(), 64);
        assert!(tx.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn compute_hash_matches_stored_hash() {
        let tx = sample_tx();
        assert_eq!(tx.hash, tx.compute_hash());
    }

    #[test]
    fn different_nonce_different_hash() {
        let a = TransactionBuilder::new()
            .sender("orbit1aaaa")
            .receiver("orbit1bbbb")
            .value(1000)
            .nonce(1)
            .timestamp(1_700_000_000_000)
            .build();
        let b = TransactionBuilder::new()
            .sender("orbit1aaaa")
            .receiver("orbit1bbbb")
            .value(1000)
            .nonce(2)
            .timestamp(1_700_000_000_000)
            .build();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn signable_bytes_exclude_signature_and_key() {
        let mut tx = sample_tx();
        let before = tx.signable_bytes();

        tx.signature = Some("deadbeef".to_string());
        tx.sender_public_key = Some("abcdef1234".to_string());
        let after = tx.signable_bytes();

        assert_eq!(before, after, "signing must not affect signable bytes");
        assert_eq!(tx.hash, tx.compute_hash(), "hash stable across signing");
    }

    #[test]
    fn payload_included_in_signable_bytes() {
        let plain = TransactionBuilder::new()
            .sender("orbit1aaaa")
            .receiver("orbit1bbbb")
            .value(100)
            .nonce(1)
            .timestamp(1_700_000_000_000)
            .build();
        let with_payload = TransactionBuilder::new()
            .sender("orbit1aaaa")
            .receiver("orbit1bbbb")
            .value(100)
            .nonce(1)
            .timestamp(1_700_000_000_000)
            .payload(b"hello world".to_vec())
            .build();
        assert_ne!(plain.hash, with_payload.hash);
    }

    #[test]
    fn bincode_roundtrip() {
        let tx = sample_tx();
        let bytes = tx.to_bytes();
        let recovered = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(tx, recovered);
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert!(Transaction::from_bytes(&[0xFF, 0x01, 0x02]).is_err());
    }

    #[test]
    fn max_charge_saturates() {
        let tx = TransactionBuilder::new()
            .sender("orbit1aaaa")
            .receiver("orbit1bbbb")
            .value(u64::MAX)
            .gas_price(u64::MAX)
            .gas_limit(2)
            .nonce(1)
            .timestamp(1_700_000_000_000)
            .build();
        assert_eq!(tx.max_charge(), u64::MAX);
    }

    #[test]
    fn max_charge_adds_value_and_gas() {
        let tx = sample_tx();
        assert_eq!(tx.max_charge(), 1_000_000 + 100 * 21_000);
    }

    #[test]
    fn builder_uses_current_time_if_not_set() {
        let before = Utc::now().timestamp_millis() as u64;
        let tx = TransactionBuilder::new()
            .sender("orbit1aaaa")
            .receiver("orbit1bbbb")
            .value(100)
            .nonce(1)
            .build();
        let after = Utc::now().timestamp_millis() as u64;

        assert!(tx.timestamp >= before);
        assert!(tx.timestamp <= after);
    }

    #[test]
    fn default_version_is_current() {
        assert_eq!(sample_tx().version, TRANSACTION_VERSION);
    }

    #[test]
    fn size_bytes_is_positive() {
        assert!(sample_tx().size_bytes() > 0);
    }
}
