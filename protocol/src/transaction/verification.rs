//! Structural and cryptographic verification of signed transactions.
//!
//! This is the "signature/hash verifier" collaborator the pool consults
//! before a transaction is allowed anywhere near speculative state. The
//! checks are stateless — nonce and balance validation against the chain
//! happen later, inside the pool's per-sender state.
//!
//! Checks run cheapest-first so that garbage gets rejected before any
//! elliptic-curve math happens.

use thiserror::Error;

use crate::config::{BASE_TRANSACTION_GAS, TRANSACTION_VERSION};
use crate::crypto::keys::{is_valid_address, OrbitPublicKey, OrbitSignature};
use crate::transaction::Transaction;

/// Errors produced by transaction verification.
///
/// Every variant maps to "this transaction never enters the pool" — there
/// is no partial acceptance.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The format version is newer than this node understands.
    #[error("unsupported transaction version {got} (max {max})")]
    UnsupportedVersion { got: u16, max: u16 },

    /// The declared gas limit cannot cover even a bare transfer.
    #[error("gas limit {got} below the {min} floor")]
    GasLimitTooLow { got: u64, min: u64 },

    /// The sender address is not well-formed bech32.
    #[error("invalid sender address: {address}")]
    InvalidSenderAddress { address: String },

    /// The receiver address is not well-formed bech32.
    #[error("invalid receiver address: {address}")]
    InvalidReceiverAddress { address: String },

    /// The embedded hash does not match the transaction contents.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// The transaction carries no signature.
    #[error("transaction is unsigned")]
    MissingSignature,

    /// The transaction carries no sender public key.
    #[error("transaction has no sender public key")]
    MissingPublicKey,

    /// Signature or key bytes could not be decoded.
    #[error("malformed signature material: {reason}")]
    MalformedSignature { reason: String },

    /// The embedded public key does not hash to the declared sender
    /// address. Key substitution attempt or corrupted transaction.
    #[error("public key does not match sender address {address}")]
    PublicKeyMismatch { address: String },

    /// The signature does not verify over the signable bytes.
    #[error("invalid signature from sender {sender}")]
    InvalidSignature { sender: String },
}

/// Verify a signed transaction's structure and signature.
///
/// The check order:
///
/// 1. Format version is one this node understands.
/// 2. Gas limit covers at least a bare transfer.
/// 3. Sender and receiver addresses are well-formed.
/// 4. The embedded hash matches the recomputed hash.
/// 5. A signature and public key are present and decodable.
/// 6. The public key derives the declared sender address (prevents key
///    substitution).
/// 7. The signature verifies over the signable bytes.
pub fn verify_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    // 1. Version gate.
    if tx.version > TRANSACTION_VERSION {
        return Err(TransactionError::UnsupportedVersion {
            got: tx.version,
            max: TRANSACTION_VERSION,
        });
    }

    // 2. Gas floor.
    if tx.gas_limit < BASE_TRANSACTION_GAS {
        return Err(TransactionError::GasLimitTooLow {
            got: tx.gas_limit,
            min: BASE_TRANSACTION_GAS,
        });
    }

    // 3. Address shape.
    if !is_valid_address(&tx.sender) {
        return Err(TransactionError::InvalidSenderAddress {
            address: tx.sender.clone(),
        });
    }
    if !is_valid_address(&tx.receiver) {
        return Err(TransactionError::InvalidReceiverAddress {
            address: tx.receiver.clone(),
        });
    }

    // 4. Hash integrity.
    let expected_hash = tx.compute_hash();
    if tx.hash != expected_hash {
        return Err(TransactionError::HashMismatch {
            expected: expected_hash,
            actual: tx.hash.clone(),
        });
    }

    // 5. Signature material present and decodable.
    let sig_hex = tx.signature.as_ref().ok_or(TransactionError::MissingSignature)?;
    let pk_hex = tx
        .sender_public_key
        .as_ref()
        .ok_or(TransactionError::MissingPublicKey)?;

    let signature =
        OrbitSignature::from_hex(sig_hex).map_err(|e| TransactionError::MalformedSignature {
            reason: e.to_string(),
        })?;
    let public_key =
        OrbitPublicKey::from_hex(pk_hex).map_err(|e| TransactionError::MalformedSignature {
            reason: e.to_string(),
        })?;

    // 6. Key must hash to the declared sender address.
    if public_key.to_address() != tx.sender {
        return Err(TransactionError::PublicKeyMismatch {
            address: tx.sender.clone(),
        });
    }

    // 7. The actual signature check, last and most expensive.
    if !public_key.verify(&tx.signable_bytes(), &signature) {
        return Err(TransactionError::InvalidSignature {
            sender: tx.sender.clone(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::OrbitKeypair;
    use crate::transaction::{sign_transaction, TransactionBuilder};

    fn signed_tx(kp: &OrbitKeypair) -> Transaction {
        let receiver = OrbitKeypair::generate().address();
        let tx = TransactionBuilder::new()
            .sender(&kp.address())
            .receiver(&receiver)
            .value(1_000)
            .gas_price(50)
            .gas_limit(21_000)
            .nonce(3)
            .timestamp(1_700_000_000_000)
            .build();
        sign_transaction(tx, kp).unwrap()
    }

    #[test]
    fn valid_transaction_verifies() {
        let kp = OrbitKeypair::generate();
        let tx = signed_tx(&kp);
        assert!(verify_transaction(&tx).is_ok());
    }

    #[test]
    fn unsigned_transaction_rejected() {
        let kp = OrbitKeypair::generate();
        let mut tx = signed_tx(&kp);
        tx.signature = None;
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::MissingSignature)
        ));
    }

    #[test]
    fn tampered_value_rejected() {
        let kp = OrbitKeypair::generate();
        let mut tx = signed_tx(&kp);
        tx.value += 1;
        // Tampering changes the recomputed hash first.
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::HashMismatch { .. })
        ));
    }

    #[test]
    fn tampered_value_with_recomputed_hash_still_rejected() {
        let kp = OrbitKeypair::generate();
        let mut tx = signed_tx(&kp);
        tx.value += 1;
        tx.hash = tx.compute_hash();
        // Hash is consistent now, but the signature no longer covers the bytes.
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn substituted_public_key_rejected() {
        let kp = OrbitKeypair::generate();
        let attacker = OrbitKeypair::generate();
        let mut tx = signed_tx(&kp);
        tx.sender_public_key = Some(attacker.public_key().to_hex());
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::PublicKeyMismatch { .. })
        ));
    }

    #[test]
    fn malformed_sender_address_rejected() {
        let kp = OrbitKeypair::generate();
        let mut tx = signed_tx(&kp);
        tx.sender = "not-an-address".to_string();
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::InvalidSenderAddress { .. })
        ));
    }

    #[test]
    fn future_version_rejected() {
        let kp = OrbitKeypair::generate();
        let mut tx = signed_tx(&kp);
        tx.version = TRANSACTION_VERSION + 1;
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn dust_gas_limit_rejected() {
        let kp = OrbitKeypair::generate();
        let receiver = OrbitKeypair::generate().address();
        let tx = TransactionBuilder::new()
            .sender(&kp.address())
            .receiver(&receiver)
            .value(1)
            .gas_limit(100)
            .nonce(0)
            .build();
        let tx = sign_transaction(tx, &kp).unwrap();
        assert!(matches!(
            verify_transaction(&tx),
            Err(TransactionError::GasLimitTooLow { .. })
        ));
    }
}
