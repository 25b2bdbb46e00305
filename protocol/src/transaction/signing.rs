//! Transaction signing with Ed25519 keypairs.
//!
//! Signing attaches two things to a built transaction: the sender's
//! public key (so verifiers need no external key lookup) and the Ed25519
//! signature over [`Transaction::signable_bytes`]. The transaction hash
//! is unaffected — it is computed over the signable bytes only.

use thiserror::Error;

use crate::crypto::keys::OrbitKeypair;
use crate::transaction::Transaction;

/// Errors that can occur while signing a transaction.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The keypair's derived address does not match the transaction's
    /// declared sender. Signing someone else's transaction is either a
    /// bug or an attack; both get the same answer.
    #[error("keypair address {keypair} does not match transaction sender {sender}")]
    SenderMismatch {
        /// Address derived from the signing keypair.
        keypair: String,
        /// Sender address declared in the transaction.
        sender: String,
    },
}

/// Sign a transaction, attaching the sender's public key and signature.
///
/// The keypair must belong to the declared sender — the derived bech32
/// address is checked against `tx.sender` before any bytes are signed.
pub fn sign_transaction(
    mut tx: Transaction,
    keypair: &OrbitKeypair,
) -> Result<Transaction, SigningError> {
    let keypair_address = keypair.address();
    if keypair_address != tx.sender {
        return Err(SigningError::SenderMismatch {
            keypair: keypair_address,
            sender: tx.sender,
        });
    }

    let signature = keypair.sign(&tx.signable_bytes());
    tx.sender_public_key = Some(keypair.public_key().to_hex());
    tx.signature = Some(signature.to_hex());
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionBuilder;

    #[test]
    fn signing_attaches_key_and_signature() {
        let kp = OrbitKeypair::generate();
        let tx = TransactionBuilder::new()
            .sender(&kp.address())
            .receiver("orbit1receiver")
            .value(500)
            .gas_price(10)
            .nonce(0)
            .timestamp(1_700_000_000_000)
            .build();
        let hash_before = tx.hash.clone();

        let signed = sign_transaction(tx, &kp).unwrap();

        assert!(signed.is_signed());
        assert_eq!(signed.sender_public_key, Some(kp.public_key().to_hex()));
        assert_eq!(signed.hash, hash_before, "hash must survive signing");
    }

    #[test]
    fn signing_for_wrong_sender_fails() {
        let kp = OrbitKeypair::generate();
        let other = OrbitKeypair::generate();
        let tx = TransactionBuilder::new()
            .sender(&other.address())
            .receiver("orbit1receiver")
            .value(500)
            .nonce(0)
            .build();

        let result = sign_transaction(tx, &kp);
        assert!(matches!(result, Err(SigningError::SenderMismatch { .. })));
    }
}
