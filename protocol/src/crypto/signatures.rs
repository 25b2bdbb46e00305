//! Detached signing helpers.
//!
//! Thin convenience layer over [`OrbitKeypair`] / [`OrbitPublicKey`] for
//! call sites that deal in raw byte strings rather than key objects —
//! primarily transaction signing and verification, which canonicalize to
//! bytes before touching any cryptography.

use super::keys::{KeyError, OrbitKeypair, OrbitPublicKey, OrbitSignature};

/// Sign an arbitrary message, returning the signature hex-encoded.
///
/// The hex form is what gets embedded into transactions and shipped over
/// the wire; keeping the encoding in one place means nobody invents a
/// second one.
pub fn sign_message(keypair: &OrbitKeypair, message: &[u8]) -> String {
    keypair.sign(message).to_hex()
}

/// Verify a hex-encoded signature over a message with a hex-encoded
/// public key.
///
/// Returns `Ok(true)` / `Ok(false)` for well-formed inputs and `Err` only
/// when the key or signature cannot be parsed at all — callers that don't
/// care about the distinction can flatten with `unwrap_or(false)`.
pub fn verify_signature(
    public_key_hex: &str,
    message: &[u8],
    signature_hex: &str,
) -> Result<bool, KeyError> {
    let public_key = OrbitPublicKey::from_hex(public_key_hex)?;
    let signature = OrbitSignature::from_hex(signature_hex)?;
    Ok(public_key.verify(message, &signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_through_hex() {
        let kp = OrbitKeypair::generate();
        let msg = b"hex all the way down";
        let sig_hex = sign_message(&kp, msg);

        let ok = verify_signature(&kp.public_key().to_hex(), msg, &sig_hex).unwrap();
        assert!(ok);

        let bad = verify_signature(&kp.public_key().to_hex(), b"other", &sig_hex).unwrap();
        assert!(!bad);
    }

    #[test]
    fn unparseable_inputs_error() {
        let kp = OrbitKeypair::generate();
        let sig_hex = sign_message(&kp, b"msg");
        assert!(verify_signature("not-hex", b"msg", &sig_hex).is_err());
        assert!(verify_signature(&kp.public_key().to_hex(), b"msg", "beef").is_err());
    }
}
