//! # Key Management
//!
//! Ed25519 keypair generation, serialization, and address derivation for
//! ORBIT identities.
//!
//! Every participant in the ORBIT network has at least one Ed25519
//! keypair. The account address users see is derived from the public key:
//!
//! ```text
//! public_key (32 bytes)
//!     -> BLAKE3(public_key) -> 32 bytes
//!     -> Bech32("orbit", hash) -> orbit1qw508d6qe...
//! ```
//!
//! The `orbit` human-readable prefix makes addresses immediately
//! recognizable, and Bech32 gives built-in error detection — it can catch
//! up to 4 character errors, which matters when users copy-paste
//! addresses into payment forms.
//!
//! ## Why Ed25519?
//!
//! - Deterministic signatures (no k-value footguns like ECDSA).
//! - 128-bit security level in 32+32 bytes. Compact and sufficient.
//! - Fast verification — important when you're checking thousands of
//!   signatures per block.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek).
//! - We use OS-level RNG (`OsRng`) for key generation. If your OS RNG is
//!   broken, you have bigger problems than ORBIT.
//! - Key bytes are never logged. If you add logging to this module, you
//!   will be asked to leave.

use bech32::{Bech32, Hrp};
use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::hash::blake3_hash;
use crate::config::MAINNET_HRP;

/// Errors that can occur during key operations.
///
/// These are intentionally vague about *why* something failed — leaking
/// details about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid address encoding")]
    InvalidAddress,
}

// ---------------------------------------------------------------------------
// OrbitKeypair
// ---------------------------------------------------------------------------

/// An ORBIT identity keypair wrapping Ed25519 signing and verification keys.
///
/// This is the atomic unit of identity in the protocol. Every address,
/// every signature, every pool admission ultimately traces back to one of
/// these.
///
/// ## Serialization
///
/// `OrbitKeypair` intentionally does NOT implement `Serialize` /
/// `Deserialize` directly. Serializing private keys should be a
/// deliberate, conscious act, not something that happens because someone
/// shoved a keypair into a JSON response. Use `to_bytes()` /
/// `from_bytes()` explicitly.
///
/// # Examples
///
/// ```
/// use orbit_protocol::crypto::keys::OrbitKeypair;
///
/// let kp = OrbitKeypair::generate();
/// let msg = b"send 100 ORB to alice";
/// let sig = kp.sign(msg);
/// assert!(kp.public_key().verify(msg, &sig));
/// ```
pub struct OrbitKeypair {
    /// The Ed25519 signing (private) key. 32 bytes of pure responsibility.
    signing_key: SigningKey,
}

impl OrbitKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    ///
    /// **Warning**: if you call this with a weak seed, you get a weak key.
    /// Use a proper CSPRNG or KDF to produce the seed bytes.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Reconstruct a keypair from raw 32-byte secret key material.
    ///
    /// The public key is re-derived from the secret key to ensure
    /// consistency. In Ed25519, the 32-byte secret key *is* the seed.
    pub fn from_bytes(secret_key_bytes: &[u8; SECRET_KEY_LENGTH]) -> Result<Self, KeyError> {
        Ok(Self::from_seed(secret_key_bytes))
    }

    /// Export the 32-byte secret key. Handle with care.
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// Sign a message with this keypair.
    pub fn sign(&self, message: &[u8]) -> OrbitSignature {
        let sig: DalekSignature = self.signing_key.sign(message);
        OrbitSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// The public half of this keypair, safe to share with the world.
    pub fn public_key(&self) -> OrbitPublicKey {
        OrbitPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The bech32 account address derived from the public key.
    pub fn address(&self) -> String {
        self.public_key().to_address()
    }
}

impl Clone for OrbitKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for OrbitKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even
        // "partially." A partial leak is still a leak.
        write!(f, "OrbitKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// OrbitPublicKey
// ---------------------------------------------------------------------------

/// The public half of an ORBIT identity, safe to share with the world.
///
/// This is what you give to other people so they can verify your
/// signatures and send you money. Losing this is inconvenient but not
/// catastrophic — it can be re-derived from the signing key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrbitPublicKey {
    bytes: [u8; 32],
}

impl OrbitPublicKey {
    /// Try to create an `OrbitPublicKey` from a byte slice.
    ///
    /// Validates the length and that the bytes represent a valid Ed25519
    /// point. We don't just accept any 32 bytes — some values aren't
    /// valid points on the curve, and using them leads to weird behavior.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != 32 {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);

        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;

        Ok(Self { bytes })
    }

    /// Parse a public key from its hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex encoding, for display, logging, and transaction embedding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Derive the bech32 account address for this public key:
    /// `Bech32("orbit", BLAKE3(public_key))`.
    pub fn to_address(&self) -> String {
        let digest = blake3_hash(&self.bytes);
        let hrp = Hrp::parse(MAINNET_HRP).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, &digest).expect("32-byte payload always encodes")
    }

    /// Verify a signature over a message against this public key.
    ///
    /// Returns `false` for malformed signatures rather than erroring —
    /// from the caller's perspective a garbage signature and a wrong
    /// signature are the same thing.
    pub fn verify(&self, message: &[u8], signature: &OrbitSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.bytes.as_slice()) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for OrbitPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrbitPublicKey({})", self.to_hex())
    }
}

/// Check that a string is a well-formed ORBIT address: correct HRP and a
/// 32-byte BLAKE3 payload. Says nothing about whether anyone holds the
/// matching key.
pub fn is_valid_address(address: &str) -> bool {
    let expected_hrp = Hrp::parse(MAINNET_HRP).expect("static HRP is valid");
    match bech32::decode(address) {
        Ok((hrp, data)) => hrp == expected_hrp && data.len() == 32,
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// OrbitSignature
// ---------------------------------------------------------------------------

/// An Ed25519 signature over a message.
///
/// 64 bytes. Deterministic for a given (key, message) pair — that's the
/// beauty of Ed25519. No nonce management, no k-value disasters.
///
/// Stored as `Vec<u8>` for serde compatibility, but always exactly 64
/// bytes. If someone hands you an `OrbitSignature` that isn't, verification
/// simply fails — no panics, no undefined behavior, just `false`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrbitSignature {
    bytes: Vec<u8>,
}

impl OrbitSignature {
    /// Wrap raw 64-byte signature material.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Parse a signature from its hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidSecretKey)?;
        if bytes.len() != 64 {
            return Err(KeyError::InvalidSecretKey);
        }
        Ok(Self { bytes })
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex encoding for transaction embedding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for OrbitSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrbitSignature({}…)", &self.to_hex()[..16.min(self.bytes.len() * 2)])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_sign_verify_roundtrip() {
        let kp = OrbitKeypair::generate();
        let msg = b"the quick brown settlement";
        let sig = kp.sign(msg);
        assert!(kp.public_key().verify(msg, &sig));
        assert!(!kp.public_key().verify(b"tampered", &sig));
    }

    #[test]
    fn from_seed_is_deterministic() {
        let seed = [7u8; 32];
        let a = OrbitKeypair::from_seed(&seed);
        let b = OrbitKeypair::from_seed(&seed);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn address_has_orbit_prefix() {
        let kp = OrbitKeypair::generate();
        let address = kp.address();
        assert!(address.starts_with("orbit1"), "got {address}");
        assert!(is_valid_address(&address));
    }

    #[test]
    fn address_is_stable_for_a_key() {
        let kp = OrbitKeypair::from_seed(&[42u8; 32]);
        assert_eq!(kp.address(), kp.public_key().to_address());
    }

    #[test]
    fn invalid_addresses_are_rejected() {
        assert!(!is_valid_address("orbit1"));
        assert!(!is_valid_address("nova1qqqqqq"));
        assert!(!is_valid_address("definitely not an address"));
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let kp = OrbitKeypair::generate();
        let pk = kp.public_key();
        let recovered = OrbitPublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, recovered);
    }

    #[test]
    fn malformed_public_key_rejected() {
        assert!(OrbitPublicKey::try_from_slice(&[0u8; 16]).is_err());
        assert!(OrbitPublicKey::from_hex("zzzz").is_err());
    }

    #[test]
    fn signature_hex_roundtrip() {
        let kp = OrbitKeypair::generate();
        let sig = kp.sign(b"payload");
        let recovered = OrbitSignature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, recovered);
    }

    #[test]
    fn wrong_length_signature_fails_verification() {
        let kp = OrbitKeypair::generate();
        let sig = OrbitSignature { bytes: vec![0u8; 10] };
        assert!(!kp.public_key().verify(b"msg", &sig));
    }

    #[test]
    fn debug_output_hides_secret_material() {
        let kp = OrbitKeypair::from_seed(&[9u8; 32]);
        let debug = format!("{kp:?}");
        assert!(!debug.contains(&hex::encode([9u8; 32])));
    }
}
