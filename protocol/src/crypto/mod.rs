//! # Cryptographic Primitives
//!
//! The small, boring, load-bearing part of the protocol. Everything here
//! wraps audited implementations (sha2, blake3, ed25519-dalek) behind
//! the handful of operations the rest of the crate actually needs:
//!
//! - `hash`: SHA-256, double-SHA-256 (transaction hashes), BLAKE3
//!   (address derivation).
//! - `keys`: Ed25519 keypairs, public keys, and the bech32 `orbit1…`
//!   address encoding derived from them.
//! - `signatures`: detached sign/verify helpers over canonical bytes.
//!
//! If you find yourself wanting a primitive that isn't here, the answer
//! is almost certainly "no". Add a use case first, then the primitive.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, double_sha256, sha256};
pub use keys::{KeyError, OrbitKeypair, OrbitPublicKey, OrbitSignature};
pub use signatures::{sign_message, verify_signature};
