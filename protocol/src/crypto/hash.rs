//! # Hashing Utilities
//!
//! Cryptographic hash functions used throughout ORBIT. We support two
//! primary hash functions and refuse to support more without a very good
//! reason:
//!
//! - **BLAKE3** — Our default. Fast on every platform, parallelizable,
//!   and provably secure under standard assumptions. Used for address
//!   derivation and anywhere performance matters.
//!
//! - **SHA-256** — For interoperability with Bitcoin, Ethereum, and the
//!   rest of the "we chose SHA-256 in 2009 and now we're stuck with it"
//!   ecosystem. Used in `double_sha256` for transaction hashes.
//!
//! Both provide 128-bit collision resistance with 256-bit output. There
//! is no security reason to prefer SHA-256 — only compatibility. When
//! building ORBIT-native data structures, prefer BLAKE3. When producing
//! identifiers external tooling will cross-check, use what it expects.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// Returns a 32-byte digest as a `Vec<u8>`. Used primarily for the
/// double-hashing construction below. For ORBIT-internal hashing, prefer
/// [`blake3_hash`].
///
/// # Example
///
/// ```
/// use orbit_protocol::crypto::sha256;
///
/// let hash = sha256(b"ORBIT protocol");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
///
/// Same as [`sha256`] but returns `[u8; 32]` for callers that want a
/// fixed-size type without the heap allocation.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. This is the workhorse
/// hash of ORBIT — the `blake3` crate automatically takes advantage of
/// SIMD on supported platforms, and for transaction-sized inputs it beats
/// SHA-256 by a wide margin on every architecture we care about.
///
/// # Example
///
/// ```
/// use orbit_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"ORBIT protocol");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute the double-SHA-256 hash: `SHA-256(SHA-256(data))`.
///
/// This construction is used for transaction identifiers. The double hash
/// protects against length-extension attacks (which SHA-256 alone is
/// vulnerable to, though in practice this matters less than people think)
/// and keeps our transaction hashes shaped like the ones every block
/// explorer on earth already knows how to display.
///
/// # Example
///
/// ```
/// use orbit_protocol::crypto::double_sha256;
///
/// let tx_hash = double_sha256(b"raw transaction bytes");
/// assert_eq!(tx_hash.len(), 32);
/// ```
pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
