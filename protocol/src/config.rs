//! # Protocol Configuration & Constants
//!
//! Every magic number in ORBIT lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! These values define the DNA of the network. Changing them after mainnet
//! launch is somewhere between "difficult" and "career-ending", so choose
//! wisely during devnet.

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Mainnet — the real deal. Mistakes here cost real money.
pub const NETWORK_ID_MAINNET: u32 = 0x4F524254; // "ORBT" in ASCII hex.

/// Testnet — where we break things on purpose and call it "testing."
pub const NETWORK_ID_TESTNET: u32 = 0x4F524254 + 1;

/// Human-readable network prefixes for addresses.
/// Bech32 HRP values — short enough to type, long enough to be unambiguous.
pub const MAINNET_HRP: &str = "orbit";
pub const TESTNET_HRP: &str = "torbit";

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Major version — bump on breaking consensus changes. A.k.a. hard forks.
pub const PROTOCOL_VERSION_MAJOR: u16 = 0;

/// Minor version — bump on backward-compatible additions.
pub const PROTOCOL_VERSION_MINOR: u16 = 1;

/// Transaction format version stamped into every transaction at build time.
/// Validators use it to select the correct verification rule set.
pub const TRANSACTION_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Gas Model
// ---------------------------------------------------------------------------

/// Flat gas cost of the simplest possible transaction — a bare value
/// transfer with no payload. The same floor Ethereum settled on; there is
/// no reason to be original about arithmetic.
pub const BASE_TRANSACTION_GAS: u64 = 21_000;

/// Gas charged per byte of transaction payload during simulation.
pub const PAYLOAD_BYTE_GAS: u64 = 16;

/// Total gas budget for a single block. The collator stops selecting
/// candidates once the cumulative `gas_limit` of selected transactions
/// would exceed this.
pub const MAX_BLOCK_GAS: u64 = 30_000_000;

/// Serialized-size budget for a single block, in bytes.
pub const MAX_BLOCK_BYTES: usize = 2_000_000;

/// Hard cap on the number of transactions in one block, regardless of how
/// small they are. Keeps verification time bounded even under dust spam.
pub const MAX_BLOCK_TRANSACTIONS: usize = 10_000;

// ---------------------------------------------------------------------------
// Transaction Pool
// ---------------------------------------------------------------------------

/// When the pool holds this many transactions, a new one is only accepted
/// if it outbids the current lowest-priority entry (which is then evicted
/// to make room).
pub const MAX_TRANSACTIONS_IN_POOL: usize = 15_000;

/// Maximum pending transactions per sender. A single account gets a deep
/// queue, not the whole pool.
pub const MAX_TRANSACTIONS_PER_SENDER: usize = 150;

/// Maximum transaction age in blocks. A transaction that has sat in the
/// pool this long without being included is presumed stale and pruned.
pub const MAX_TRANSACTION_AGE: u64 = 2_700;

/// Maximum serialized transaction size. Based on the 128 kB limit used by
/// other Ethereum-family clients such as Geth.
pub const MAX_TRANSACTION_BYTES: usize = 128 * 1000;

/// Bounded-mailbox depth for the pool worker. Requests beyond this apply
/// backpressure to the caller instead of growing memory without limit.
pub const POOL_WORKER_MAILBOX: usize = 1_024;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 — the only sane choice for signatures in 2024+.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 signature length. Always 64 bytes. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Hash output length in bytes. Both SHA-256 and BLAKE3 produce 32-byte
/// digests.
pub const HASH_OUTPUT_LENGTH: usize = 32;
