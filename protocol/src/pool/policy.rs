//! Pluggable priority policy for eviction and replacement.
//!
//! The pool needs two judgment calls it should not hardcode: which
//! transaction dies first when capacity runs out, and what a new
//! transaction must offer to displace an old one in the same nonce slot.
//! Deployments disagree on both, so the rule is a strategy object passed
//! into the service at construction — not an inheritance hierarchy, not a
//! global.
//!
//! The documented default is [`GasPricePolicy`]: eviction removes the
//! lowest gas price first (oldest admission first on ties), and a
//! replacement must bid a strictly higher gas price than the transaction
//! it displaces.

use std::cmp::Ordering;
use std::fmt;

use super::PoolEntry;
use crate::transaction::Transaction;

/// The pool's priority rule.
///
/// Implementations must induce a *total* order over pool entries in
/// [`eviction_order`](PriorityPolicy::eviction_order) — admission
/// sequences are unique, so tie-breaking on them guarantees totality.
pub trait PriorityPolicy: Send + Sync + fmt::Debug {
    /// Eviction order: `Less` means `a` is evicted before `b`.
    fn eviction_order(&self, a: &PoolEntry, b: &PoolEntry) -> Ordering;

    /// Whether an incoming transaction outbids the current
    /// lowest-priority entry for a slot in a full pool.
    fn outbids(&self, incoming: &Transaction, lowest: &PoolEntry) -> bool;

    /// Whether `new` may replace `old` in the same nonce slot.
    fn allows_replacement(&self, old: &Transaction, new: &Transaction) -> bool;
}

/// Default policy: gas price is the priority signal.
///
/// - Eviction: ascending gas price, then ascending admission sequence
///   (oldest first — it has had the longest chance at inclusion).
/// - Full-pool admission: the incoming bid must be strictly higher than
///   the lowest entry's.
/// - Replacement: strictly higher gas price, so a slot can never be
///   re-occupied for free.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasPricePolicy;

impl PriorityPolicy for GasPricePolicy {
    fn eviction_order(&self, a: &PoolEntry, b: &PoolEntry) -> Ordering {
        a.transaction
            .gas_price
            .cmp(&b.transaction.gas_price)
            .then_with(|| a.sequence.cmp(&b.sequence))
    }

    fn outbids(&self, incoming: &Transaction, lowest: &PoolEntry) -> bool {
        incoming.gas_price > lowest.transaction.gas_price
    }

    fn allows_replacement(&self, old: &Transaction, new: &Transaction) -> bool {
        new.gas_price > old.gas_price
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
