//! Block candidate selection.
//!
//! The [`Collator`] is the pool's read path: given a consistent snapshot
//! of every sender's pending queue, it produces the ordered transaction
//! list a proposer includes in the next block. The snapshot is taken
//! under the pool-wide lock ([`Service::sender_snapshots`]); selection
//! itself runs lock-free on the copies, so a slow proposer never stalls
//! admission.
//!
//! ## Selection algorithm
//!
//! A k-way greedy merge:
//!
//! - Within a sender, only the earliest pending nonce is ever eligible —
//!   including a later one first would produce an unprocessable block.
//! - Across senders, the eligible transaction with the highest gas price
//!   wins; ties break on admission sequence (earlier admission first),
//!   which keeps the output byte-identical across repeated runs over the
//!   same snapshot.
//! - Selection stops charging a sender the moment its cumulative
//!   worst-case cost would overdraw the balance captured in the
//!   snapshot, and withdraws the sender entirely — its later nonces are
//!   unreachable without the rejected one.
//! - Block budgets bound the result: total gas limit, total serialized
//!   bytes, and transaction count.

use std::collections::BinaryHeap;

use tracing::debug;

use super::mempool::SenderSnapshot;
use super::service::Service;
use super::PoolEntry;
use crate::config;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Block budgets for candidate selection.
#[derive(Debug, Clone)]
pub struct CollatorConfig {
    /// Total gas limit budget for one block.
    pub max_gas: u64,
    /// Total serialized-size budget for one block, in bytes.
    pub max_bytes: usize,
    /// Hard cap on candidate count.
    pub max_transactions: usize,
}

impl Default for CollatorConfig {
    fn default() -> Self {
        Self {
            max_gas: config::MAX_BLOCK_GAS,
            max_bytes: config::MAX_BLOCK_BYTES,
            max_transactions: config::MAX_BLOCK_TRANSACTIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Collator
// ---------------------------------------------------------------------------

/// Builds block candidate lists from pool snapshots.
///
/// Per-sender balances arrive inside the snapshots — captured under the
/// same lock as the queues, so selection always reasons about one
/// consistent moment.
#[derive(Debug)]
pub struct Collator {
    config: CollatorConfig,
}

/// One sender's queue during selection.
struct Lane {
    pending: std::vec::IntoIter<PoolEntry>,
    current: Option<PoolEntry>,
    balance: u64,
    spent: u64,
}

/// Heap key for the currently eligible transaction of one lane.
///
/// Max-heap order: highest gas price first, then *lowest* admission
/// sequence (hence the reversed comparison on `sequence`).
#[derive(PartialEq, Eq)]
struct Head {
    gas_price: u64,
    sequence: u64,
    lane: usize,
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.gas_price
            .cmp(&other.gas_price)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Collator {
    /// Create a collator with the given block budgets.
    pub fn new(config: CollatorConfig) -> Self {
        Self { config }
    }

    /// Produce the candidate list for the next block proposal.
    ///
    /// Deterministic: two invocations over an unchanged pool return
    /// byte-identical lists.
    pub async fn block_candidates(&self, service: &Service) -> Vec<Transaction> {
        let snapshots = service.sender_snapshots().await;
        let candidates = self.select(snapshots);
        debug!(count = candidates.len(), "collated block candidates");
        candidates
    }

    /// Pure selection over already-snapshotted queues.
    pub fn select(&self, snapshots: Vec<SenderSnapshot>) -> Vec<Transaction> {
        let mut lanes: Vec<Lane> = Vec::with_capacity(snapshots.len());
        let mut heap: BinaryHeap<Head> = BinaryHeap::with_capacity(snapshots.len());

        for snapshot in snapshots {
            let balance = snapshot.balance;
            let mut pending = snapshot.entries.into_iter();
            let Some(first) = pending.next() else {
                continue;
            };
            let lane = lanes.len();
            heap.push(Head {
                gas_price: first.transaction.gas_price,
                sequence: first.sequence,
                lane,
            });
            lanes.push(Lane {
                pending,
                current: Some(first),
                balance,
                spent: 0,
            });
        }

        let mut selected: Vec<Transaction> = Vec::new();
        let mut gas_left = self.config.max_gas;
        let mut bytes_left = self.config.max_bytes;

        while let Some(head) = heap.pop() {
            if selected.len() >= self.config.max_transactions {
                break;
            }

            let lane = &mut lanes[head.lane];
            let Some(entry) = lane.current.take() else {
                continue;
            };

            let gas = entry.transaction.gas_limit;
            let size = entry.transaction.size_bytes();
            if gas > gas_left || size > bytes_left {
                // This transaction does not fit, and the sender's later
                // nonces cannot be included without it: the whole lane
                // is withdrawn. Other senders may still fit.
                continue;
            }

            let charge = entry.transaction.max_charge();
            let spent = lane.spent.saturating_add(charge);
            if spent > lane.balance {
                debug!(
                    sender = %entry.transaction.sender,
                    hash = %entry.transaction.hash,
                    "sender withdrawn from collation: cumulative cost overdraws balance"
                );
                continue;
            }

            gas_left -= gas;
            bytes_left -= size;
            lane.spent = spent;
            selected.push(entry.transaction);

            if let Some(next) = lane.pending.next() {
                heap.push(Head {
                    gas_price: next.transaction.gas_price,
                    sequence: next.sequence,
                    lane: head.lane,
                });
                lane.current = Some(next);
            }
        }

        selected
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionBuilder;

    fn collator(config: CollatorConfig) -> Collator {
        Collator::new(config)
    }

    fn entry(sender: &str, nonce: u64, gas_price: u64, sequence: u64) -> PoolEntry {
        let transaction = TransactionBuilder::new()
            .sender(sender)
            .receiver("orbit1receiver")
            .value(100)
            .gas_price(gas_price)
            .gas_limit(21_000)
            .nonce(nonce)
            .timestamp(1_700_000_000_000)
            .build();
        PoolEntry {
            transaction,
            sequence,
            accepted_at_block: 0,
        }
    }

    fn snapshot(sender: &str, balance: u64, entries: Vec<PoolEntry>) -> SenderSnapshot {
        SenderSnapshot {
            address: sender.to_string(),
            balance,
            entries,
        }
    }

    #[test]
    fn orders_by_gas_price_across_senders() {
        let c = collator(CollatorConfig::default());
        let selected = c.select(vec![
            snapshot("orbit1alice", u64::MAX, vec![entry("orbit1alice", 0, 10, 1)]),
            snapshot("orbit1bob", u64::MAX, vec![entry("orbit1bob", 0, 30, 2)]),
            snapshot("orbit1carol", u64::MAX, vec![entry("orbit1carol", 0, 20, 3)]),
        ]);

        let prices: Vec<u64> = selected.iter().map(|t| t.gas_price).collect();
        assert_eq!(prices, vec![30, 20, 10]);
    }

    #[test]
    fn nonce_order_beats_fee_within_a_sender() {
        let c = collator(CollatorConfig::default());
        let selected = c.select(vec![
            snapshot(
                "orbit1alice",
                u64::MAX,
                vec![
                    entry("orbit1alice", 0, 1, 1),
                    entry("orbit1alice", 1, 100, 2),
                ],
            ),
            snapshot("orbit1bob", u64::MAX, vec![entry("orbit1bob", 0, 50, 3)]),
        ]);

        let picks: Vec<(String, u64)> = selected
            .iter()
            .map(|t| (t.sender.clone(), t.nonce))
            .collect();
        // Bob's 50 outbids alice's eligible nonce-0 (fee 1). Alice's
        // fee-100 nonce 1 only becomes eligible after her nonce 0.
        assert_eq!(
            picks,
            vec![
                ("orbit1bob".to_string(), 0),
                ("orbit1alice".to_string(), 0),
                ("orbit1alice".to_string(), 1),
            ]
        );
    }

    #[test]
    fn equal_fees_break_on_admission_sequence() {
        let c = collator(CollatorConfig::default());
        let selected = c.select(vec![
            snapshot("orbit1bob", u64::MAX, vec![entry("orbit1bob", 0, 10, 7)]),
            snapshot("orbit1alice", u64::MAX, vec![entry("orbit1alice", 0, 10, 3)]),
        ]);

        let senders: Vec<&str> = selected.iter().map(|t| t.sender.as_str()).collect();
        assert_eq!(senders, vec!["orbit1alice", "orbit1bob"], "older admission wins");
    }

    #[test]
    fn selection_is_deterministic() {
        let c = collator(CollatorConfig::default());
        let build = || {
            vec![
                snapshot(
                    "orbit1alice",
                    u64::MAX,
                    vec![entry("orbit1alice", 0, 10, 1), entry("orbit1alice", 1, 10, 4)],
                ),
                snapshot("orbit1bob", u64::MAX, vec![entry("orbit1bob", 0, 10, 2)]),
                snapshot("orbit1carol", u64::MAX, vec![entry("orbit1carol", 0, 25, 3)]),
            ]
        };

        let first = c.select(build());
        let second = c.select(build());
        let first_bytes: Vec<Vec<u8>> = first.iter().map(Transaction::to_bytes).collect();
        let second_bytes: Vec<Vec<u8>> = second.iter().map(Transaction::to_bytes).collect();
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn gas_budget_withdraws_sender_but_not_others() {
        let config = CollatorConfig {
            max_gas: 50_000, // room for two 21k transfers, not three
            ..CollatorConfig::default()
        };
        let c = collator(config);

        let selected = c.select(vec![
            snapshot(
                "orbit1alice",
                u64::MAX,
                vec![
                    entry("orbit1alice", 0, 100, 1),
                    entry("orbit1alice", 1, 90, 2),
                    entry("orbit1alice", 2, 80, 3),
                ],
            ),
        ]);

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].nonce, 0);
        assert_eq!(selected[1].nonce, 1);
    }

    #[test]
    fn transaction_count_budget_is_respected() {
        let config = CollatorConfig {
            max_transactions: 2,
            ..CollatorConfig::default()
        };
        let c = collator(config);

        let selected = c.select(vec![
            snapshot("orbit1alice", u64::MAX, vec![entry("orbit1alice", 0, 30, 1)]),
            snapshot("orbit1bob", u64::MAX, vec![entry("orbit1bob", 0, 20, 2)]),
            snapshot("orbit1carol", u64::MAX, vec![entry("orbit1carol", 0, 10, 3)]),
        ]);

        let prices: Vec<u64> = selected.iter().map(|t| t.gas_price).collect();
        assert_eq!(prices, vec![30, 20]);
    }

    #[test]
    fn byte_budget_is_respected() {
        let one_tx_bytes = entry("orbit1alice", 0, 10, 1).transaction.size_bytes();
        let config = CollatorConfig {
            max_bytes: one_tx_bytes + one_tx_bytes / 2,
            ..CollatorConfig::default()
        };
        let c = collator(config);

        let selected = c.select(vec![
            snapshot("orbit1alice", u64::MAX, vec![entry("orbit1alice", 0, 30, 1)]),
            snapshot("orbit1bob", u64::MAX, vec![entry("orbit1bob", 0, 20, 2)]),
        ]);

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].gas_price, 30);
    }

    #[test]
    fn cumulative_balance_caps_a_sender() {
        let first = entry("orbit1alice", 0, 10, 1);
        let second = entry("orbit1alice", 1, 10, 2);
        let third = entry("orbit1alice", 2, 10, 3);
        // Balance covers exactly two worst-case charges.
        let balance = first.transaction.max_charge() + second.transaction.max_charge();

        let c = collator(CollatorConfig::default());
        let selected = c.select(vec![
            snapshot("orbit1alice", balance, vec![first, second, third]),
            snapshot("orbit1bob", u64::MAX, vec![entry("orbit1bob", 0, 5, 4)]),
        ]);

        let picks: Vec<(String, u64)> = selected
            .iter()
            .map(|t| (t.sender.clone(), t.nonce))
            .collect();
        assert_eq!(
            picks,
            vec![
                ("orbit1alice".to_string(), 0),
                ("orbit1alice".to_string(), 1),
                ("orbit1bob".to_string(), 0),
            ],
            "alice's third transaction would overdraw; bob still selected"
        );
    }

    #[test]
    fn empty_pool_collates_empty_block() {
        let c = collator(CollatorConfig::default());
        assert!(c.select(Vec::new()).is_empty());
        assert!(c
            .select(vec![snapshot("orbit1alice", u64::MAX, Vec::new())])
            .is_empty());
    }
}
