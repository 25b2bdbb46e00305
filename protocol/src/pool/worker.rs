//! The pool worker — the fault-isolation boundary.
//!
//! The entire pool (service, sender registry, storage, collator) runs
//! inside a single consumer task behind a bounded mailbox. The host side
//! holds a clonable [`PoolHandle`] and talks to the pool exclusively
//! through messages: request/response commands carry a `oneshot` channel
//! for their typed result, and removals are fire-and-forget. Expensive
//! work — signature verification, speculative validation — happens on
//! the worker's side of the channel, where it cannot stall or crash the
//! consensus-critical caller.
//!
//! Requests carry no mid-flight cancellation: once dequeued, a command
//! runs to completion and its result is sent; a caller that stopped
//! caring simply drops its receiver.
//!
//! A worker that dies (storage corruption, task abort) severs the
//! channel, and every pending and future request fails with
//! [`WorkerError::Unavailable`]. Recovery is to spawn a fresh worker
//! over the same storage path: the first thing a worker does is replay
//! the durable store through full re-validation, so the pool resumes
//! where the last incarnation left off.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::collator::Collator;
use super::service::{AddOutcome, ReAddReport, Service};
use super::{PoolError, StoreError};
use crate::config::POOL_WORKER_MAILBOX;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced to the host side of the worker boundary.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The message channel to the worker is down — the worker crashed or
    /// was shut down. The host must respawn and let the new worker
    /// resynchronize from storage.
    #[error("transaction pool worker is unavailable")]
    Unavailable,

    /// The pool answered with a failure. Part of the normal
    /// request/response contract.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Messages accepted by the pool worker.
#[derive(Debug)]
pub enum PoolCommand {
    /// Admit a serialized transaction. Deserialization and signature
    /// verification happen worker-side.
    AddTransaction {
        serialized: Vec<u8>,
        respond: oneshot::Sender<Result<AddOutcome, PoolError>>,
    },

    /// Fire-and-forget removal, used after downstream consumers finish
    /// with a transaction. No response, by design.
    RemoveTransaction { address: String, hash: String },

    /// A block was confirmed: re-validate the affected senders.
    Commit {
        senders: Vec<String>,
        consumed_gas: u64,
        respond: oneshot::Sender<Result<(), PoolError>>,
    },

    /// Replay the durable store through full re-validation (reorg
    /// recovery).
    ReAddTransactions {
        respond: oneshot::Sender<Result<ReAddReport, PoolError>>,
    },

    /// Collate the candidate list for the next block proposal.
    GetCandidates {
        respond: oneshot::Sender<Result<Vec<Vec<u8>>, PoolError>>,
    },

    /// Clear the pool and its storage.
    Flush {
        respond: oneshot::Sender<Result<(), PoolError>>,
    },

    /// Current pool size.
    GetPoolSize { respond: oneshot::Sender<usize> },
}

impl PoolCommand {
    /// The variant name, for tracing.
    fn variant_name(&self) -> &'static str {
        match self {
            Self::AddTransaction { .. } => "AddTransaction",
            Self::RemoveTransaction { .. } => "RemoveTransaction",
            Self::Commit { .. } => "Commit",
            Self::ReAddTransactions { .. } => "ReAddTransactions",
            Self::GetCandidates { .. } => "GetCandidates",
            Self::Flush { .. } => "Flush",
            Self::GetPoolSize { .. } => "GetPoolSize",
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// The host-side endpoint of the worker boundary. Cheap to clone; every
/// clone talks to the same worker.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    commands: mpsc::Sender<PoolCommand>,
}

impl PoolHandle {
    /// Submit a serialized transaction for admission.
    pub async fn add_transaction(&self, serialized: Vec<u8>) -> Result<AddOutcome, WorkerError> {
        let (respond, receive) = oneshot::channel();
        self.send(PoolCommand::AddTransaction { serialized, respond })
            .await?;
        receive.await.map_err(|_| WorkerError::Unavailable)?.map_err(Into::into)
    }

    /// Fire-and-forget removal of a transaction by sender and hash.
    pub async fn remove_transaction(&self, address: &str, hash: &str) -> Result<(), WorkerError> {
        self.send(PoolCommand::RemoveTransaction {
            address: address.to_string(),
            hash: hash.to_string(),
        })
        .await
    }

    /// Notify the pool of a confirmed block.
    pub async fn commit(&self, senders: Vec<String>, consumed_gas: u64) -> Result<(), WorkerError> {
        let (respond, receive) = oneshot::channel();
        self.send(PoolCommand::Commit {
            senders,
            consumed_gas,
            respond,
        })
        .await?;
        receive.await.map_err(|_| WorkerError::Unavailable)?.map_err(Into::into)
    }

    /// Replay the durable store after a chain reorganization.
    pub async fn re_add_transactions(&self) -> Result<ReAddReport, WorkerError> {
        let (respond, receive) = oneshot::channel();
        self.send(PoolCommand::ReAddTransactions { respond }).await?;
        receive.await.map_err(|_| WorkerError::Unavailable)?.map_err(Into::into)
    }

    /// Fetch the serialized candidate list for the next block.
    pub async fn candidates(&self) -> Result<Vec<Vec<u8>>, WorkerError> {
        let (respond, receive) = oneshot::channel();
        self.send(PoolCommand::GetCandidates { respond }).await?;
        receive.await.map_err(|_| WorkerError::Unavailable)?.map_err(Into::into)
    }

    /// Clear the pool and its storage.
    pub async fn flush(&self) -> Result<(), WorkerError> {
        let (respond, receive) = oneshot::channel();
        self.send(PoolCommand::Flush { respond }).await?;
        receive.await.map_err(|_| WorkerError::Unavailable)?.map_err(Into::into)
    }

    /// Current number of transactions in the pool.
    pub async fn pool_size(&self) -> Result<usize, WorkerError> {
        let (respond, receive) = oneshot::channel();
        self.send(PoolCommand::GetPoolSize { respond }).await?;
        receive.await.map_err(|_| WorkerError::Unavailable)
    }

    async fn send(&self, command: PoolCommand) -> Result<(), WorkerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WorkerError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Owner handle for the worker task: shutdown signal plus join handle.
#[derive(Debug)]
pub struct PoolWorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PoolWorkerHandle {
    /// Signal shutdown and wait for the worker to drain its current
    /// command.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the pool worker over a service and collator.
///
/// The worker first repopulates the pool from storage (the
/// restart-and-resync path), then serves commands until every handle is
/// dropped or shutdown is signalled.
pub fn spawn_pool_worker(service: Service, collator: Collator) -> (PoolHandle, PoolWorkerHandle) {
    let (commands, mailbox) = mpsc::channel(POOL_WORKER_MAILBOX);
    let (shutdown, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(run_worker(service, collator, mailbox, shutdown_rx));

    (
        PoolHandle { commands },
        PoolWorkerHandle { shutdown, task },
    )
}

async fn run_worker(
    service: Service,
    collator: Collator,
    mut mailbox: mpsc::Receiver<PoolCommand>,
    mut shutdown: watch::Receiver<bool>,
) {
    // Crash recovery: rebuild the working set from the durable record
    // before accepting any commands.
    match service.re_add_transactions().await {
        Ok(report) => {
            if report.restored > 0 || report.expired > 0 || !report.failures.is_empty() {
                info!(
                    restored = report.restored,
                    expired = report.expired,
                    failed = report.failures.len(),
                    "pool repopulated from storage"
                );
            }
        }
        Err(error) => {
            error!(%error, "pool repopulation failed; worker exiting");
            return;
        }
    }

    info!("pool worker started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                match changed {
                    Ok(()) if *shutdown.borrow() => {
                        info!("pool worker received shutdown signal");
                        break;
                    }
                    Ok(()) => {}
                    Err(_) => {
                        debug!("worker owner dropped; exiting");
                        break;
                    }
                }
            }
            command = mailbox.recv() => {
                let Some(command) = command else {
                    debug!("all pool handles dropped; worker exiting");
                    break;
                };
                if let Err(error) = handle_command(&service, &collator, command).await {
                    // Storage corruption is the one fault we do not try
                    // to out-clever: die loudly, let the host respawn
                    // and resynchronize.
                    error!(%error, "fatal pool storage fault; worker exiting");
                    break;
                }
            }
        }
    }
}

/// Process one command. Returns `Err` only for faults that must kill the
/// worker; per-request failures travel back through the response channel.
async fn handle_command(
    service: &Service,
    collator: &Collator,
    command: PoolCommand,
) -> Result<(), StoreError> {
    debug!(command = command.variant_name(), "pool worker command");

    match command {
        PoolCommand::AddTransaction { serialized, respond } => {
            let result = match Transaction::from_bytes(&serialized) {
                Ok(transaction) => service.add_transaction(transaction).await,
                Err(error) => Err(PoolError::Validation {
                    hash: String::new(),
                    reason: format!("undecodable transaction: {error}"),
                }),
            };
            let fatal = fatal_storage_fault(&result);
            if respond.send(result).is_err() {
                debug!("add-transaction caller went away");
            }
            fatal
        }
        PoolCommand::RemoveTransaction { address, hash } => {
            match service.remove_transaction(&address, &hash).await {
                Ok(removed) => {
                    debug!(count = removed.len(), "fire-and-forget removal done");
                    Ok(())
                }
                Err(PoolError::Storage(fault @ StoreError::Corrupt(_))) => Err(fault),
                Err(error) => {
                    debug!(%error, "fire-and-forget removal failed");
                    Ok(())
                }
            }
        }
        PoolCommand::Commit { senders, consumed_gas, respond } => {
            let result = service.commit(&senders, consumed_gas).await;
            let fatal = fatal_storage_fault(&result);
            if respond.send(result).is_err() {
                debug!("commit caller went away");
            }
            fatal
        }
        PoolCommand::ReAddTransactions { respond } => {
            let result = service.re_add_transactions().await;
            let fatal = fatal_storage_fault(&result);
            if respond.send(result).is_err() {
                debug!("re-add caller went away");
            }
            fatal
        }
        PoolCommand::GetCandidates { respond } => {
            let candidates = collator.block_candidates(service).await;
            let serialized = candidates.iter().map(Transaction::to_bytes).collect();
            if respond.send(Ok(serialized)).is_err() {
                debug!("candidates caller went away");
            }
            Ok(())
        }
        PoolCommand::Flush { respond } => {
            let result = service.flush().await;
            let fatal = fatal_storage_fault(&result);
            if respond.send(result).is_err() {
                debug!("flush caller went away");
            }
            fatal
        }
        PoolCommand::GetPoolSize { respond } => {
            let size = service.pool_size().await;
            if respond.send(size).is_err() {
                debug!("pool-size caller went away");
            }
            Ok(())
        }
    }
}

/// Pick out the one error class that kills the worker instead of merely
/// answering a request: a corrupt durable record.
fn fatal_storage_fault<T>(result: &Result<T, PoolError>) -> Result<(), StoreError> {
    match result {
        Err(PoolError::Storage(StoreError::Corrupt(detail))) => {
            Err(StoreError::Corrupt(detail.clone()))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::collator::CollatorConfig;
    use crate::pool::policy::GasPricePolicy;
    use crate::pool::storage::PoolStore;
    use crate::pool::PoolConfig;
    use crate::crypto::keys::OrbitKeypair;
    use crate::state::{AccountState, StateLedger};
    use crate::transaction::{sign_transaction, TransactionBuilder};
    use std::sync::Arc;

    fn spawn_fixture() -> (PoolHandle, PoolWorkerHandle, Arc<StateLedger>, OrbitKeypair) {
        let ledger = Arc::new(StateLedger::new());
        let keypair = OrbitKeypair::from_seed(&[11u8; 32]);
        ledger.set_account(&keypair.address(), AccountState::with_balance(u64::MAX / 2));

        let service = Service::new(
            PoolConfig::default(),
            Arc::new(GasPricePolicy),
            Arc::clone(&ledger) as _,
            PoolStore::open_temporary().unwrap(),
        );
        let collator = Collator::new(CollatorConfig::default());
        let (handle, worker) = spawn_pool_worker(service, collator);
        (handle, worker, ledger, keypair)
    }

    fn signed(kp: &OrbitKeypair, nonce: u64, gas_price: u64) -> Vec<u8> {
        let receiver = OrbitKeypair::from_seed(&[0xEE; 32]).address();
        let tx = TransactionBuilder::new()
            .sender(&kp.address())
            .receiver(&receiver)
            .value(100)
            .gas_price(gas_price)
            .gas_limit(21_000)
            .nonce(nonce)
            .timestamp(1_700_000_000_000 + nonce)
            .build();
        sign_transaction(tx, kp).unwrap().to_bytes()
    }

    #[tokio::test]
    async fn add_and_query_through_the_boundary() {
        let (handle, worker, _ledger, kp) = spawn_fixture();

        let outcome = handle.add_transaction(signed(&kp, 0, 10)).await.unwrap();
        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(handle.pool_size().await.unwrap(), 1);

        let candidates = handle.candidates().await.unwrap();
        assert_eq!(candidates.len(), 1);
        let decoded = Transaction::from_bytes(&candidates[0]).unwrap();
        assert_eq!(decoded.sender, kp.address());

        worker.stop().await;
    }

    #[tokio::test]
    async fn garbage_bytes_fail_validation_not_the_worker() {
        let (handle, worker, _ledger, kp) = spawn_fixture();

        let result = handle.add_transaction(vec![0xDE, 0xAD, 0xBE, 0xEF]).await;
        assert!(matches!(result, Err(WorkerError::Pool(PoolError::Validation { .. }))));

        // The worker survived and keeps serving.
        handle.add_transaction(signed(&kp, 0, 10)).await.unwrap();
        assert_eq!(handle.pool_size().await.unwrap(), 1);

        worker.stop().await;
    }

    #[tokio::test]
    async fn fire_and_forget_removal() {
        let (handle, worker, _ledger, kp) = spawn_fixture();

        let bytes = signed(&kp, 0, 10);
        let tx = Transaction::from_bytes(&bytes).unwrap();
        handle.add_transaction(bytes).await.unwrap();

        handle.remove_transaction(&kp.address(), &tx.hash).await.unwrap();

        // The command is asynchronous; the next request observes its effect
        // because the mailbox is a FIFO served by one consumer.
        assert_eq!(handle.pool_size().await.unwrap(), 0);

        worker.stop().await;
    }

    #[tokio::test]
    async fn commit_through_the_boundary() {
        let (handle, worker, ledger, kp) = spawn_fixture();

        handle.add_transaction(signed(&kp, 0, 10)).await.unwrap();
        handle.add_transaction(signed(&kp, 1, 10)).await.unwrap();

        ledger.set_account(
            &kp.address(),
            AccountState {
                nonce: 1,
                balance: u64::MAX / 2,
            },
        );
        ledger.advance_block();
        handle.commit(vec![kp.address()], 21_000).await.unwrap();

        assert_eq!(handle.pool_size().await.unwrap(), 1);

        worker.stop().await;
    }

    #[tokio::test]
    async fn stopped_worker_reports_unavailable() {
        let (handle, worker, _ledger, kp) = spawn_fixture();
        worker.stop().await;

        let result = handle.add_transaction(signed(&kp, 0, 10)).await;
        assert!(matches!(result, Err(WorkerError::Unavailable)));
        assert!(matches!(handle.pool_size().await, Err(WorkerError::Unavailable)));
    }

    #[tokio::test]
    async fn flush_through_the_boundary() {
        let (handle, worker, _ledger, kp) = spawn_fixture();

        handle.add_transaction(signed(&kp, 0, 10)).await.unwrap();
        handle.flush().await.unwrap();
        assert_eq!(handle.pool_size().await.unwrap(), 0);

        worker.stop().await;
    }

    #[tokio::test]
    async fn re_add_reports_through_the_boundary() {
        let (handle, worker, ledger, kp) = spawn_fixture();

        handle.add_transaction(signed(&kp, 0, 10)).await.unwrap();
        handle.add_transaction(signed(&kp, 1, 10)).await.unwrap();

        // A reorg settled on a branch that already consumed nonce 0.
        ledger.set_account(
            &kp.address(),
            AccountState {
                nonce: 1,
                balance: u64::MAX / 2,
            },
        );

        let report = handle.re_add_transactions().await.unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(report.failures.len(), 1);

        worker.stop().await;
    }
}
