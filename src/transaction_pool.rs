/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Intake of client transactions, and the source of batches for new rounds.
//!
//! A [`TransactionPool`] is a cheaply clonable handle: the [node](crate::node::Node) submits into it
//! from the caller's thread, while the consensus core takes batches from it and reports back on the
//! thread that runs rounds.
//!
//! Every transaction the pool has seen is in exactly one of these places:
//! 1. `pending`: accepted, waiting to be taken into a batch. A pending transaction may also have been
//!    [forwarded](TransactionPool::take_unforwarded) to the proposer for the next height, in which case
//!    it stays pending here until a block carrying it is committed.
//! 2. `in_flight`: part of the candidate block of a running round.
//! 3. `committed`: part of a committed block. Remembered until its timestamp falls out of the acceptance
//!    window, after which a replay would be rejected as stale anyway.
//! 4. `failed`: part of a round that stopped without committing. Failed transactions are not proposed
//!    again automatically; the caller decides what to do with them.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{mpsc::Sender, Arc, Mutex, MutexGuard},
    time::{Duration, SystemTime},
};

use ed25519_dalek::VerifyingKey;

use crate::{
    clock::Clock,
    events::{Event, SubmitTransactionEvent},
    sumeragi::types::StopReason,
    types::{
        block::Block,
        data_types::{BlockHeight, CryptoHash, Timestamp},
        transaction::Transaction,
    },
};

/// Limits that decide which transactions the pool accepts.
#[derive(Clone, Copy, Debug)]
pub struct TransactionPoolConfiguration {
    /// How far in the past a transaction's `created_at` may be.
    pub acceptance_window: Duration,
    /// How far in the future a transaction's `created_at` may be.
    pub future_tolerance: Duration,
    /// Maximum number of pending transactions.
    pub capacity: usize,
}

#[derive(Clone)]
pub struct TransactionPool {
    state: Arc<Mutex<PoolState>>,
    config: TransactionPoolConfiguration,
    clock: Arc<dyn Clock>,
    event_publisher: Option<Sender<Event>>,
}

#[derive(Default)]
struct PoolState {
    pending: VecDeque<Transaction>,
    pending_hashes: HashSet<CryptoHash>,
    in_flight: HashSet<CryptoHash>,
    forwarded_to: HashMap<CryptoHash, VerifyingKey>,
    committed: HashMap<CryptoHash, Timestamp>,
    failed: Vec<FailedBatch>,
}

/// The transactions of a round that stopped without committing.
#[derive(Clone, Debug)]
pub struct FailedBatch {
    pub block: CryptoHash,
    pub height: BlockHeight,
    pub transactions: Vec<Transaction>,
    pub reason: StopReason,
}

impl TransactionPool {
    pub fn new(config: TransactionPoolConfiguration, clock: Arc<dyn Clock>) -> TransactionPool {
        TransactionPool {
            state: Arc::new(Mutex::new(PoolState::default())),
            config,
            clock,
            event_publisher: None,
        }
    }

    pub(crate) fn with_event_publisher(mut self, event_publisher: Option<Sender<Event>>) -> Self {
        self.event_publisher = event_publisher;
        self
    }

    pub fn submit(&self, transaction: Transaction) -> Result<(), SubmitRejection> {
        let hash = transaction.hash();
        let result = self.check_and_insert(hash, transaction);

        Event::SubmitTransaction(SubmitTransactionEvent {
            timestamp: SystemTime::now(),
            transaction: hash,
            rejection: result.as_ref().err().copied(),
        })
        .publish(&self.event_publisher);

        result
    }

    fn check_and_insert(&self, hash: CryptoHash, transaction: Transaction) -> Result<(), SubmitRejection> {
        if !transaction.has_valid_signatures() {
            return Err(SubmitRejection::InvalidSignature);
        }

        let now = self.clock.timestamp();
        if transaction.created_at < now.saturating_sub(self.config.acceptance_window) {
            return Err(SubmitRejection::StaleTimestamp);
        }
        if transaction.created_at > now.saturating_add(self.config.future_tolerance) {
            return Err(SubmitRejection::FutureTimestamp);
        }

        let mut state = self.lock();
        state.forget_committed_before(now.saturating_sub(self.config.acceptance_window));
        if state.pending_hashes.contains(&hash)
            || state.in_flight.contains(&hash)
            || state.committed.contains_key(&hash)
        {
            return Err(SubmitRejection::Duplicate);
        }
        if state.pending.len() >= self.config.capacity {
            return Err(SubmitRejection::PoolFull);
        }

        state.pending_hashes.insert(hash);
        state.pending.push_back(transaction);
        Ok(())
    }

    /// Remove up to `max` pending transactions, oldest first, and mark them as in flight.
    pub fn take_batch(&self, max: usize) -> Vec<Transaction> {
        let mut state = self.lock();
        let count = max.min(state.pending.len());
        let batch: Vec<Transaction> = state.pending.drain(..count).collect();
        for transaction in &batch {
            let hash = transaction.hash();
            state.pending_hashes.remove(&hash);
            state.forwarded_to.remove(&hash);
            state.in_flight.insert(hash);
        }
        batch
    }

    /// Copies of up to `max` pending transactions, oldest first, that have not yet been forwarded to
    /// `proposer`. They are recorded as forwarded to it, and stay pending.
    ///
    /// A transaction is forwarded again only once the proposer changes.
    pub fn take_unforwarded(&self, proposer: &VerifyingKey, max: usize) -> Vec<Transaction> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut batch = Vec::new();
        for transaction in &state.pending {
            if batch.len() == max {
                break;
            }
            let hash = transaction.hash();
            if state.forwarded_to.get(&hash) == Some(proposer) {
                continue;
            }
            state.forwarded_to.insert(hash, *proposer);
            batch.push(transaction.clone());
        }
        batch
    }

    /// Record that `block` was committed, wherever it was proposed. Its transactions leave the pending
    /// queue and the in-flight set.
    pub fn settle(&self, block: &Block) {
        let mut state = self.lock();
        let mut hashes = HashSet::with_capacity(block.transactions.len());
        for transaction in &block.transactions {
            let hash = transaction.hash();
            state.in_flight.remove(&hash);
            state.pending_hashes.remove(&hash);
            state.forwarded_to.remove(&hash);
            state.committed.insert(hash, transaction.created_at);
            hashes.insert(hash);
        }
        state
            .pending
            .retain(|transaction| !hashes.contains(&transaction.hash()));
    }

    /// Report that the round carrying `transactions` in `block` stopped without committing.
    ///
    /// Transactions that have meanwhile been committed in another proposer's block are left out of the
    /// failed batch.
    pub fn report_failure(
        &self,
        block: CryptoHash,
        height: BlockHeight,
        mut transactions: Vec<Transaction>,
        reason: StopReason,
    ) {
        let mut state = self.lock();
        for transaction in &transactions {
            state.in_flight.remove(&transaction.hash());
        }
        transactions.retain(|transaction| !state.committed.contains_key(&transaction.hash()));
        state.failed.push(FailedBatch {
            block,
            height,
            transactions,
            reason,
        });
    }

    /// Drain the batches reported through [`report_failure`](Self::report_failure).
    pub fn take_failed(&self) -> Vec<FailedBatch> {
        std::mem::take(&mut self.lock().failed)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PoolState {
    fn forget_committed_before(&mut self, oldest_acceptable: Timestamp) {
        self.committed
            .retain(|_, created_at| *created_at >= oldest_acceptable);
    }
}

/// Why a transaction was refused by [`TransactionPool::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// The transaction has no signatures, or one of them does not verify.
    InvalidSignature,
    /// `created_at` is older than the acceptance window.
    StaleTimestamp,
    /// `created_at` is further in the future than the tolerated clock skew.
    FutureTimestamp,
    Duplicate,
    PoolFull,
}
