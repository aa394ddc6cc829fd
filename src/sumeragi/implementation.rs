/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the Sumeragi round state machine.
//!
//! Main type: [`Sumeragi`].

use std::{
    collections::VecDeque,
    sync::{mpsc::Sender, Arc},
    time::{Duration, SystemTime},
};

use ed25519_dalek::VerifyingKey;

use crate::{
    block_assembler::{AssembleError, BlockAssembler},
    block_sync::{client::BlockSyncClient, messages::BlockSyncResponse},
    clock::Clock,
    config::Configuration,
    events::{
        CommitBlockEvent, EndSyncEvent, Event, ExpandWindowEvent, NodeInactiveEvent, ProposeEvent,
        ReceiveCommitEvent, ReceiveSignatureEvent, SignBlockEvent, StartSyncEvent, StopRoundEvent,
    },
    ledger::{CommitError, CommitSink},
    networking::{network::Network, sending::RingBroadcaster},
    peers::{PeerDirectory, PeerState},
    transaction_pool::{SubmitRejection, TransactionPool},
    types::{
        block::Block,
        crypto_primitives::{Keypair, Signature},
        data_types::{BlockHeight, CryptoHash},
        transaction::Transaction,
    },
};

use super::{
    collector::supermajority_threshold,
    messages::{Abandon, ConsensusMessage, Vote},
    roles::{is_proposer, ProposerPolicy},
    types::{Classification, NodeStatus, Phase, Round, RoundOutcome, StopReason},
};

// Number of finished rounds whose late signatures are still recognized as stale.
const FINISHED_ROUNDS_MEMORY: usize = 64;

/// A single participant in Sumeragi, acting as proposer for the heights its [`ProposerPolicy`]
/// assigns to it and as validator for every other height.
///
/// # Usage
///
/// `Sumeragi` never blocks and never reads the time except through its [`Clock`]. It is driven by
/// calling its event handlers:
/// 1. [`propose`](Self::propose): called whenever the node may start a new round.
/// 2. [`on_receive_msg`](Self::on_receive_msg): called when a new [`ConsensusMessage`] is received.
/// 3. [`on_receive_sync_response`](Self::on_receive_sync_response): called when a
///    [`BlockSyncResponse`] is received.
/// 4. [`on_tick`](Self::on_tick): called periodically, to act on round deadlines and sync timeouts.
///
/// The [algorithm](crate::algorithm) thread calls these in a loop, but they can just as well be
/// called directly, which is how round behaviour is tested without real delays.
///
/// # Round lifecycle
///
/// A round is created in [`Phase::Proposed`] when a batch of transactions is available and this node
/// is the proposer for the next height. The proposer signs its own candidate, circulates it to the
/// initial validating window and arms the round deadline (`Circulating`), then collects votes
/// (`Collecting`). The round commits the moment its in-window signatures reach a supermajority. Each
/// missed deadline expands the window (`Expanding`) and arms a fresh deadline. A deadline missed while
/// the window already covers the whole ring stops the round.
pub struct Sumeragi<N: Network, S: CommitSink> {
    config: SumeragiConfiguration,
    me: VerifyingKey,
    broadcaster: RingBroadcaster<N>,
    peers: PeerDirectory,
    pool: TransactionPool,
    commit_sink: S,
    clock: Arc<dyn Clock>,
    policy: Box<dyn ProposerPolicy>,
    assembler: BlockAssembler,
    round: Option<Round>,
    last_outcome: Option<RoundOutcome>,
    finished: VecDeque<FinishedRound>,
    vote_lock: Option<VoteLock>,
    status: NodeStatus,
    sync: BlockSyncClient,
    event_publisher: Option<Sender<Event>>,
}

impl<N: Network, S: CommitSink> Sumeragi<N, S> {
    /// Create a new Sumeragi participant.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &Configuration,
        network: N,
        peers: PeerDirectory,
        pool: TransactionPool,
        commit_sink: S,
        clock: Arc<dyn Clock>,
        policy: Box<dyn ProposerPolicy>,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        let config = SumeragiConfiguration::from(config);
        let me = config.keypair.public();
        let broadcaster = RingBroadcaster::new(network, me, config.send_timeout);
        let assembler = BlockAssembler::new(config.allow_empty_blocks);
        let sync = BlockSyncClient::new(config.sync_request_limit, config.round_timeout);
        Self {
            config,
            me,
            broadcaster,
            peers,
            pool,
            commit_sink,
            clock,
            policy,
            assembler,
            round: None,
            last_outcome: None,
            finished: VecDeque::new(),
            vote_lock: None,
            status: NodeStatus::Active,
            sync,
            event_publisher,
        }
    }

    /// The round this node is currently proposing, if any.
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// The verdict of the most recent round this node proposed.
    pub fn last_outcome(&self) -> Option<&RoundOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    /// Start a new round if this node is responsible for proposing the next block and has transactions
    /// to put in it. Returns the hash of the new candidate block, or `None` if no round was started.
    ///
    /// If the round reaches a supermajority right away (for example, because this node is the only
    /// Active peer) it is committed before this method returns.
    pub fn propose(&mut self) -> Result<Option<CryptoHash>, SumeragiError> {
        // 1. Check whether this node may start a round at all.
        if self.round.is_some() || self.status == NodeStatus::Inactive || self.sync.is_syncing() {
            return Ok(None);
        }

        let snapshot = self.peers.snapshot();
        let height = self.commit_sink.next_height();
        if !is_proposer(self.policy.as_ref(), &self.me, height, &snapshot) {
            return Ok(None);
        }
        if self.pool.pending_count() == 0 {
            return Ok(None);
        }
        let Some(ring) = snapshot.ring_from(&self.me) else {
            return Ok(None);
        };

        // 2. Assemble the candidate block.
        let batch = self.pool.take_batch(self.config.max_block_transactions);
        let previous = self.commit_sink.last_block();
        let candidate = match self
            .assembler
            .assemble(batch, previous.as_ref(), self.clock.timestamp())
        {
            Ok(candidate) => candidate,
            Err(AssembleError::EmptyBatch) => return Ok(None),
        };
        let hash = candidate.hash;
        let transactions = candidate.transactions.len();

        let mut round = Round::new(
            candidate,
            snapshot.version(),
            ring,
            snapshot.max_faulty(),
            self.clock.now(),
        );

        // 3. Sign the candidate. The proposer's own signature counts toward the supermajority.
        let own_signature = self.config.keypair.sign(&hash);
        round.collector.accumulate(&own_signature, &snapshot);

        // 4. Circulate the candidate to the initial validating window and arm the deadline.
        round.phase = Phase::Circulating;
        self.broadcaster.multicast_range(
            &round.ring,
            round.window.start,
            round.window.end,
            ConsensusMessage::circulate(round.candidate.clone()),
        );
        round.deadline = self.clock.now() + self.config.round_timeout;
        round.phase = Phase::Collecting;

        Event::Propose(ProposeEvent {
            timestamp: SystemTime::now(),
            block: hash,
            height,
            transactions,
            window_end: round.window.end,
        })
        .publish(&self.event_publisher);

        self.round = Some(round);

        // 5. Commit at once if the proposer's own signature is already a supermajority.
        self.try_commit()?;

        Ok(Some(hash))
    }

    /// Process a newly received consensus message from `origin`.
    pub fn on_receive_msg(
        &mut self,
        origin: VerifyingKey,
        msg: ConsensusMessage,
    ) -> Result<(), SumeragiError> {
        match msg {
            ConsensusMessage::Circulate(circulate) => {
                self.on_receive_circulate(origin, circulate.block);
                Ok(())
            }
            ConsensusMessage::Vote(vote) => self.on_receive_vote(origin, vote).map(|_| ()),
            ConsensusMessage::Commit(commit) => self.on_receive_commit(origin, commit.block),
            ConsensusMessage::Abandon(abandon) => {
                self.on_receive_abandon(origin, abandon);
                Ok(())
            }
            ConsensusMessage::Forward(forward) => {
                self.on_receive_forward(origin, forward.transactions);
                Ok(())
            }
        }
    }

    /// Process a vote for one of this node's candidate blocks, returning how its signature was
    /// classified.
    ///
    /// Votes for the running round are handed to its collector, which checks the signer against the
    /// peer directory as it is now. Correctly signed votes from a member of a round that has already
    /// committed or stopped are [`Stale`](Classification::Stale) and change nothing. Any other vote is
    /// [`Invalid`](Classification::Invalid).
    pub fn on_receive_vote(
        &mut self,
        origin: VerifyingKey,
        vote: Vote,
    ) -> Result<Classification, SumeragiError> {
        let current = self.peers.snapshot();
        let classification = if let Some(round) = self
            .round
            .as_mut()
            .filter(|round| round.collector.block() == vote.block)
        {
            round.collector.accumulate(&vote.signature, &current)
        } else if self.is_stale(&vote) {
            Classification::Stale
        } else {
            Classification::Invalid
        };

        Event::ReceiveSignature(ReceiveSignatureEvent {
            timestamp: SystemTime::now(),
            origin,
            block: vote.block,
            classification,
        })
        .publish(&self.event_publisher);

        if classification == Classification::Accepted {
            self.try_commit()?;
        }

        Ok(classification)
    }

    /// Act on the passage of time: retry block sync if the sync peer went quiet, and expand or stop the
    /// running round if its deadline has passed.
    pub fn on_tick(&mut self) -> Result<(), SumeragiError> {
        let now = self.clock.now();

        // 0. Hand transactions accepted here to the proposer for the next height.
        self.forward_pending();

        // 1. Retry block sync with another peer if the current one has not responded in time.
        if self.sync.timed_out(now) {
            if let Some(peer) = self.sync.abandon(false) {
                log::debug!("Block sync with {} timed out", short_key(&peer));
            }
            self.start_sync(None);
        } else if self.status == NodeStatus::Inactive && !self.sync.is_syncing() {
            self.start_sync(None);
        }

        // 2. Check the round deadline.
        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        if now < round.deadline {
            return Ok(());
        }
        let current_version = self.peers.snapshot().version();
        if current_version != round.snapshot_version {
            log::debug!(
                "Peer directory changed from version {} to {} during round {}, keeping its ring",
                round.snapshot_version,
                current_version,
                round.candidate.hash
            );
        }

        // 3. The window already covers every Active peer. The round is lost.
        if round.window.end >= round.ring.len() {
            self.stop_round(StopReason::WindowExhausted);
            return Err(SumeragiError::Recoverable(StopReason::WindowExhausted));
        }

        // 4. Otherwise widen the window, circulate the candidate to the peers it now includes, and arm a
        //    fresh deadline.
        round.phase = Phase::Expanding;
        let old_end = round.window.end;
        round.window.end = (old_end + self.config.window_expansion_increment).min(round.ring.len());
        self.broadcaster.multicast_range(
            &round.ring,
            old_end,
            round.window.end,
            ConsensusMessage::circulate(round.candidate.clone()),
        );
        round.deadline = self.clock.now() + self.config.round_timeout;
        round.phase = Phase::Collecting;

        Event::ExpandWindow(ExpandWindowEvent {
            timestamp: SystemTime::now(),
            block: round.candidate.hash,
            window_end: round.window.end,
            ring_len: round.ring.len(),
        })
        .publish(&self.event_publisher);

        // 5. Signatures held from outside the old window may now complete a supermajority.
        self.try_commit()
    }

    /// Process the blocks a sync peer sent in response to this node's request.
    ///
    /// Each block is checked the way a [`Commit`](ConsensusMessage::Commit) is. A peer that serves a
    /// block that does not check out is blacklisted and sync restarts with another peer. Once a response
    /// comes back with fewer blocks than requested, this node has caught up and, if it had left
    /// consensus, becomes Active again.
    pub fn on_receive_sync_response(
        &mut self,
        origin: VerifyingKey,
        response: BlockSyncResponse,
    ) -> Result<(), SumeragiError> {
        if !self.sync.is_expecting(&origin) {
            return Ok(());
        }

        let received = response.blocks.len();
        for block in response.blocks {
            let next_height = self.commit_sink.next_height();
            if block.height < next_height {
                continue;
            }
            if block.height > next_height || !self.is_finalized(&block) {
                log::warn!(
                    "Sync peer {} served an unacceptable block at height {}",
                    short_key(&origin),
                    block.height
                );
                self.sync.abandon(true);
                self.start_sync(None);
                return Ok(());
            }
            if let Err(err) = self.append_finalized(&block) {
                self.sync.abandon(false);
                return Err(err);
            }
            self.sync.record_block();
        }

        if received as u64 >= self.sync.request_limit() as u64 {
            let request = self
                .sync
                .next_request(self.commit_sink.next_height(), self.clock.now());
            self.broadcaster.unicast(origin, request);
            return Ok(());
        }

        if let Some((peer, blocks_synced)) = self.sync.finish() {
            Event::EndSync(EndSyncEvent {
                timestamp: SystemTime::now(),
                peer,
                blocks_synced,
            })
            .publish(&self.event_publisher);
        }
        if self.status == NodeStatus::Inactive {
            self.become_active();
        }

        Ok(())
    }

    /// Validate a candidate block from its proposer and, if it checks out, sign it and send the vote
    /// back.
    fn on_receive_circulate(&mut self, origin: VerifyingKey, block: Block) {
        if self.status == NodeStatus::Inactive || origin == self.me {
            return;
        }

        // 1. Only the designated proposer for the height may circulate a candidate.
        let snapshot = self.peers.snapshot();
        if !is_proposer(self.policy.as_ref(), &origin, block.height, &snapshot) {
            log::debug!(
                "Ignoring candidate at height {} from {}, which is not its proposer",
                block.height,
                short_key(&origin)
            );
            return;
        }

        // 2. The candidate must extend this node's tip. A candidate further ahead means this node is
        //    lagging.
        let next_height = self.commit_sink.next_height();
        if block.height != next_height {
            if block.height > next_height {
                self.start_sync(Some(origin));
            }
            return;
        }
        let expected_previous = self
            .commit_sink
            .last_block()
            .map(|previous| previous.hash)
            .unwrap_or_else(CryptoHash::zero);
        if block.previous_hash != expected_previous || !block.is_correct() {
            log::warn!(
                "Rejecting malformed candidate {} from {}",
                block.hash,
                short_key(&origin)
            );
            return;
        }
        if block.transactions.is_empty() && !self.config.allow_empty_blocks {
            return;
        }
        if !block
            .transactions
            .iter()
            .all(|transaction| transaction.has_valid_signatures())
        {
            log::warn!(
                "Rejecting candidate {} carrying an invalid transaction",
                block.hash
            );
            return;
        }

        // 3. Sign at most one candidate per height.
        if let Some(lock) = &self.vote_lock {
            if lock.height == block.height && lock.block != block.hash {
                return;
            }
        }
        self.vote_lock = Some(VoteLock {
            height: block.height,
            block: block.hash,
            proposer: origin,
        });

        self.broadcaster
            .unicast(origin, ConsensusMessage::vote(&self.config.keypair, &block));

        Event::SignBlock(SignBlockEvent {
            timestamp: SystemTime::now(),
            proposer: origin,
            block: block.hash,
            height: block.height,
        })
        .publish(&self.event_publisher);
    }

    /// Append a finalized block from another proposer, if it is the next block and carries a
    /// supermajority of valid signatures.
    fn on_receive_commit(&mut self, origin: VerifyingKey, block: Block) -> Result<(), SumeragiError> {
        Event::ReceiveCommit(ReceiveCommitEvent {
            timestamp: SystemTime::now(),
            origin,
            block: block.hash,
            height: block.height,
        })
        .publish(&self.event_publisher);

        let next_height = self.commit_sink.next_height();
        if block.height < next_height {
            return Ok(());
        }
        if block.height > next_height {
            self.start_sync(Some(origin));
            return Ok(());
        }
        if !self.is_finalized(&block) {
            log::warn!(
                "Ignoring commit of {} from {} without a valid supermajority",
                block.hash,
                short_key(&origin)
            );
            return Ok(());
        }

        self.append_finalized(&block)
    }

    fn on_receive_abandon(&mut self, origin: VerifyingKey, abandon: Abandon) {
        let releases = self.vote_lock.as_ref().is_some_and(|lock| {
            lock.height == abandon.height && lock.block == abandon.block && lock.proposer == origin
        });
        if releases {
            self.vote_lock = None;
        }
    }

    /// Take in transactions another peer accepted. Ones this node already holds are dropped quietly.
    fn on_receive_forward(&mut self, origin: VerifyingKey, transactions: Vec<Transaction>) {
        for transaction in transactions {
            let hash = transaction.hash();
            match self.pool.submit(transaction) {
                Ok(()) | Err(SubmitRejection::Duplicate) => (),
                Err(rejection) => log::debug!(
                    "Dropping transaction {} forwarded by {}: {:?}",
                    hash,
                    short_key(&origin),
                    rejection
                ),
            }
        }
    }

    /// Forward pending transactions to the proposer for the next height, unless that is this node.
    ///
    /// Without this, a transaction submitted to any peer other than the proposer would never be put in a
    /// block.
    fn forward_pending(&mut self) {
        if self.status == NodeStatus::Inactive || self.sync.is_syncing() {
            return;
        }
        let snapshot = self.peers.snapshot();
        let height = self.commit_sink.next_height();
        let Some(proposer) = self.policy.proposer(height, &snapshot) else {
            return;
        };
        if proposer == self.me {
            return;
        }
        let transactions = self
            .pool
            .take_unforwarded(&proposer, self.config.max_block_transactions);
        if transactions.is_empty() {
            return;
        }
        log::debug!(
            "Forwarding {} transactions to {}, the proposer at height {}",
            transactions.len(),
            short_key(&proposer),
            height
        );
        self.broadcaster
            .unicast(proposer, ConsensusMessage::forward(transactions));
    }

    fn try_commit(&mut self) -> Result<(), SumeragiError> {
        let ready = self
            .round
            .as_ref()
            .is_some_and(|round| round.phase == Phase::Collecting && round.has_supermajority());
        if ready {
            self.commit()
        } else {
            Ok(())
        }
    }

    /// Commit the running round: append the block to the commit sink, then disseminate it to every
    /// Active peer, then return to `Idle`.
    fn commit(&mut self) -> Result<(), SumeragiError> {
        let Some(round) = self.round.as_ref() else {
            return Ok(());
        };
        let signatures = round.collector.signatures_within(&round.window);
        let finalized = round.candidate.with_signatures(signatures.clone());
        let ring = round.ring.clone();
        let current_version = self.peers.snapshot().version();
        if current_version != round.snapshot_version {
            log::debug!(
                "Committing {} with the ring of peer directory version {}, now at version {}",
                finalized.hash,
                round.snapshot_version,
                current_version
            );
        }

        // 1. Append.
        if let Err(err) = self.commit_sink.append_block(&finalized, &signatures) {
            let reason = StopReason::CommitRejected(err.to_string());
            log::error!("Failed to commit block {}: {}", finalized.hash, err);
            self.stop_round(reason.clone());
            if err.is_fatal() {
                self.enter_inactive(err.to_string());
                return Err(SumeragiError::Fatal(err));
            }
            return Err(SumeragiError::Recoverable(reason));
        }
        self.pool.settle(&finalized);
        self.release_vote_lock(finalized.height);

        Event::CommitBlock(CommitBlockEvent {
            timestamp: SystemTime::now(),
            block: finalized.hash,
            height: finalized.height,
            signatures: signatures.len(),
        })
        .publish(&self.event_publisher);

        // 2. Disseminate.
        let active: Vec<VerifyingKey> = self
            .peers
            .snapshot()
            .active_peers()
            .iter()
            .map(|peer| peer.identity)
            .collect();
        let hash = finalized.hash;
        let height = finalized.height;
        self.broadcaster
            .multicast_all(&active, ConsensusMessage::commit(finalized));

        // 3. Back to Idle.
        self.round = None;
        self.finish(hash, height, ring, Phase::Committed, signatures);

        Ok(())
    }

    /// Discard the running round without committing it, release the validators that signed it, and
    /// hand its transactions back to the pool as a failed batch.
    fn stop_round(&mut self, reason: StopReason) {
        let Some(mut round) = self.round.take() else {
            return;
        };
        round.phase = Phase::Stopped;
        let hash = round.candidate.hash;
        let height = round.candidate.height;

        self.broadcaster.multicast_range(
            &round.ring,
            round.window.start,
            round.window.end,
            ConsensusMessage::abandon(hash, height),
        );
        self.pool
            .report_failure(hash, height, round.candidate.transactions, reason.clone());

        Event::StopRound(StopRoundEvent {
            timestamp: SystemTime::now(),
            block: hash,
            height,
            reason,
        })
        .publish(&self.event_publisher);

        self.finish(hash, height, round.ring, Phase::Stopped, Vec::new());
    }

    fn finish(
        &mut self,
        block: CryptoHash,
        height: BlockHeight,
        ring: Vec<VerifyingKey>,
        phase: Phase,
        signatures: Vec<Signature>,
    ) {
        self.last_outcome = Some(RoundOutcome {
            block,
            height,
            phase,
            signatures,
        });
        self.finished.push_back(FinishedRound { block, ring });
        if self.finished.len() > FINISHED_ROUNDS_MEMORY {
            self.finished.pop_front();
        }
    }

    /// Whether `vote` is a correctly signed vote, from a member of its ring, for a round that is over.
    fn is_stale(&self, vote: &Vote) -> bool {
        let Some(signer) = vote.signature.signer_key() else {
            return false;
        };
        self.finished
            .iter()
            .any(|round| round.block == vote.block && round.ring.contains(&signer))
            && vote.signature.is_valid_for(&vote.block)
    }

    /// Whether `block` is a correct successor of this node's tip that carries signatures from a
    /// supermajority of the Active peers in this node's current snapshot.
    fn is_finalized(&self, block: &Block) -> bool {
        let expected_previous = self
            .commit_sink
            .last_block()
            .map(|previous| previous.hash)
            .unwrap_or_else(CryptoHash::zero);
        if block.previous_hash != expected_previous || !block.is_correct() {
            return false;
        }
        if !block
            .transactions
            .iter()
            .all(|transaction| transaction.has_valid_signatures())
        {
            return false;
        }
        let snapshot = self.peers.snapshot();
        block.count_valid_signatures(&snapshot) >= supermajority_threshold(snapshot.active_count())
    }

    /// Append a block that was finalized elsewhere. A round this node is running at the same or a lower
    /// height can no longer commit and is stopped.
    fn append_finalized(&mut self, block: &Block) -> Result<(), SumeragiError> {
        if let Err(err) = self.commit_sink.append_block(block, &block.signatures) {
            log::error!("Failed to append finalized block {}: {}", block.hash, err);
            if err.is_fatal() {
                self.enter_inactive(err.to_string());
                return Err(SumeragiError::Fatal(err));
            }
            return Err(SumeragiError::Recoverable(StopReason::CommitRejected(
                err.to_string(),
            )));
        }
        self.pool.settle(block);
        self.release_vote_lock(block.height);

        Event::CommitBlock(CommitBlockEvent {
            timestamp: SystemTime::now(),
            block: block.hash,
            height: block.height,
            signatures: block.signatures.len(),
        })
        .publish(&self.event_publisher);

        if self
            .round
            .as_ref()
            .is_some_and(|round| round.candidate.height <= block.height)
        {
            self.stop_round(StopReason::Superseded);
        }

        Ok(())
    }

    fn release_vote_lock(&mut self, committed_height: BlockHeight) {
        if self
            .vote_lock
            .as_ref()
            .is_some_and(|lock| lock.height <= committed_height)
        {
            self.vote_lock = None;
        }
    }

    /// Leave consensus: stop any running round, mark this node `Ready` in the peer directory, and
    /// resynchronize from a peer.
    fn enter_inactive(&mut self, reason: String) {
        log::error!("Leaving consensus: {}", reason);
        self.stop_round(StopReason::NodeInactive);
        self.status = NodeStatus::Inactive;
        if let Err(err) = self.peers.set_state(&self.me, PeerState::Ready) {
            log::warn!("Could not mark this node Ready: {:?}", err);
        }

        Event::NodeInactive(NodeInactiveEvent {
            timestamp: SystemTime::now(),
            reason,
        })
        .publish(&self.event_publisher);

        self.start_sync(None);
    }

    fn become_active(&mut self) {
        log::info!("Caught up, rejoining consensus");
        self.status = NodeStatus::Active;
        if let Err(err) = self.peers.set_state(&self.me, PeerState::Active) {
            log::warn!("Could not mark this node Active: {:?}", err);
        }
    }

    /// Start a sync attempt, preferring `hint` as the peer to sync from. Does nothing if an attempt is
    /// already running.
    fn start_sync(&mut self, hint: Option<VerifyingKey>) {
        if self.sync.is_syncing() {
            return;
        }
        let snapshot = self.peers.snapshot();
        let Some(peer) = self.sync.choose_peer(hint, &snapshot, &self.me) else {
            log::warn!("No peer available to sync from");
            return;
        };
        let start_height = self.commit_sink.next_height();
        let request = self.sync.begin(peer, start_height, self.clock.now());
        self.broadcaster.unicast(peer, request);

        Event::StartSync(StartSyncEvent {
            timestamp: SystemTime::now(),
            peer,
            start_height,
        })
        .publish(&self.event_publisher);
    }
}

// A round this node proposed that has committed or stopped.
struct FinishedRound {
    block: CryptoHash,
    ring: Vec<VerifyingKey>,
}

/// Records the single candidate a validator has signed at a height, and who proposed it.
struct VoteLock {
    height: BlockHeight,
    block: CryptoHash,
    proposer: VerifyingKey,
}

/// Immutable parameters that define the behaviour of [`Sumeragi`].
pub(crate) struct SumeragiConfiguration {
    /// The keypair with which candidate blocks are signed.
    pub(crate) keypair: Keypair,
    pub(crate) round_timeout: Duration,
    pub(crate) send_timeout: Duration,
    pub(crate) window_expansion_increment: usize,
    pub(crate) max_block_transactions: usize,
    pub(crate) allow_empty_blocks: bool,
    pub(crate) sync_request_limit: u32,
}

/// The different ways a call to a method of the `Sumeragi` struct can fail.
///
/// A `Recoverable` error loses at most the round at hand. A `Fatal` error means the local chain can no
/// longer be trusted: by the time it is returned, this node has already left consensus and started to
/// resynchronize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SumeragiError {
    Recoverable(StopReason),
    Fatal(CommitError),
}

impl SumeragiError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SumeragiError::Fatal(_))
    }
}

fn short_key(key: &VerifyingKey) -> String {
    crate::logging::first_seven_base64_chars(&key.to_bytes())
}
