use std::{
    sync::{
        mpsc::{self, Receiver},
        Arc, Mutex,
    },
    time::Duration,
};

use ed25519_dalek::{SigningKey, VerifyingKey};
use sumeragi::{
    block_sync::messages::{BlockSyncMessage, BlockSyncResponse},
    clock::ManualClock,
    config::Configuration,
    events::Event,
    ledger::CommitSink,
    networking::messages::Message,
    peers::PeerDirectory,
    sumeragi::{roles::FixedLeader, Sumeragi, SumeragiError},
    transaction_pool::TransactionPool,
    types::{data_types::Timestamp, transaction::Transaction},
};

use super::{
    fixtures::{configuration, directory, sorted_keys, transaction},
    ledger::TestLedger,
    network::{Envelope, Outbox, RecordingNetwork},
};

pub(crate) const ROUND_TIMEOUT: Duration = Duration::from_millis(3000);

/// `n` Sumeragi participants driven by hand from a single thread.
///
/// Keys are sorted, so `keys[i]` is at index `i` of the ring, and `keys[0]` is the fixed leader that
/// proposes every block. Every participant has its own ledger, pool, and peer directory, and they all
/// share one manual clock. Nothing is delivered until the test asks for it.
pub(crate) struct Cluster {
    pub(crate) keys: Vec<SigningKey>,
    pub(crate) nodes: Vec<Sumeragi<RecordingNetwork, TestLedger>>,
    pub(crate) ledgers: Vec<TestLedger>,
    pub(crate) pools: Vec<TransactionPool>,
    pub(crate) directories: Vec<PeerDirectory>,
    pub(crate) events: Vec<Receiver<Event>>,
    pub(crate) clock: ManualClock,
    pub(crate) outbox: Outbox,
    pub(crate) client: SigningKey,
    nonce: u64,
}

impl Cluster {
    pub(crate) fn new(n: usize) -> Cluster {
        Cluster::with_configuration(n, |key| configuration(key, ROUND_TIMEOUT))
    }

    pub(crate) fn with_configuration(
        n: usize,
        make_configuration: impl Fn(&SigningKey) -> Configuration,
    ) -> Cluster {
        let keys = sorted_keys(n + 1);
        let (client, keys) = {
            let mut keys = keys;
            let client = keys.pop().unwrap();
            (client, keys)
        };
        let leader = keys[0].verifying_key();
        let clock = ManualClock::new(Timestamp::new(1_700_000_000_000));
        let outbox: Outbox = Arc::new(Mutex::new(Default::default()));

        let mut nodes = Vec::new();
        let mut ledgers = Vec::new();
        let mut pools = Vec::new();
        let mut directories = Vec::new();
        let mut events = Vec::new();
        for key in &keys {
            let config = make_configuration(key);
            let ledger = TestLedger::new();
            let peers = directory(&keys);
            let (event_publisher, event_subscriber) = mpsc::channel();
            let pool = TransactionPool::new((&config).into(), Arc::new(clock.clone()));
            nodes.push(Sumeragi::new(
                &config,
                RecordingNetwork::new(key.verifying_key(), Arc::clone(&outbox)),
                peers.clone(),
                pool.clone(),
                ledger.clone(),
                Arc::new(clock.clone()),
                Box::new(FixedLeader(leader)),
                Some(event_publisher),
            ));
            ledgers.push(ledger);
            pools.push(pool);
            directories.push(peers);
            events.push(event_subscriber);
        }

        Cluster {
            keys,
            nodes,
            ledgers,
            pools,
            directories,
            events,
            clock,
            outbox,
            client,
            nonce: 0,
        }
    }

    pub(crate) fn key(&self, index: usize) -> VerifyingKey {
        self.keys[index].verifying_key()
    }

    pub(crate) fn index_of(&self, key: &VerifyingKey) -> Option<usize> {
        self.keys.iter().position(|k| k.verifying_key() == *key)
    }

    /// Submit a fresh client transaction to the pool of node `index`.
    pub(crate) fn submit(&mut self, index: usize) -> Transaction {
        self.nonce += 1;
        let transaction = transaction(&self.client, &self.clock, self.nonce);
        self.pools[index].submit(transaction.clone()).unwrap();
        transaction
    }

    /// Remove and return every message sent so far.
    pub(crate) fn take_messages(&self) -> Vec<Envelope> {
        self.outbox.lock().unwrap().drain(..).collect()
    }

    /// Hand `envelope` to its recipient. Block sync requests are answered from the recipient's ledger.
    pub(crate) fn deliver(&mut self, envelope: Envelope) -> Result<(), SumeragiError> {
        let Some(to) = self.index_of(&envelope.to) else {
            return Ok(());
        };
        match envelope.message {
            Message::ConsensusMessage(msg) => self.nodes[to].on_receive_msg(envelope.from, msg),
            Message::BlockSyncMessage(BlockSyncMessage::BlockSyncRequest(request)) => {
                let blocks = self.ledgers[to].blocks_from(request.start_height, request.limit);
                self.outbox.lock().unwrap().push_back(Envelope {
                    from: envelope.to,
                    to: envelope.from,
                    message: BlockSyncResponse::new(blocks).into(),
                });
                Ok(())
            }
            Message::BlockSyncMessage(BlockSyncMessage::BlockSyncResponse(response)) => {
                self.nodes[to].on_receive_sync_response(envelope.from, response)
            }
        }
    }

    /// Deliver messages until none are left, returning the errors raised along the way.
    pub(crate) fn deliver_all(&mut self) -> Vec<SumeragiError> {
        self.deliver_all_where(|_| true)
    }

    /// Deliver the messages for which `keep` returns true, and drop the rest, until none are left.
    pub(crate) fn deliver_all_where(&mut self, keep: impl Fn(&Envelope) -> bool) -> Vec<SumeragiError> {
        let mut errors = Vec::new();
        loop {
            let next = self.outbox.lock().unwrap().pop_front();
            let Some(envelope) = next else {
                return errors;
            };
            if keep(&envelope) {
                if let Err(err) = self.deliver(envelope) {
                    errors.push(err);
                }
            }
        }
    }

    pub(crate) fn advance_past_deadline(&self) {
        self.clock.advance(ROUND_TIMEOUT + Duration::from_millis(1));
    }

    /// Drain the events published by node `index` so far.
    pub(crate) fn take_events(&self, index: usize) -> Vec<Event> {
        self.events[index].try_iter().collect()
    }
}
