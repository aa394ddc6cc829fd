/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run a node.
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the node](NodeSpec) with:
//!   1. `NodeSpec::builder` to construct a `NodeSpecBuilder`,
//!   2. The setters of the `NodeSpecBuilder`, and
//!   3. The `NodeSpecBuilder::build` method to construct a [NodeSpec],
//! - The function to [start](NodeSpec::start) a [Node] given its specification,
//! - [The type](Node) which keeps the node alive.
//!
//! ## Starting a node
//!
//! Here is an example that demonstrates how to build and start running a node using the builder
//! pattern:
//!
//! ```ignore
//! let node =
//!     NodeSpec::builder()
//!     .network(network)
//!     .commit_sink(ledger)
//!     .peer_directory(peer_directory)
//!     .configuration(configuration)
//!     .on_commit_block(commit_handler)
//!     .build()
//!     .start()?;
//!
//! node.submit(transaction)?;
//! ```
//!
//! ### Required setters
//!
//! The required setters are for providing the trait implementations and shared state required to run
//! a node:
//! - `.network(...)`
//! - `.commit_sink(...)`
//! - `.peer_directory(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! - `.proposer_policy(...)`: defaults to [`RoundRobin`].
//! - `.clock(...)`: defaults to [`SystemClock`].
//!
//! The remaining optional setters are for registering user-defined event handlers for events from
//! [crate::events]:
//! - `.on_commit_block(...)`
//! - `.on_propose(...)`
//! - `.on_sign_block(...)`
//! - `.on_receive_signature(...)`
//! - `.on_receive_commit(...)`
//! - `.on_expand_window(...)`
//! - `.on_stop_round(...)`
//! - `.on_submit_transaction(...)`
//! - `.on_node_inactive(...)`
//! - `.on_start_sync(...)`
//! - `.on_end_sync(...)`

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use ed25519_dalek::VerifyingKey;
use typed_builder::TypedBuilder;

use crate::algorithm::Algorithm;
use crate::block_sync::server::BlockSyncServer;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, Configuration};
use crate::event_bus::*;
use crate::events::*;
use crate::ledger::CommitSink;
use crate::networking::network::Network;
use crate::networking::receiving::{
    start_polling, BlockSyncClientStub, BlockSyncServerStub, ConsensusMessageStub,
};
use crate::networking::sending::RingBroadcaster;
use crate::peers::{PeerDirectory, PeerState};
use crate::sumeragi::roles::{ProposerPolicy, RoundRobin};
use crate::sumeragi::types::NodeStatus;
use crate::sumeragi::Sumeragi;
use crate::transaction_pool::{SubmitRejection, TransactionPool};
use crate::types::transaction::Transaction;

/// Stores all necessary parameters and trait implementations required to run the [Node].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [NodeSpec]. On the builder call the following methods to construct a valid [NodeSpec].

    Required:
    - `.network(...)`
    - `.commit_sink(...)`
    - `.peer_directory(...)`
    - `.configuration(...)`

    Optional:
    - `.proposer_policy(...)`
    - `.clock(...)`
    - `.on_commit_block(...)`
    - `.on_propose(...)`
    - `.on_sign_block(...)`
    - `.on_receive_signature(...)`
    - `.on_receive_commit(...)`
    - `.on_expand_window(...)`
    - `.on_stop_round(...)`
    - `.on_submit_transaction(...)`
    - `.on_node_inactive(...)`
    - `.on_start_sync(...)`
    - `.on_end_sync(...)`
"))]
pub struct NodeSpec<N: Network + 'static, S: CommitSink> {
    // Required parameters
    #[builder(setter(doc = "Set the implementation of peer-to-peer networking. The argument must implement the [Network](crate::networking::network::Network) trait. Required."))]
    network: N,
    #[builder(setter(doc = "Set the chain that finalized blocks are appended to. The argument must implement the [CommitSink](crate::ledger::CommitSink) trait. Required."))]
    commit_sink: S,
    #[builder(setter(doc = "Set the [directory](crate::peers::PeerDirectory) of peers taking part in consensus. Required."))]
    peer_directory: PeerDirectory,
    #[builder(setter(doc = "Set the [configuration](crate::config::Configuration), which contains the necessary parameters to run a node. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default = Box::new(RoundRobin) as Box<dyn ProposerPolicy>, setter(transform = |policy: impl ProposerPolicy + 'static| Box::new(policy) as Box<dyn ProposerPolicy>,
    doc = "Set the policy that decides which peer proposes the block at each height. Every peer must use the same policy. Defaults to round robin. Optional."))]
    proposer_policy: Box<dyn ProposerPolicy>,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>, setter(transform = |clock: impl Clock + 'static| Arc::new(clock) as Arc<dyn Clock>,
    doc = "Set the source of time for deadlines and timestamps. Defaults to the system clock. Optional."))]
    clock: Arc<dyn Clock>,
    #[builder(default, setter(transform = |handler: impl Fn(&CommitBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CommitBlockEvent>),
    doc = "Register a handler closure to be invoked after a block is appended to the commit sink. Optional."))]
    on_commit_block: Option<HandlerPtr<CommitBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeEvent>),
    doc = "Register a handler closure to be invoked after the node circulates a candidate block it proposed. Optional."))]
    on_propose: Option<HandlerPtr<ProposeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SignBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SignBlockEvent>),
    doc = "Register a handler closure to be invoked after the node signs another proposer's candidate block. Optional."))]
    on_sign_block: Option<HandlerPtr<SignBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveSignatureEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveSignatureEvent>),
    doc = "Register a handler closure to be invoked after the node classifies a signature it received. Optional."))]
    on_receive_signature: Option<HandlerPtr<ReceiveSignatureEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveCommitEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveCommitEvent>),
    doc = "Register a handler closure to be invoked after the node receives a finalized block from a peer. Optional."))]
    on_receive_commit: Option<HandlerPtr<ReceiveCommitEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ExpandWindowEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ExpandWindowEvent>),
    doc = "Register a handler closure to be invoked after a round's validating window grows. Optional."))]
    on_expand_window: Option<HandlerPtr<ExpandWindowEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&StopRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StopRoundEvent>),
    doc = "Register a handler closure to be invoked after a round stops without committing. Optional."))]
    on_stop_round: Option<HandlerPtr<StopRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SubmitTransactionEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SubmitTransactionEvent>),
    doc = "Register a handler closure to be invoked after a transaction is submitted, whether or not it was accepted. Optional."))]
    on_submit_transaction: Option<HandlerPtr<SubmitTransactionEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NodeInactiveEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<NodeInactiveEvent>),
    doc = "Register a handler closure to be invoked after the node leaves consensus. Optional."))]
    on_node_inactive: Option<HandlerPtr<NodeInactiveEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&StartSyncEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StartSyncEvent>),
    doc = "Register a handler closure to be invoked after the node starts syncing from a peer. Optional."))]
    on_start_sync: Option<HandlerPtr<StartSyncEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&EndSyncEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<EndSyncEvent>),
    doc = "Register a handler closure to be invoked after the node finishes syncing. Optional."))]
    on_end_sync: Option<HandlerPtr<EndSyncEvent>>,
}

impl<N: Network + 'static, S: CommitSink> NodeSpec<N, S> {
    /// Validates the configuration, then starts all threads and channels associated with running a
    /// node, and returns the handles to them in a [Node] struct.
    pub fn start(self) -> Result<Node<S>, ConfigError> {
        self.configuration.validate()?;
        let config = self.configuration;
        let me = config.me.verifying_key();

        let event_handlers = EventHandlers::new(
            config.log_events,
            UserHandlers {
                on_commit_block: self.on_commit_block,
                on_propose: self.on_propose,
                on_sign_block: self.on_sign_block,
                on_receive_signature: self.on_receive_signature,
                on_receive_commit: self.on_receive_commit,
                on_expand_window: self.on_expand_window,
                on_stop_round: self.on_stop_round,
                on_submit_transaction: self.on_submit_transaction,
                on_node_inactive: self.on_node_inactive,
                on_start_sync: self.on_start_sync,
                on_end_sync: self.on_end_sync,
            },
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let transaction_pool = TransactionPool::new((&config).into(), Arc::clone(&self.clock))
            .with_event_publisher(event_publisher.clone());

        let (poller_shutdown, poller_shutdown_receiver) = mpsc::channel();
        let (poller, consensus_msgs, block_sync_requests, block_sync_responses) =
            start_polling(self.network.clone(), poller_shutdown_receiver);

        let (block_sync_server_shutdown, block_sync_server_shutdown_receiver) = mpsc::channel();
        let block_sync_server = BlockSyncServer::new(
            (&config).into(),
            self.commit_sink.clone(),
            BlockSyncServerStub::new(block_sync_requests),
            RingBroadcaster::new(self.network.clone(), me, config.send_timeout),
            block_sync_server_shutdown_receiver,
        )
        .start();

        let sumeragi = Sumeragi::new(
            &config,
            self.network,
            self.peer_directory.clone(),
            transaction_pool.clone(),
            self.commit_sink.clone(),
            self.clock,
            self.proposer_policy,
            event_publisher,
        );

        let (algorithm_shutdown, algorithm_shutdown_receiver) = mpsc::channel();
        let algorithm = Algorithm::new(
            sumeragi,
            ConsensusMessageStub::new(consensus_msgs),
            BlockSyncClientStub::new(block_sync_responses),
            config.message_poll_interval,
            algorithm_shutdown_receiver,
        )
        .start();

        let (event_bus, event_bus_shutdown) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus = start_event_bus(
                    event_handlers,
                    event_subscriber,
                    event_bus_shutdown_receiver,
                    config.message_poll_interval,
                );
                (Some(event_bus), Some(event_bus_shutdown))
            }
            None => (None, None),
        };

        Ok(Node {
            me,
            transaction_pool,
            commit_sink: self.commit_sink,
            peer_directory: self.peer_directory,
            poller: Some(poller),
            poller_shutdown,
            algorithm: Some(algorithm),
            algorithm_shutdown,
            block_sync_server: Some(block_sync_server),
            block_sync_server_shutdown,
            event_bus,
            event_bus_shutdown,
        })
    }
}

/// A handle to the background threads of a node. When this value is dropped, all background threads
/// are gracefully shut down.
pub struct Node<S: CommitSink> {
    me: VerifyingKey,
    transaction_pool: TransactionPool,
    commit_sink: S,
    peer_directory: PeerDirectory,
    poller: Option<JoinHandle<()>>,
    poller_shutdown: Sender<()>,
    algorithm: Option<JoinHandle<()>>,
    algorithm_shutdown: Sender<()>,
    block_sync_server: Option<JoinHandle<()>>,
    block_sync_server_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<S: CommitSink> Node<S> {
    /// Submit a client transaction for inclusion in a future block.
    pub fn submit(&self, transaction: Transaction) -> Result<(), SubmitRejection> {
        self.transaction_pool.submit(transaction)
    }

    pub fn transaction_pool(&self) -> &TransactionPool {
        &self.transaction_pool
    }

    pub fn commit_sink(&self) -> &S {
        &self.commit_sink
    }

    pub fn peer_directory(&self) -> &PeerDirectory {
        &self.peer_directory
    }

    /// Whether this node currently takes part in consensus, as recorded in its own peer directory.
    pub fn status(&self) -> NodeStatus {
        match self.peer_directory.find(&self.me) {
            Some(peer) if peer.state == PeerState::Active => NodeStatus::Active,
            _ => NodeStatus::Inactive,
        }
    }
}

impl<S: CommitSink> Drop for Node<S> {
    fn drop(&mut self) {
        // The order of thread shutdown in this function is important, as the threads make assumptions
        // about the validity of their channels based on this. The algorithm and block sync server threads
        // receive messages from the poller, and assume that the poller will live longer than them.

        if let Some(event_bus_shutdown) = &self.event_bus_shutdown {
            let _ = event_bus_shutdown.send(());
        }
        join("event bus", self.event_bus.take());

        let _ = self.algorithm_shutdown.send(());
        join("algorithm", self.algorithm.take());

        let _ = self.block_sync_server_shutdown.send(());
        join("block sync server", self.block_sync_server.take());

        let _ = self.poller_shutdown.send(());
        join("poller", self.poller.take());
    }
}

fn join(name: &str, thread: Option<JoinHandle<()>>) {
    if let Some(thread) = thread {
        if thread.join().is_err() {
            log::error!("The {} thread panicked", name);
        }
    }
}
