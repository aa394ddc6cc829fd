/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of events for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are published by
//! the thread that performs the action and consumed on the [event bus](crate::event_bus) thread, where
//! user-registered handlers and, if enabled, the default [loggers](crate::logging) are run.

use std::{sync::mpsc::Sender, time::SystemTime};

use ed25519_dalek::VerifyingKey;

use crate::{
    sumeragi::types::{Classification, StopReason},
    transaction_pool::SubmitRejection,
    types::data_types::{BlockHeight, CryptoHash},
};

pub enum Event {
    // Events that change the committed chain.
    CommitBlock(CommitBlockEvent),
    // Events that involve sending a consensus message.
    Propose(ProposeEvent),
    SignBlock(SignBlockEvent),
    // Events that involve receiving a consensus message.
    ReceiveSignature(ReceiveSignatureEvent),
    ReceiveCommit(ReceiveCommitEvent),
    // Round events.
    ExpandWindow(ExpandWindowEvent),
    StopRound(StopRoundEvent),
    // Node events.
    SubmitTransaction(SubmitTransactionEvent),
    NodeInactive(NodeInactiveEvent),
    // Sync events.
    StartSync(StartSyncEvent),
    EndSync(EndSyncEvent),
}

impl Event {
    /// Send the event to the event bus, if there is one. Events published after the event bus has shut
    /// down are dropped.
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(self);
        }
    }
}

/// A block was appended to the local chain, either as the outcome of a round this node proposed or on
/// receipt of another proposer's finalized block.
pub struct CommitBlockEvent {
    pub timestamp: SystemTime,
    pub block: CryptoHash,
    pub height: BlockHeight,
    pub signatures: usize,
}

/// This node proposed `block` and circulated it to the first `window_end` peers of its ring.
pub struct ProposeEvent {
    pub timestamp: SystemTime,
    pub block: CryptoHash,
    pub height: BlockHeight,
    pub transactions: usize,
    pub window_end: usize,
}

/// This node signed a candidate block from `proposer` and sent its signature back.
pub struct SignBlockEvent {
    pub timestamp: SystemTime,
    pub proposer: VerifyingKey,
    pub block: CryptoHash,
    pub height: BlockHeight,
}

pub struct ReceiveSignatureEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub block: CryptoHash,
    pub classification: Classification,
}

pub struct ReceiveCommitEvent {
    pub timestamp: SystemTime,
    pub origin: VerifyingKey,
    pub block: CryptoHash,
    pub height: BlockHeight,
}

/// The round for `block` missed its deadline and its validating window grew to `window_end` out of
/// `ring_len` peers.
pub struct ExpandWindowEvent {
    pub timestamp: SystemTime,
    pub block: CryptoHash,
    pub window_end: usize,
    pub ring_len: usize,
}

pub struct StopRoundEvent {
    pub timestamp: SystemTime,
    pub block: CryptoHash,
    pub height: BlockHeight,
    pub reason: StopReason,
}

pub struct SubmitTransactionEvent {
    pub timestamp: SystemTime,
    pub transaction: CryptoHash,
    /// `None` if the transaction was accepted.
    pub rejection: Option<SubmitRejection>,
}

/// This node left consensus because its local chain state could not be trusted.
pub struct NodeInactiveEvent {
    pub timestamp: SystemTime,
    pub reason: String,
}

pub struct StartSyncEvent {
    pub timestamp: SystemTime,
    pub peer: VerifyingKey,
    pub start_height: BlockHeight,
}

pub struct EndSyncEvent {
    pub timestamp: SystemTime,
    pub peer: VerifyingKey,
    pub blocks_synced: u64,
}
