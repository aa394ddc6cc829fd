/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Exhaustive enumerations around every message variant exchanged between peers.
//!
//! Transports that move bytes rather than values can use [`Message::to_bytes`] and
//! [`Message::from_bytes`], which round-trip every variant losslessly through Borsh.

use std::io;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    block_sync::messages::{BlockSyncMessage, BlockSyncRequest, BlockSyncResponse},
    sumeragi::messages::{Abandon, Circulate, Commit, ConsensusMessage, Forward, Vote},
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Message {
    /// See: [`ConsensusMessage`].
    ConsensusMessage(ConsensusMessage),

    /// See: [`BlockSyncMessage`].
    BlockSyncMessage(BlockSyncMessage),
}

impl Message {
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Message> {
        Message::try_from_slice(bytes)
    }
}

impl From<ConsensusMessage> for Message {
    fn from(value: ConsensusMessage) -> Self {
        Message::ConsensusMessage(value)
    }
}

impl From<Circulate> for Message {
    fn from(value: Circulate) -> Self {
        Message::ConsensusMessage(ConsensusMessage::Circulate(value))
    }
}

impl From<Vote> for Message {
    fn from(value: Vote) -> Self {
        Message::ConsensusMessage(ConsensusMessage::Vote(value))
    }
}

impl From<Commit> for Message {
    fn from(value: Commit) -> Self {
        Message::ConsensusMessage(ConsensusMessage::Commit(value))
    }
}

impl From<Abandon> for Message {
    fn from(value: Abandon) -> Self {
        Message::ConsensusMessage(ConsensusMessage::Abandon(value))
    }
}

impl From<Forward> for Message {
    fn from(value: Forward) -> Self {
        Message::ConsensusMessage(ConsensusMessage::Forward(value))
    }
}

impl From<BlockSyncRequest> for Message {
    fn from(value: BlockSyncRequest) -> Self {
        Message::BlockSyncMessage(BlockSyncMessage::BlockSyncRequest(value))
    }
}

impl From<BlockSyncResponse> for Message {
    fn from(value: BlockSyncResponse) -> Self {
        Message::BlockSyncMessage(BlockSyncMessage::BlockSyncResponse(value))
    }
}
