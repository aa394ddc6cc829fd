/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for structured messages that are sent between peers as part of a Sumeragi round.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    block::Block,
    crypto_primitives::{Keypair, Signature},
    data_types::{BlockHeight, CryptoHash},
    transaction::Transaction,
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ConsensusMessage {
    Circulate(Circulate),
    Vote(Vote),
    Commit(Commit),
    Abandon(Abandon),
    Forward(Forward),
}

impl ConsensusMessage {
    pub fn circulate(block: Block) -> ConsensusMessage {
        ConsensusMessage::Circulate(Circulate { block })
    }

    pub(crate) fn vote(me: &Keypair, block: &Block) -> ConsensusMessage {
        ConsensusMessage::Vote(Vote {
            block: block.hash,
            height: block.height,
            signature: me.sign(&block.hash),
        })
    }

    pub fn commit(block: Block) -> ConsensusMessage {
        ConsensusMessage::Commit(Commit { block })
    }

    pub fn abandon(block: CryptoHash, height: BlockHeight) -> ConsensusMessage {
        ConsensusMessage::Abandon(Abandon { block, height })
    }

    pub fn forward(transactions: Vec<Transaction>) -> ConsensusMessage {
        ConsensusMessage::Forward(Forward { transactions })
    }
}

/// A candidate block, sent by its proposer to the peers of the validating window.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Circulate {
    pub block: Block,
}

/// A validator's signature over a candidate block, sent back to the proposer.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Vote {
    pub block: CryptoHash,
    pub height: BlockHeight,
    pub signature: Signature,
}

/// A finalized block carrying the signatures that committed it, sent to every Active peer.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Commit {
    pub block: Block,
}

/// Sent by a proposer whose round stopped, releasing validators from the block they signed at `height`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Abandon {
    pub block: CryptoHash,
    pub height: BlockHeight,
}

/// Transactions accepted by a peer that is not the proposer for the next height, handed on to the
/// peer that is.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Forward {
    pub transactions: Vec<Transaction>,
}
