/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Builds candidate blocks out of batches of pending transactions.
//!
//! Assembly is a pure function of its inputs: the same batch, parent, and `created_at` always yield a
//! block with the same hash, so any validator can re-derive and check a block it receives.
//!
//! ## Empty blocks
//!
//! By default a batch with zero transactions is refused with [`AssembleError::EmptyBatch`]. Setting
//! [`allow_empty_blocks`](crate::config::Configuration::allow_empty_blocks) lets the assembler build
//! empty blocks for callers that want them, but the consensus driver itself never proposes a round on
//! an empty pool, so no heartbeat blocks are produced on its own initiative.

use crate::types::{
    block::Block,
    data_types::{BlockHeight, CryptoHash, Timestamp},
    transaction::Transaction,
};

#[derive(Clone, Copy, Debug)]
pub struct BlockAssembler {
    allow_empty_blocks: bool,
}

impl BlockAssembler {
    pub fn new(allow_empty_blocks: bool) -> BlockAssembler {
        BlockAssembler { allow_empty_blocks }
    }

    /// Build the block that follows `previous`, or the genesis block (height 0, zero `previous_hash`) if
    /// `previous` is `None`. Transactions keep their arrival order.
    pub fn assemble(
        &self,
        pending: Vec<Transaction>,
        previous: Option<&Block>,
        created_at: Timestamp,
    ) -> Result<Block, AssembleError> {
        if pending.is_empty() && !self.allow_empty_blocks {
            return Err(AssembleError::EmptyBatch);
        }

        let (height, previous_hash) = match previous {
            Some(previous) => (previous.height + 1, previous.hash),
            None => (BlockHeight::new(0), CryptoHash::zero()),
        };

        Ok(Block::new(height, previous_hash, pending, created_at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssembleError {
    EmptyBatch,
}
