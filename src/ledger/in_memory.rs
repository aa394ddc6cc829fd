/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A simple, volatile, in-memory implementation of [`CommitSink`].

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    merkle_tree::{MerkleTree, MerkleTreeError},
    types::{
        block::Block,
        crypto_primitives::Signature,
        data_types::{BlockHeight, CryptoHash},
    },
};

use super::pluggables::{CommitError, CommitSink};

/// An in-memory chain. Clones share the same chain.
///
/// Besides the blocks themselves, the ledger pushes every committed block hash into a [`MerkleTree`]
/// whose root, the [`chain_root`](InMemoryLedger::chain_root), commits to the whole history. The tree
/// bounds how many blocks can be [reverted](InMemoryLedger::revert).
#[derive(Clone)]
pub struct InMemoryLedger(Arc<Mutex<LedgerState>>);

struct LedgerState {
    blocks: Vec<Block>,
    accumulator: MerkleTree,
}

impl InMemoryLedger {
    /// Create an empty ledger whose accumulator has `leaves` leaves per generation and retains
    /// `generations` generations.
    pub fn new(leaves: usize, generations: usize) -> Result<InMemoryLedger, MerkleTreeError> {
        Ok(InMemoryLedger(Arc::new(Mutex::new(LedgerState {
            blocks: Vec::new(),
            accumulator: MerkleTree::new(leaves, generations)?,
        }))))
    }

    /// Root of the Merkle accumulator over all committed block hashes.
    pub fn chain_root(&self) -> Option<CryptoHash> {
        self.lock().accumulator.root()
    }

    pub fn max_rollback(&self) -> usize {
        self.lock().accumulator.max_rollback()
    }

    /// Remove the last `blocks` blocks from the chain.
    ///
    /// A request beyond [`max_rollback`](Self::max_rollback) means the caller's view of the chain and the
    /// ledger disagree; it fails with [`CommitError::Corrupted`] and changes nothing.
    pub fn revert(&mut self, blocks: usize) -> Result<(), CommitError> {
        let mut state = self.lock();
        state
            .accumulator
            .rollback(blocks)
            .map_err(|err| CommitError::Corrupted(format!("cannot revert: {:?}", err)))?;
        let remaining = state.blocks.len() - blocks;
        state.blocks.truncate(remaining);
        Ok(())
    }

    /// All committed blocks, in order.
    pub fn blocks(&self) -> Vec<Block> {
        self.lock().blocks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CommitSink for InMemoryLedger {
    fn append_block(&mut self, block: &Block, signatures: &[Signature]) -> Result<(), CommitError> {
        let mut state = self.lock();

        let (expected_height, expected_previous) = match state.blocks.last() {
            Some(tip) => (tip.height + 1, tip.hash),
            None => (BlockHeight::new(0), CryptoHash::zero()),
        };
        if block.height != expected_height {
            return Err(CommitError::Rejected(format!(
                "expected height {}, got {}",
                expected_height, block.height
            )));
        }
        if block.previous_hash != expected_previous {
            return Err(CommitError::Rejected(format!(
                "block {} does not extend tip {}",
                block.hash, expected_previous
            )));
        }

        state.accumulator.push(block.hash);
        state.blocks.push(block.with_signatures(signatures.to_vec()));
        Ok(())
    }

    fn height(&self) -> Option<BlockHeight> {
        self.lock().blocks.last().map(|block| block.height)
    }

    fn last_block(&self) -> Option<Block> {
        self.lock().blocks.last().cloned()
    }

    fn blocks_from(&self, height: BlockHeight, limit: u32) -> Vec<Block> {
        self.lock()
            .blocks
            .iter()
            .skip_while(|block| block.height < height)
            .take(limit as usize)
            .cloned()
            .collect()
    }
}
