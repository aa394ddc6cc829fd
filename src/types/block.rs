/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'block' type and its associated methods.

use std::collections::HashSet;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::merkle_tree::merkle_root;
use crate::peers::PeerSnapshot;

use super::{
    crypto_primitives::{CryptoHasher, Digest, Signature},
    data_types::{BlockHeight, CryptoHash, Timestamp},
    transaction::Transaction,
};

/// A candidate or committed block.
///
/// The `hash` of a block covers its `height`, `previous_hash`, the hashes of its `transactions` in
/// order, and `merkle_root`. `signatures` are gathered after the hash is fixed and do not change it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub height: BlockHeight,
    pub hash: CryptoHash,
    pub previous_hash: CryptoHash,
    pub merkle_root: CryptoHash,
    pub transactions: Vec<Transaction>,
    pub created_at: Timestamp,
    pub signatures: Vec<Signature>,
}

impl Block {
    pub fn new(
        height: BlockHeight,
        previous_hash: CryptoHash,
        transactions: Vec<Transaction>,
        created_at: Timestamp,
    ) -> Block {
        let transaction_hashes: Vec<CryptoHash> = transactions.iter().map(Transaction::hash).collect();
        let merkle_root = merkle_root(&transaction_hashes);
        Block {
            height,
            hash: Block::hash(height, &previous_hash, &transaction_hashes, &merkle_root),
            previous_hash,
            merkle_root,
            transactions,
            created_at,
            signatures: Vec::new(),
        }
    }

    pub fn hash(
        height: BlockHeight,
        previous_hash: &CryptoHash,
        transaction_hashes: &[CryptoHash],
        merkle_root: &CryptoHash,
    ) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(height.to_le_bytes());
        hasher.update(previous_hash.bytes());
        for transaction_hash in transaction_hashes {
            hasher.update(transaction_hash.bytes());
        }
        hasher.update(merkle_root.bytes());
        CryptoHash::new(hasher.finalize().into())
    }

    /// Return a copy of this block carrying `signatures` instead of its current ones.
    pub fn with_signatures(&self, signatures: Vec<Signature>) -> Block {
        Block {
            signatures,
            ..self.clone()
        }
    }

    /// Checks if `merkle_root` and `hash` are exactly what the block's contents produce.
    pub fn is_correct(&self) -> bool {
        let transaction_hashes: Vec<CryptoHash> =
            self.transactions.iter().map(Transaction::hash).collect();
        self.merkle_root == merkle_root(&transaction_hashes)
            && self.hash
                == Block::hash(
                    self.height,
                    &self.previous_hash,
                    &transaction_hashes,
                    &self.merkle_root,
                )
    }

    /// Count the signatures in `signatures` that verify against this block's hash and were produced by
    /// distinct Active peers in `peers`.
    pub fn count_valid_signatures(&self, peers: &PeerSnapshot) -> usize {
        let mut signers = HashSet::new();
        self.signatures
            .iter()
            .filter(|signature| match signature.signer_key() {
                Some(signer) => peers.is_active(&signer) && signature.is_valid_for(&self.hash),
                None => false,
            })
            .filter(|signature| signers.insert(signature.signer))
            .count()
    }
}
