/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fixed-capacity, append-only Merkle tree with bounded rollback.
//!
//! A [`MerkleTree`] is a sequence of "generations". Each generation is a complete binary tree of
//! `leaves` leaves stored in a flat array of `2 * leaves - 1` hashes, where the children of node `p`
//! live at `2p + 1` and `2p + 2`, and the leaves occupy the last `leaves` slots.
//!
//! Leaves are filled from left to right. After every push, the nodes on the path from the new leaf up
//! to the root of the smallest complete subtree that covers all filled leaves are recomputed:
//! - A node whose right child is still empty takes its left child's value unchanged ("pass-through").
//! - Any other node is the [hash](crate::types::crypto_primitives::hash_pair) of its two children.
//!
//! The root is therefore readable in O(1) and a push costs O(log leaves).
//!
//! When a generation is full, the next push opens a new generation whose first leaf is the full root of
//! the previous one, so the root of the newest generation always commits to every leaf ever pushed. Only
//! the last `generations + 1` generations are retained, which bounds how far the tree can be
//! [rolled back](MerkleTree::rollback).

use std::collections::VecDeque;

use crate::types::{crypto_primitives::hash_pair, data_types::CryptoHash};

pub struct MerkleTree {
    leaves: usize,
    generations: usize,
    trees: VecDeque<Generation>,
}

struct Generation {
    nodes: Vec<CryptoHash>,
    // Index of the next leaf slot to be written.
    cursor: usize,
    root_index: Option<usize>,
}

impl MerkleTree {
    /// Create an empty tree with room for `leaves` leaves per generation (rounded up to the next power
    /// of two, and to at least 2), retaining `generations` full generations for rollback.
    pub fn new(leaves: usize, generations: usize) -> Result<MerkleTree, MerkleTreeError> {
        if generations == 0 {
            return Err(MerkleTreeError::ZeroGenerations);
        }
        Ok(MerkleTree::with_capacity(leaves, generations))
    }

    fn with_capacity(leaves: usize, generations: usize) -> MerkleTree {
        let leaves = leaves.max(2).next_power_of_two();
        let mut trees = VecDeque::with_capacity(generations + 1);
        trees.push_back(Generation::empty(leaves));
        MerkleTree {
            leaves,
            generations,
            trees,
        }
    }

    /// Number of leaves per generation, after rounding.
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    fn size(&self) -> usize {
        2 * self.leaves - 1
    }

    pub fn root(&self) -> Option<CryptoHash> {
        let current = self.trees.back()?;
        current.root_index.map(|index| current.nodes[index])
    }

    pub fn push(&mut self, item: CryptoHash) {
        let (leaves, size) = (self.leaves, self.size());

        let current_is_full = self
            .trees
            .back()
            .map_or(true, |current| current.cursor == size);
        if current_is_full {
            let mut next = Generation::empty(leaves);
            if let Some(full_root) = self.root() {
                next.nodes[leaves - 1] = full_root;
                next.root_index = Some(leaves - 1);
                next.cursor = leaves;
            }
            self.trees.push_back(next);
            if self.trees.len() > self.generations + 1 {
                self.trees.pop_front();
            }
        }

        if let Some(current) = self.trees.back_mut() {
            let leaf = current.cursor;
            current.nodes[leaf] = item;
            current.recompute_path(leaf, leaves);
            current.cursor += 1;
        }
    }

    /// The maximum number of pushes that can currently be undone with [`rollback`](Self::rollback).
    ///
    /// The first leaf of every generation cannot be removed, so each retained full generation
    /// contributes `leaves - 1` steps.
    pub fn max_rollback(&self) -> usize {
        let current_removable = match self.trees.back() {
            Some(current) if current.root_index.is_some() => current.cursor - self.leaves,
            _ => 0,
        };
        (self.trees.len() - 1) * (self.leaves - 1) + current_removable
    }

    /// Undo the last `steps` pushes, restoring the root observed before them.
    ///
    /// Fails without modifying the tree if `steps` is greater than [`max_rollback`](Self::max_rollback).
    pub fn rollback(&mut self, steps: usize) -> Result<(), MerkleTreeError> {
        let max_rollback = self.max_rollback();
        if steps > max_rollback {
            return Err(MerkleTreeError::RollbackBeyondLimit {
                requested: steps,
                max_rollback,
            });
        }
        if steps == 0 {
            return Ok(());
        }

        let (leaves, size) = (self.leaves, self.size());
        let mut remaining = steps;
        loop {
            let removable = match self.trees.back() {
                Some(current) => current.cursor - leaves,
                None => return Ok(()),
            };
            if remaining <= removable {
                if let Some(current) = self.trees.back_mut() {
                    current.cursor -= remaining;
                }
                break;
            }
            remaining -= removable;
            self.trees.pop_back();
            if let Some(previous) = self.trees.back_mut() {
                previous.cursor = size;
            }
        }

        if let Some(current) = self.trees.back_mut() {
            let last_leaf = current.cursor - 1;
            current.recompute_path(last_leaf, leaves);
        }
        Ok(())
    }
}

impl Generation {
    fn empty(leaves: usize) -> Generation {
        Generation {
            nodes: vec![CryptoHash::zero(); 2 * leaves - 1],
            cursor: leaves - 1,
            root_index: None,
        }
    }

    // Recompute the nodes above `leaf`, assuming every leaf to its left is filled and every slot to its
    // right is empty. Slots to the right may hold stale values after a rollback; they are never read.
    fn recompute_path(&mut self, leaf: usize, leaves: usize) {
        let offset = leaf - (leaves - 1);
        let levels = if offset == 0 {
            0
        } else {
            (usize::BITS - offset.leading_zeros()) as usize
        };

        let mut index = leaf;
        for _ in 0..levels {
            let parent = (index - 1) / 2;
            self.nodes[parent] = if index % 2 == 1 {
                self.nodes[index]
            } else {
                hash_pair(&self.nodes[index - 1], &self.nodes[index])
            };
            index = parent;
        }
        self.root_index = Some(index);
    }
}

/// Compute the Merkle root of `hashes` using a single-generation [`MerkleTree`] just large enough to
/// hold them. The root of an empty sequence is [`CryptoHash::zero`].
pub fn merkle_root(hashes: &[CryptoHash]) -> CryptoHash {
    let mut tree = MerkleTree::with_capacity(hashes.len(), 1);
    for hash in hashes {
        tree.push(*hash);
    }
    tree.root().unwrap_or(CryptoHash::zero())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleTreeError {
    ZeroGenerations,
    RollbackBeyondLimit {
        requested: usize,
        max_rollback: usize,
    },
}
