/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Accumulation of validator signatures for a candidate block, and supermajority arithmetic.
//!
//! ## Supermajority
//!
//! A round over `n` Active peers tolerates `f = max_faulty(n)` faulty peers and needs `2f + 1`
//! signatures to commit. `f` is pinned when the round is proposed. Of the signatures a round holds,
//! only those from peers inside its current [validating window](ValidatingWindow) count toward the
//! threshold. Signatures from Active peers outside the window are still accepted and kept, and start to
//! count as soon as the window grows to include their signers.
//!
//! Membership is checked twice. A signer must be in the round's ring, and must still be Active in the
//! peer directory when its signature arrives. A peer removed or deactivated mid-round can no longer add
//! to the round, although `f` and the window stay as they were at proposal.
//!
//! With 0 or 1 Active peers, `f` is 0 and a single valid signature is a supermajority. A node that is the
//! only Active peer therefore commits its own blocks with its own signature, without any network
//! round-trip.

use ed25519_dalek::VerifyingKey;

use crate::{
    peers::{max_faulty, PeerSnapshot},
    types::{
        crypto_primitives::{verify, Signature},
        data_types::CryptoHash,
    },
};

use super::types::{Classification, ValidatingWindow};

/// The number of signatures a round over `n` Active peers needs to commit: `2 * max_faulty(n) + 1`.
pub fn supermajority_threshold(n: usize) -> usize {
    2 * max_faulty(n) + 1
}

/// Whether `collected` signatures are a supermajority in a round over `n` Active peers.
pub fn has_supermajority(collected: usize, n: usize) -> bool {
    collected >= supermajority_threshold(n)
}

/// Collects signatures over a single block hash from the peers of a fixed ring.
///
/// Signatures are stored by the ring index of their signer, so the set a collector holds is the same
/// no matter in which order they arrived.
#[derive(Clone)]
pub struct SignatureCollector {
    block: CryptoHash,
    ring: Vec<VerifyingKey>,
    signatures: Vec<Option<Signature>>,
}

impl SignatureCollector {
    pub fn new(block: CryptoHash, ring: Vec<VerifyingKey>) -> SignatureCollector {
        let signatures = vec![None; ring.len()];
        SignatureCollector {
            block,
            ring,
            signatures,
        }
    }

    pub fn block(&self) -> CryptoHash {
        self.block
    }

    /// Verify `signature` and, if it is valid and new, add it to the collection. `current` is the peer
    /// directory as it stands now, not as it stood when the round was proposed.
    pub fn accumulate(&mut self, signature: &Signature, current: &PeerSnapshot) -> Classification {
        let Some(signer) = signature.signer_key() else {
            return Classification::Invalid;
        };
        let Some(index) = self.ring.iter().position(|peer| *peer == signer) else {
            return Classification::Invalid;
        };
        if !current.is_active(&signer) {
            return Classification::Invalid;
        }
        if !verify(&self.block, signature, &signer) {
            return Classification::Invalid;
        }
        if self.signatures[index].is_some() {
            return Classification::Duplicate;
        }
        self.signatures[index] = Some(*signature);
        Classification::Accepted
    }

    /// Number of accepted signatures, in or out of any window.
    pub fn len(&self) -> usize {
        self.signatures.iter().filter(|signature| signature.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, signer: &VerifyingKey) -> bool {
        self.ring
            .iter()
            .position(|peer| peer == signer)
            .is_some_and(|index| self.signatures[index].is_some())
    }

    /// Number of accepted signatures whose signers lie inside `window`.
    pub fn count_within(&self, window: &ValidatingWindow) -> usize {
        self.signatures
            .iter()
            .enumerate()
            .filter(|(index, signature)| window.contains(*index) && signature.is_some())
            .count()
    }

    pub fn has_supermajority(&self, window: &ValidatingWindow, max_faulty: usize) -> bool {
        self.count_within(window) >= 2 * max_faulty + 1
    }

    /// The accepted signatures whose signers lie inside `window`, in ring order.
    pub fn signatures_within(&self, window: &ValidatingWindow) -> Vec<Signature> {
        self.signatures
            .iter()
            .enumerate()
            .filter(|(index, _)| window.contains(*index))
            .filter_map(|(_, signature)| *signature)
            .collect()
    }
}
