/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the [`Peer`] and [`PeerSnapshot`] types and their associated methods.

use ed25519_dalek::VerifyingKey;
use rand::seq::SliceRandom;

use crate::types::data_types::PeerAddress;

/// Lifecycle state of a peer. Only `Active` peers take part in consensus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerState {
    /// Known, but not yet connected.
    Prepare,
    /// Connected and able to serve blocks, but not validating. A node that has fallen out of consensus
    /// marks itself `Ready` while it catches up.
    Ready,
    Active,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Peer {
    pub identity: VerifyingKey,
    pub address: PeerAddress,
    pub trust: f64,
    pub state: PeerState,
}

impl Peer {
    pub fn new(identity: VerifyingKey, address: PeerAddress, trust: f64, state: PeerState) -> Peer {
        Peer {
            identity,
            address,
            trust,
            state,
        }
    }

    /// Create an Active peer with the default trust score of 100.
    pub fn active(identity: VerifyingKey, address: PeerAddress) -> Peer {
        Peer::new(identity, address, 100.0, PeerState::Active)
    }
}

/// `floor((n - 1) / 3)`, the number of faulty peers tolerated among `n` Active peers, or 0 if `n <= 1`.
pub fn max_faulty(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (n - 1) / 3
    }
}

/// `2 * max_faulty(n) + 1`, the initial size of the validating window, and the number of signatures a
/// round needs to commit.
pub fn validating_window_size(n: usize) -> usize {
    2 * max_faulty(n) + 1
}

/// An immutable, versioned view of the peer directory.
///
/// Active peers are kept in ascending order of their public keys. This order is the ring permutation:
/// every node that holds the same set of Active peers derives the same ring.
#[derive(Clone, Debug)]
pub struct PeerSnapshot {
    version: u64,
    // Every known peer, in insertion order.
    peers: Vec<Peer>,
    // The Active subset of `peers`, in ascending order of identity bytes.
    active: Vec<Peer>,
}

impl PeerSnapshot {
    pub(crate) fn new(version: u64, peers: Vec<Peer>) -> PeerSnapshot {
        let mut active: Vec<Peer> = peers
            .iter()
            .filter(|peer| peer.state == PeerState::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.identity.to_bytes().cmp(&b.identity.to_bytes()));
        PeerSnapshot {
            version,
            peers,
            active,
        }
    }

    /// Incremented by every administrative change to the directory.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn active_peers(&self) -> &[Peer] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn max_faulty(&self) -> usize {
        max_faulty(self.active.len())
    }

    pub fn validating_window_size(&self) -> usize {
        validating_window_size(self.active.len())
    }

    pub fn find(&self, identity: &VerifyingKey) -> Option<&Peer> {
        self.peers.iter().find(|peer| peer.identity == *identity)
    }

    pub fn is_active(&self, identity: &VerifyingKey) -> bool {
        self.position(identity).is_some()
    }

    /// Index of `identity` in the ring order, if it is an Active peer.
    pub fn position(&self, identity: &VerifyingKey) -> Option<usize> {
        let identity_bytes = identity.to_bytes();
        self.active
            .binary_search_by(|peer| peer.identity.to_bytes().cmp(&identity_bytes))
            .ok()
    }

    /// The ring of Active peers as seen by a round proposed by `proposer`: the ring order rotated so that
    /// `proposer` sits at index 0. Returns `None` if `proposer` is not Active.
    pub fn ring_from(&self, proposer: &VerifyingKey) -> Option<Vec<VerifyingKey>> {
        let start = self.position(proposer)?;
        let n = self.active.len();
        Some((0..n).map(|i| self.active[(start + i) % n].identity).collect())
    }

    /// Pick a random Active peer that is not in `excluding`.
    pub fn random_active_peer(&self, excluding: &[VerifyingKey]) -> Option<VerifyingKey> {
        let candidates: Vec<VerifyingKey> = self
            .active
            .iter()
            .map(|peer| peer.identity)
            .filter(|identity| !excluding.contains(identity))
            .collect();
        candidates.choose(&mut rand::thread_rng()).copied()
    }
}
