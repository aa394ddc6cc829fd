/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](ProposerPolicy) for proposer policies: types that decide which peer proposes the
//! block at each height.
//!
//! Every honest peer must run the same policy: a validator only signs a candidate block if it came from
//! the peer its own policy designates for that height.

use ed25519_dalek::VerifyingKey;

use crate::{peers::PeerSnapshot, types::data_types::BlockHeight};

pub trait ProposerPolicy: Send {
    /// The peer responsible for proposing the block at `height`, or `None` if no Active peer qualifies.
    fn proposer(&self, height: BlockHeight, peers: &PeerSnapshot) -> Option<VerifyingKey>;
}

/// Rotates the proposer through the Active peers in ring order, one height at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobin;

impl ProposerPolicy for RoundRobin {
    fn proposer(&self, height: BlockHeight, peers: &PeerSnapshot) -> Option<VerifyingKey> {
        let active = peers.active_peers();
        if active.is_empty() {
            return None;
        }
        let index = (height.int() % active.len() as u64) as usize;
        Some(active[index].identity)
    }
}

/// Always designates the same leader, as long as it is Active.
#[derive(Clone, Copy, Debug)]
pub struct FixedLeader(pub VerifyingKey);

impl ProposerPolicy for FixedLeader {
    fn proposer(&self, _height: BlockHeight, peers: &PeerSnapshot) -> Option<VerifyingKey> {
        peers.is_active(&self.0).then_some(self.0)
    }
}

/// Whether `peer` should propose the block at `height`.
pub(crate) fn is_proposer(
    policy: &dyn ProposerPolicy,
    peer: &VerifyingKey,
    height: BlockHeight,
    peers: &PeerSnapshot,
) -> bool {
    policy.proposer(height, peers).as_ref() == Some(peer)
}
