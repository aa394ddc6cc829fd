/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to the Sumeragi round state machine.

use std::{
    fmt::{self, Display, Formatter},
    time::Instant,
};

use ed25519_dalek::VerifyingKey;

use crate::types::{
    block::Block,
    crypto_primitives::Signature,
    data_types::{BlockHeight, CryptoHash},
};

use super::collector::SignatureCollector;

/// Phase of a round, from the point of view of its proposer.
///
/// ```text
/// Idle -> Proposed -> Circulating -> Collecting -> Committed
///                                        |  ^
///                                        v  |
///                                     Expanding
///                                        |
///                                        v
///                                     Stopped
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Proposed,
    Circulating,
    Collecting,
    Expanding,
    Committed,
    Stopped,
}

/// The half-open range `[start, end)` of ring indices whose signatures count toward a round's
/// supermajority. Its end only ever moves outward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatingWindow {
    pub start: usize,
    pub end: usize,
}

impl ValidatingWindow {
    pub fn new(start: usize, end: usize) -> ValidatingWindow {
        ValidatingWindow { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// How a signature delivered to a round was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Verified, from an Active peer of the round's ring, and not seen before. Added to the round.
    Accepted,
    /// From a signer whose signature the round already holds.
    Duplicate,
    /// Failed verification, was produced by a peer that is not in the round's ring, or targets a block
    /// this node never proposed.
    Invalid,
    /// Targets a round that has already committed or stopped.
    Stale,
}

/// Why a round stopped without committing, or why a finalized block could not be appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The validating window covered every Active peer and the deadline still passed without a
    /// supermajority.
    WindowExhausted,
    /// The commit sink refused the block.
    CommitRejected(String),
    /// A block from another proposer was committed at the same height.
    Superseded,
    /// This node left the Active state while the round was running.
    NodeInactive,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::WindowExhausted => f.write_str("validating window exhausted"),
            StopReason::CommitRejected(reason) => write!(f, "commit rejected ({})", reason),
            StopReason::Superseded => f.write_str("superseded"),
            StopReason::NodeInactive => f.write_str("node inactive"),
        }
    }
}

/// Whether this node currently takes part in consensus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    Active,
    /// Local chain state could not be trusted. The node neither proposes nor signs until block sync has
    /// caught it up again.
    Inactive,
}

/// State of the round this node is proposing.
///
/// The ring, the fault bound, and therefore the supermajority threshold are pinned when the round is
/// created. Administrative changes to the peer directory only affect later rounds.
pub struct Round {
    pub(crate) candidate: Block,
    pub(crate) snapshot_version: u64,
    pub(crate) ring: Vec<VerifyingKey>,
    pub(crate) max_faulty: usize,
    pub(crate) window: ValidatingWindow,
    pub(crate) deadline: Instant,
    pub(crate) phase: Phase,
    pub(crate) collector: SignatureCollector,
}

impl Round {
    pub(crate) fn new(
        candidate: Block,
        snapshot_version: u64,
        ring: Vec<VerifyingKey>,
        max_faulty: usize,
        deadline: Instant,
    ) -> Round {
        let window = ValidatingWindow::new(0, (2 * max_faulty + 1).min(ring.len()));
        let collector = SignatureCollector::new(candidate.hash, ring.clone());
        Round {
            candidate,
            snapshot_version,
            ring,
            max_faulty,
            window,
            deadline,
            phase: Phase::Proposed,
            collector,
        }
    }

    pub fn candidate(&self) -> &Block {
        &self.candidate
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn window(&self) -> ValidatingWindow {
        self.window
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Active peers in the order this round addresses them. Index 0 is the proposer.
    pub fn ring(&self) -> &[VerifyingKey] {
        &self.ring
    }

    pub fn max_faulty(&self) -> usize {
        self.max_faulty
    }

    pub fn snapshot_version(&self) -> u64 {
        self.snapshot_version
    }

    pub fn collector(&self) -> &SignatureCollector {
        &self.collector
    }

    pub fn has_supermajority(&self) -> bool {
        self.collector.has_supermajority(&self.window, self.max_faulty)
    }
}

/// Final verdict of a round this node proposed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundOutcome {
    pub block: CryptoHash,
    pub height: BlockHeight,
    /// Either [`Phase::Committed`] or [`Phase::Stopped`].
    pub phase: Phase,
    /// The signatures the block was committed with, in ring order. Empty for a stopped round.
    pub signatures: Vec<Signature>,
}
