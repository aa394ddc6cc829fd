//! Subprotocol for committing `Block`s: a chain-based BFT round with an expanding validating window.
//!
//! ## Roles
//!
//! For every height, the [`ProposerPolicy`](roles::ProposerPolicy) shared by all peers designates one
//! Active peer as the proposer. Every other Active peer acts as a validator for that height.
//!
//! ## The ring
//!
//! A round addresses the Active peers in ring order: ascending order of their public keys, rotated so
//! that the proposer sits at index 0. The validating window is a prefix `[0, end)` of this ring.
//!
//! ## A round, from the proposer's side
//!
//! 1. **Propose**: take a batch from the [transaction pool](crate::transaction_pool), assemble a
//!    candidate block on top of the local tip, and sign it.
//! 2. **Circulate**: send a [`Circulate`](messages::Circulate) message to the peers in the initial
//!    window `[0, 2f + 1)` and arm the round deadline.
//! 3. **Collect**: accumulate the [`Vote`](messages::Vote)s that come back.
//! 4. **Commit**: as soon as `2f + 1` signatures from peers inside the window are held, append the
//!    block with those signatures to the [`CommitSink`](crate::ledger::CommitSink) and send a
//!    [`Commit`](messages::Commit) message to every Active peer.
//! 5. **Expand**: if the deadline passes first, grow the window by the configured increment, circulate
//!    the candidate to the newly included peers, and arm a fresh deadline.
//! 6. **Stop**: if the deadline passes while the window covers the whole ring, send an
//!    [`Abandon`](messages::Abandon) message to the window and report the batch as failed to the pool.
//!
//! ## A round, from a validator's side
//!
//! A validator signs a circulated candidate if it comes from the designated proposer, extends the
//! validator's own tip, is structurally correct, and carries only correctly signed transactions. It
//! signs at most one candidate per height until that height is committed or the proposer abandons the
//! candidate.
//!
//! On receiving a `Commit`, a peer appends the block if it carries a supermajority of valid signatures
//! as measured against its own view of the Active peers. A `Circulate` or `Commit` for a height beyond
//! the next one reveals that the peer is lagging, and starts [block sync](crate::block_sync).

pub mod collector;

pub mod implementation;
pub use implementation::{Sumeragi, SumeragiError};

pub mod messages;

pub mod roles;

pub mod types;
