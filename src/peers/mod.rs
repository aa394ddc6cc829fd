/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The set of known peers, their trust scores, and the ring permutation of Active peers.
//!
//! The consensus core reads peers exclusively through immutable [`PeerSnapshot`]s obtained from a
//! [`PeerDirectory`] handle. A round pins the snapshot it was proposed under, so administrative changes
//! to the directory never change the fault-tolerance bound or the ring of a round already in flight.

pub mod directory;

pub mod peer;

pub use directory::{PeerDirectory, PeerDirectoryError};
pub use peer::{max_faulty, validating_window_size, Peer, PeerSnapshot, PeerState};
