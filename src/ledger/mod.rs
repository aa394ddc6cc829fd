/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The committed chain, as seen by the consensus core.
//!
//! The core depends only on the narrow [`CommitSink`] capability: append a finalized block, and read
//! back the tip and ranges of committed blocks. [`InMemoryLedger`] is a volatile implementation that
//! also maintains a Merkle accumulator over committed block hashes.

pub mod in_memory;

pub mod pluggables;

pub use in_memory::InMemoryLedger;
pub use pluggables::{CommitError, CommitSink};
