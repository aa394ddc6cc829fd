/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Subprotocol that catches up the local chain when the node misses out on committed blocks, or when
//! it has fallen out of consensus and must rebuild trust in its local state.
//!
//! A lagging node sends a [`BlockSyncRequest`](messages::BlockSyncRequest) for blocks starting at its
//! next height to one Active peer, and appends every block of the response that carries a
//! supermajority of valid signatures. It keeps requesting from the same peer until a response holds
//! fewer blocks than the request limit, which means the peer has no more to give.

pub mod messages;

pub(crate) mod client;

pub(crate) mod server;
