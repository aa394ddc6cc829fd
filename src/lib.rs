/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A Rust implementation of Sumeragi, a chain-based Byzantine Fault Tolerant consensus protocol for
//! permissioned blockchains.
//!
//! Sumeragi orders client transactions into blocks and commits each block once a supermajority of the
//! Active peers has signed it. Signatures are collected from a window of peers that starts at the
//! minimum size needed for a supermajority and expands, one deadline at a time, whenever peers are
//! slow or faulty.
//!
//! ## Getting started
//!
//! A node is built from:
//! 1. A [`Network`](networking::network::Network) implementation that carries messages between peers.
//! 2. A [`CommitSink`](ledger::CommitSink) that stores the finalized chain, for example an
//!    [`InMemoryLedger`](ledger::InMemoryLedger).
//! 3. A [`PeerDirectory`](peers::PeerDirectory) listing the peers and their states.
//! 4. A [`Configuration`](config::Configuration).
//!
//! and started with [`NodeSpec::start`](node::NodeSpec::start).
//!
//! ## Where to look
//!
//! - The round state machine: [`sumeragi`].
//! - How it is driven by threads: [`node`], [`algorithm`], [`block_sync`].
//! - What it publishes as it runs: [`events`], [`logging`].

pub mod algorithm;

pub mod block_assembler;

pub mod block_sync;

pub mod clock;

pub mod config;

pub(crate) mod event_bus;

pub mod events;

pub mod ledger;

pub mod logging;

pub mod merkle_tree;

pub mod networking;

pub mod node;

pub mod peers;

pub mod sumeragi;

pub mod transaction_pool;

pub mod types;
