/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`Network`] trait, implemented by the library user to connect peers.

use std::time::Duration;

use ed25519_dalek::VerifyingKey;

use super::messages::Message;

pub trait Network: Clone + Send {
    /// Send a message to the specified peer, waiting at most `timeout` for the transport to acknowledge
    /// it. An unreachable peer yields [`Delivery::Timeout`].
    fn send(&mut self, peer: VerifyingKey, message: Message, timeout: Duration) -> Delivery;

    /// Receive a message from any peer. Returns immediately with a None if no message is available now.
    ///
    /// Messages from the same peer must be returned in the order that peer sent them.
    fn recv(&mut self) -> Option<(VerifyingKey, Message)>;
}

/// Outcome of a [`Network::send`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Ack,
    Timeout,
}
