/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for sending messages to the P2P network.
//!
//! [`RingBroadcaster`] addresses peers by their index in a round's ring. Index 0 is always the
//! proposer, which is the local peer whenever the broadcaster is used to circulate a block, so every
//! method skips the local peer instead of sending a message to itself.
//!
//! Sends to unreachable peers report [`Delivery::Timeout`] and are otherwise ignored: a vote that never
//! comes back is handled by the round deadline, not by the broadcaster.

use std::time::Duration;

use ed25519_dalek::VerifyingKey;

use super::{
    messages::Message,
    network::{Delivery, Network},
};

/// Handle for sending messages to single peers and to ranges of a ring.
///
/// It can be used to send instances of any type that implement the [`Into<Message>`] trait.
#[derive(Clone)]
pub struct RingBroadcaster<N: Network> {
    network: N,
    me: VerifyingKey,
    send_timeout: Duration,
}

impl<N: Network> RingBroadcaster<N> {
    pub fn new(network: N, me: VerifyingKey, send_timeout: Duration) -> Self {
        Self {
            network,
            me,
            send_timeout,
        }
    }

    /// Send `msg` to exactly one peer.
    pub fn unicast<S: Into<Message>>(&mut self, peer: VerifyingKey, msg: S) -> Delivery {
        if peer == self.me {
            return Delivery::Ack;
        }
        let delivery = self.network.send(peer, msg.into(), self.send_timeout);
        if delivery == Delivery::Timeout {
            log::debug!("Send to peer timed out after {:?}", self.send_timeout);
        }
        delivery
    }

    /// Send `msg` to every peer whose index in `ring` is in `[start, end)`.
    pub fn multicast_range<S: Into<Message>>(
        &mut self,
        ring: &[VerifyingKey],
        start: usize,
        end: usize,
        msg: S,
    ) -> Vec<(VerifyingKey, Delivery)> {
        let end = end.min(ring.len());
        if start >= end {
            return Vec::new();
        }
        let msg = msg.into();
        let me = self.me;
        ring[start..end]
            .iter()
            .filter(|peer| **peer != me)
            .map(|peer| (*peer, self.unicast(*peer, msg.clone())))
            .collect()
    }

    /// Send `msg` to every peer in `ring`.
    pub fn multicast_all<S: Into<Message>>(
        &mut self,
        ring: &[VerifyingKey],
        msg: S,
    ) -> Vec<(VerifyingKey, Delivery)> {
        self.multicast_range(ring, 0, ring.len(), msg)
    }
}
