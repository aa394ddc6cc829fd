/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Bookkeeping for the requesting side of block sync.
//!
//! The [`BlockSyncClient`] does not send or verify anything itself. It is owned by the
//! [consensus core](crate::sumeragi::Sumeragi), which sends the requests it prepares, verifies and
//! appends the blocks of each response, and reports back how the attempt went.

use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use ed25519_dalek::VerifyingKey;

use crate::{peers::PeerSnapshot, types::data_types::BlockHeight};

use super::messages::BlockSyncRequest;

pub(crate) struct BlockSyncClient {
    request_limit: u32,
    response_timeout: Duration,
    attempt: Option<SyncAttempt>,
    // Peers that served blocks without a valid supermajority. Skipped when choosing a sync peer.
    blacklist: HashSet<VerifyingKey>,
}

struct SyncAttempt {
    peer: VerifyingKey,
    deadline: Instant,
    blocks_synced: u64,
}

impl BlockSyncClient {
    pub(crate) fn new(request_limit: u32, response_timeout: Duration) -> BlockSyncClient {
        BlockSyncClient {
            request_limit,
            response_timeout,
            attempt: None,
            blacklist: HashSet::new(),
        }
    }

    pub(crate) fn request_limit(&self) -> u32 {
        self.request_limit
    }

    pub(crate) fn is_syncing(&self) -> bool {
        self.attempt.is_some()
    }

    /// Whether a response from `origin` answers the current attempt.
    pub(crate) fn is_expecting(&self, origin: &VerifyingKey) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(|attempt| attempt.peer == *origin)
    }

    pub(crate) fn timed_out(&self, now: Instant) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(|attempt| now >= attempt.deadline)
    }

    /// Choose the peer to sync from: `hint` if it is usable, otherwise a random Active peer that is
    /// neither `me` nor blacklisted.
    pub(crate) fn choose_peer(
        &mut self,
        hint: Option<VerifyingKey>,
        peers: &PeerSnapshot,
        me: &VerifyingKey,
    ) -> Option<VerifyingKey> {
        if let Some(hint) = hint {
            if hint != *me && !self.blacklist.contains(&hint) {
                return Some(hint);
            }
        }

        let mut excluding: Vec<VerifyingKey> = self.blacklist.iter().copied().collect();
        excluding.push(*me);
        peers.random_active_peer(&excluding).or_else(|| {
            // Every candidate is blacklisted. Give them all another chance.
            self.blacklist.clear();
            peers.random_active_peer(&[*me])
        })
    }

    /// Start (or restart) an attempt with `peer`, returning the first request to send.
    pub(crate) fn begin(
        &mut self,
        peer: VerifyingKey,
        start_height: BlockHeight,
        now: Instant,
    ) -> BlockSyncRequest {
        self.attempt = Some(SyncAttempt {
            peer,
            deadline: now + self.response_timeout,
            blocks_synced: 0,
        });
        self.request(start_height)
    }

    /// Prepare the follow-up request of the current attempt after a full response.
    pub(crate) fn next_request(&mut self, start_height: BlockHeight, now: Instant) -> BlockSyncRequest {
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.deadline = now + self.response_timeout;
        }
        self.request(start_height)
    }

    pub(crate) fn record_block(&mut self) {
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.blocks_synced += 1;
        }
    }

    /// End the current attempt successfully. Returns the peer and the number of blocks synced.
    pub(crate) fn finish(&mut self) -> Option<(VerifyingKey, u64)> {
        self.attempt
            .take()
            .map(|attempt| (attempt.peer, attempt.blocks_synced))
    }

    /// End the current attempt unsuccessfully. If `misbehaved`, the peer is blacklisted.
    pub(crate) fn abandon(&mut self, misbehaved: bool) -> Option<VerifyingKey> {
        let attempt = self.attempt.take()?;
        if misbehaved {
            self.blacklist.insert(attempt.peer);
        }
        Some(attempt.peer)
    }

    fn request(&self, start_height: BlockHeight) -> BlockSyncRequest {
        BlockSyncRequest {
            start_height,
            limit: self.request_limit,
        }
    }
}
