/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The shared, administratively mutable [`PeerDirectory`].
//!
//! Every mutation builds a complete new [`PeerSnapshot`] and swaps it in under a write lock. Readers
//! clone the `Arc` of the current snapshot under a read lock, so they can never observe a
//! half-applied change, and a snapshot they hold stays valid for as long as they need it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ed25519_dalek::VerifyingKey;

use super::peer::{Peer, PeerSnapshot, PeerState};

#[derive(Clone)]
pub struct PeerDirectory {
    current: Arc<RwLock<Arc<PeerSnapshot>>>,
}

impl PeerDirectory {
    /// Create a directory containing `peers`. Fails if two peers share an identity or an address.
    pub fn new(peers: Vec<Peer>) -> Result<PeerDirectory, PeerDirectoryError> {
        let mut accepted: Vec<Peer> = Vec::with_capacity(peers.len());
        for peer in peers {
            check_unique(&accepted, &peer)?;
            accepted.push(peer);
        }
        Ok(PeerDirectory {
            current: Arc::new(RwLock::new(Arc::new(PeerSnapshot::new(0, accepted)))),
        })
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Arc<PeerSnapshot> {
        Arc::clone(&self.read())
    }

    pub fn active_peers(&self) -> Vec<Peer> {
        self.snapshot().active_peers().to_vec()
    }

    pub fn max_faulty(&self) -> usize {
        self.snapshot().max_faulty()
    }

    pub fn validating_window_size(&self) -> usize {
        self.snapshot().validating_window_size()
    }

    pub fn find(&self, identity: &VerifyingKey) -> Option<Peer> {
        self.snapshot().find(identity).cloned()
    }

    pub fn add(&self, peer: Peer) -> Result<(), PeerDirectoryError> {
        self.update(|peers| {
            check_unique(peers, &peer)?;
            peers.push(peer);
            Ok(())
        })
    }

    pub fn remove(&self, identity: &VerifyingKey) -> Result<Peer, PeerDirectoryError> {
        self.update(|peers| {
            let position = peers
                .iter()
                .position(|peer| peer.identity == *identity)
                .ok_or(PeerDirectoryError::PeerNotFound)?;
            Ok(peers.remove(position))
        })
    }

    pub fn set_state(&self, identity: &VerifyingKey, state: PeerState) -> Result<(), PeerDirectoryError> {
        self.update(|peers| {
            find_mut(peers, identity)?.state = state;
            Ok(())
        })
    }

    pub fn set_trust(&self, identity: &VerifyingKey, trust: f64) -> Result<(), PeerDirectoryError> {
        self.update(|peers| {
            find_mut(peers, identity)?.trust = trust;
            Ok(())
        })
    }

    /// Add `delta` (which may be negative) to the trust score of the peer with `identity`.
    pub fn change_trust(&self, identity: &VerifyingKey, delta: f64) -> Result<(), PeerDirectoryError> {
        self.update(|peers| {
            find_mut(peers, identity)?.trust += delta;
            Ok(())
        })
    }

    // Apply `change` to a copy of the current peer list and, if it succeeds, publish the result as the
    // next snapshot version.
    fn update<T>(
        &self,
        change: impl FnOnce(&mut Vec<Peer>) -> Result<T, PeerDirectoryError>,
    ) -> Result<T, PeerDirectoryError> {
        let mut current = self.write();
        let mut peers = current.peers().to_vec();
        let output = change(&mut peers)?;
        *current = Arc::new(PeerSnapshot::new(current.version() + 1, peers));
        Ok(output)
    }

    fn read(&self) -> RwLockReadGuard<'_, Arc<PeerSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<PeerSnapshot>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn check_unique(peers: &[Peer], candidate: &Peer) -> Result<(), PeerDirectoryError> {
    if peers.iter().any(|peer| peer.identity == candidate.identity) {
        return Err(PeerDirectoryError::DuplicateIdentity);
    }
    if peers.iter().any(|peer| peer.address == candidate.address) {
        return Err(PeerDirectoryError::DuplicateAddress);
    }
    Ok(())
}

fn find_mut<'a>(peers: &'a mut [Peer], identity: &VerifyingKey) -> Result<&'a mut Peer, PeerDirectoryError> {
    peers
        .iter_mut()
        .find(|peer| peer.identity == *identity)
        .ok_or(PeerDirectoryError::PeerNotFound)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerDirectoryError {
    DuplicateIdentity,
    DuplicateAddress,
    PeerNotFound,
}
