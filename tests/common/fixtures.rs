use std::time::Duration;

use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use sumeragi::{
    clock::Clock,
    config::Configuration,
    peers::{Peer, PeerDirectory},
    types::{
        data_types::PeerAddress,
        transaction::{Command, Transaction},
    },
};

/// Generate `n` signing keys, sorted by the bytes of their public keys so that a key's index is its
/// position in the ring order.
pub(crate) fn sorted_keys(n: usize) -> Vec<SigningKey> {
    let mut csprg = OsRng {};
    let mut keys: Vec<SigningKey> = (0..n).map(|_| SigningKey::generate(&mut csprg)).collect();
    keys.sort_by_key(|key| key.verifying_key().to_bytes());
    keys
}

/// A directory in which every key in `keys` is an Active peer.
pub(crate) fn directory(keys: &[SigningKey]) -> PeerDirectory {
    PeerDirectory::new(
        keys.iter()
            .enumerate()
            .map(|(i, key)| {
                Peer::active(
                    key.verifying_key(),
                    PeerAddress::new(format!("10.0.0.{}:10001", i + 1)),
                )
            })
            .collect(),
    )
    .unwrap()
}

pub(crate) fn configuration(me: &SigningKey, round_timeout: Duration) -> Configuration {
    Configuration::builder()
        .me(me.clone())
        .round_timeout(round_timeout)
        .send_timeout(Duration::from_millis(50))
        .log_events(false)
        .build()
}

/// A transaction signed by `client`, created now according to `clock`. `nonce` keeps transactions
/// with the same creator and timestamp apart.
pub(crate) fn transaction(client: &SigningKey, clock: &dyn Clock, nonce: u64) -> Transaction {
    Transaction::signed(
        client,
        vec![Command::new(nonce.to_le_bytes().to_vec())],
        clock.timestamp(),
    )
}
