/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The definitions and re-exports in this module provide two categories of cryptographic primitives:
//! 1. **Cryptographic Hashes**: provided by the [`sha2`] crate.
//! 2. **Digital Signatures**: provided by the [`ed25519_dalek`] crate.
//!
//! All of the functions here are pure. Verification failure is reported as `false`, never as an error,
//! since receiving signatures that do not verify is an expected outcome when peers are faulty or slow.

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::Signature as Ed25519Signature;

use super::data_types::{CryptoHash, SignatureBytes, VerifyingKeyBytes};

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

pub use ed25519_dalek::{SignatureError, Signer, SigningKey, Verifier, VerifyingKey};

/// A signature over a 32-byte message hash, paired with the public key of the peer who produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Signature {
    pub signer: VerifyingKeyBytes,
    pub bytes: SignatureBytes,
}

impl Signature {
    /// Get the `signer` field as a `VerifyingKey`. Returns `None` if the bytes do not encode a valid
    /// Ed25519 point.
    pub fn signer_key(&self) -> Option<VerifyingKey> {
        VerifyingKey::from_bytes(&self.signer).ok()
    }

    /// Check that this signature was produced over `message_hash` by the peer named in `signer`.
    pub fn is_valid_for(&self, message_hash: &CryptoHash) -> bool {
        match self.signer_key() {
            Some(signer) => verify(message_hash, self, &signer),
            None => false,
        }
    }
}

/// Compute the SHA256 digest of `bytes`.
pub fn hash(bytes: &[u8]) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update(bytes);
    CryptoHash::new(hasher.finalize().into())
}

/// Compute the SHA256 digest of the concatenation of `left` and `right`. This is how inner nodes of a
/// [Merkle tree](crate::merkle_tree::MerkleTree) are computed.
pub fn hash_pair(left: &CryptoHash, right: &CryptoHash) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update(left.bytes());
    hasher.update(right.bytes());
    CryptoHash::new(hasher.finalize().into())
}

/// Sign `message_hash` with `private_key`.
pub fn sign(message_hash: &CryptoHash, private_key: &SigningKey) -> Signature {
    Signature {
        signer: private_key.verifying_key().to_bytes(),
        bytes: SignatureBytes::new(private_key.sign(&message_hash.bytes()).to_bytes()),
    }
}

/// Check `signature` over `message_hash` against `public_key`.
///
/// Returns false if `public_key` is not the signer recorded in `signature`.
pub fn verify(message_hash: &CryptoHash, signature: &Signature, public_key: &VerifyingKey) -> bool {
    if signature.signer != public_key.to_bytes() {
        return false;
    }
    let ed25519_signature = Ed25519Signature::from_bytes(&signature.bytes.bytes());
    public_key
        .verify(&message_hash.bytes(), &ed25519_signature)
        .is_ok()
}

/// A facade around [`SigningKey`] that implements a method for [`sign`](Self::sign)-ing hashes as
/// well as a getter for the [`public`](Self::public) key associated with the signing key.
#[derive(Clone)]
pub(crate) struct Keypair(SigningKey);

impl Keypair {
    /// Create a `Keypair` that wraps over `signing_key`.
    pub(crate) fn new(signing_key: SigningKey) -> Keypair {
        Keypair(signing_key)
    }

    /// Sign a 32-byte `message_hash` with the `Keypair`.
    pub(crate) fn sign(&self, message_hash: &CryptoHash) -> Signature {
        sign(message_hash, &self.0)
    }

    /// Get the `VerifyingKey` of this `Keypair`.
    pub(crate) fn public(&self) -> VerifyingKey {
        self.0.verifying_key()
    }
}
