/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'transaction' type and its associated methods.
//!
//! The consensus core treats transactions as opaque: it never interprets [`Command`]s, it only orders
//! them into blocks. The identity of a transaction is its [hash](Transaction::hash), which covers the
//! creator, the commands, and the creation timestamp, but not the attached signatures.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{sign, CryptoHasher, Digest, Signature, SigningKey, VerifyingKey},
    data_types::{CryptoHash, Timestamp, VerifyingKeyBytes},
};

/// An opaque instruction for the world state, encoded by the client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Command(Vec<u8>);

impl Command {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub creator: VerifyingKeyBytes,
    pub commands: Vec<Command>,
    pub created_at: Timestamp,
    pub signatures: Vec<Signature>,
}

impl Transaction {
    /// Create an unsigned transaction.
    pub fn new(creator: VerifyingKey, commands: Vec<Command>, created_at: Timestamp) -> Self {
        Self {
            creator: creator.to_bytes(),
            commands,
            created_at,
            signatures: Vec::new(),
        }
    }

    /// Create a transaction whose creator is the owner of `signing_key`, signed by that same key.
    pub fn signed(signing_key: &SigningKey, commands: Vec<Command>, created_at: Timestamp) -> Self {
        Self::new(signing_key.verifying_key(), commands, created_at).with_signature(signing_key)
    }

    /// Attach a signature by `signing_key` over this transaction's hash.
    pub fn with_signature(mut self, signing_key: &SigningKey) -> Self {
        let signature = sign(&self.hash(), signing_key);
        self.signatures.push(signature);
        self
    }

    pub fn hash(&self) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(self.creator);
        hasher.update((self.commands.len() as u64).to_le_bytes());
        for command in &self.commands {
            hasher.update((command.bytes().len() as u64).to_le_bytes());
            hasher.update(command.bytes());
        }
        hasher.update(self.created_at.int().to_le_bytes());
        CryptoHash::new(hasher.finalize().into())
    }

    /// Check that the transaction carries at least one signature, and that every attached signature
    /// verifies against the transaction's hash.
    pub fn has_valid_signatures(&self) -> bool {
        let hash = self.hash();
        !self.signatures.is_empty()
            && self
                .signatures
                .iter()
                .all(|signature| signature.is_valid_for(&hash))
    }
}
