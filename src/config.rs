/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The user-defined parameters of a node.
//!
//! A [`Configuration`] is built once with the builder pattern and then checked with
//! [`validate`](Configuration::validate) when the node starts. Every consensus parameter lives here
//! rather than in a compile-time constant, so tests can shrink timeouts and limits freely.
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .me(signing_key)
//!     .round_timeout(Duration::from_millis(3000))
//!     .window_expansion_increment(1)
//!     .log_events(true)
//!     .build();
//! ```

use std::time::Duration;

use ed25519_dalek::SigningKey;
use typed_builder::TypedBuilder;

use crate::{
    block_sync::server::BlockSyncServerConfiguration,
    sumeragi::implementation::SumeragiConfiguration,
    transaction_pool::TransactionPoolConfiguration,
    types::crypto_primitives::Keypair,
};

/// Stores the user-defined parameters required to start a node.
///
/// ## Timeouts
///
/// `round_timeout` is the time a proposer waits for signatures before it expands its validating
/// window, and again after every expansion. `send_timeout` bounds how long a single send may wait for
/// the transport to acknowledge it, and must be strictly shorter than `round_timeout`.
///
/// Durations must be "well below" [u64::MAX] seconds, as they are added to [`Instant`](std::time::Instant)s.
/// A good limit is to cap them at [u32::MAX].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.me(...)`
    - `.round_timeout(...)`

    Optional:
    - `.send_timeout(...)`
    - `.window_expansion_increment(...)`
    - `.max_block_transactions(...)`
    - `.max_pending_transactions(...)`
    - `.transaction_acceptance_window(...)`
    - `.future_timestamp_tolerance(...)`
    - `.allow_empty_blocks(...)`
    - `.sync_request_limit(...)`
    - `.message_poll_interval(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the node's keypair, used to sign blocks. Required."))]
    pub me: SigningKey,
    #[builder(setter(doc = "Set how long a proposer waits for a supermajority before expanding its validating window. Required."))]
    pub round_timeout: Duration,
    #[builder(default = Duration::from_millis(500), setter(doc = "Set how long a single send may wait for acknowledgement. Defaults to 500ms."))]
    pub send_timeout: Duration,
    #[builder(default = 1, setter(doc = "Set by how many peers the validating window grows on every missed deadline. Defaults to 1."))]
    pub window_expansion_increment: usize,
    #[builder(default = 256, setter(doc = "Set the maximum number of transactions in a block. Defaults to 256."))]
    pub max_block_transactions: usize,
    #[builder(default = 4096, setter(doc = "Set the maximum number of transactions waiting in the pool. Defaults to 4096."))]
    pub max_pending_transactions: usize,
    #[builder(default = Duration::from_secs(24 * 60 * 60), setter(doc = "Set how old a transaction's timestamp may be when it is submitted. Defaults to 24 hours."))]
    pub transaction_acceptance_window: Duration,
    #[builder(default = Duration::from_secs(5), setter(doc = "Set how far in the future a transaction's timestamp may be. Defaults to 5 seconds."))]
    pub future_timestamp_tolerance: Duration,
    #[builder(default = false, setter(doc = "Allow blocks without transactions to be assembled and signed. Defaults to false."))]
    pub allow_empty_blocks: bool,
    #[builder(default = 32, setter(doc = "Set the maximum number of blocks requested from, or served to, a peer in one sync message. Defaults to 32."))]
    pub sync_request_limit: u32,
    #[builder(default = Duration::from_millis(10), setter(doc = "Set how long the node's threads wait for a message before checking deadlines again. Defaults to 10ms."))]
    pub message_poll_interval: Duration,
    #[builder(default = true, setter(doc = "Enable logging of events? Defaults to true."))]
    pub log_events: bool,
}

impl Configuration {
    /// Check that the parameters are consistent with each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_timeout.is_zero() {
            return Err(ConfigError::ZeroRoundTimeout);
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::ZeroSendTimeout);
        }
        if self.send_timeout >= self.round_timeout {
            return Err(ConfigError::SendTimeoutNotShorterThanRoundTimeout {
                send_timeout: self.send_timeout,
                round_timeout: self.round_timeout,
            });
        }
        if self.window_expansion_increment == 0 {
            return Err(ConfigError::ZeroWindowExpansionIncrement);
        }
        if self.max_block_transactions == 0 {
            return Err(ConfigError::ZeroLimit("max_block_transactions"));
        }
        if self.max_pending_transactions == 0 {
            return Err(ConfigError::ZeroLimit("max_pending_transactions"));
        }
        if self.sync_request_limit == 0 {
            return Err(ConfigError::ZeroLimit("sync_request_limit"));
        }
        if self.message_poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

impl From<&Configuration> for SumeragiConfiguration {
    fn from(config: &Configuration) -> Self {
        SumeragiConfiguration {
            keypair: Keypair::new(config.me.clone()),
            round_timeout: config.round_timeout,
            send_timeout: config.send_timeout,
            window_expansion_increment: config.window_expansion_increment,
            max_block_transactions: config.max_block_transactions,
            allow_empty_blocks: config.allow_empty_blocks,
            sync_request_limit: config.sync_request_limit,
        }
    }
}

impl From<&Configuration> for TransactionPoolConfiguration {
    fn from(config: &Configuration) -> Self {
        TransactionPoolConfiguration {
            acceptance_window: config.transaction_acceptance_window,
            future_tolerance: config.future_timestamp_tolerance,
            capacity: config.max_pending_transactions,
        }
    }
}

impl From<&Configuration> for BlockSyncServerConfiguration {
    fn from(config: &Configuration) -> Self {
        BlockSyncServerConfiguration {
            request_limit: config.sync_request_limit,
            poll_interval: config.message_poll_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroRoundTimeout,
    ZeroSendTimeout,
    SendTimeoutNotShorterThanRoundTimeout {
        send_timeout: Duration,
        round_timeout: Duration,
    },
    ZeroWindowExpansionIncrement,
    ZeroLimit(&'static str),
    ZeroPollInterval,
}
