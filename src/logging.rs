/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the node's
//! [config](crate::config::Configuration).
//!
//! Sumeragi logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [ReceiveSignature](crate::events::ReceiveSignatureEvent) is printed:
//!
//! ```text
//! ReceiveSignature, 1701329264, Id5u7f6, fNGCJyk, Accepted
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the public key of the
//!   peer the signature came from.
//! - The fourth value is the first seven characters of the Base64 encoding of the hash of the signed
//!   block.
//! - The fifth value is how the signature was classified.

use crate::events::*;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log;
use std::time::SystemTime;

// Names of each event in PascalCase for printing:
pub const COMMIT_BLOCK: &str = "CommitBlock";

pub const PROPOSE: &str = "Propose";
pub const SIGN_BLOCK: &str = "SignBlock";

pub const RECEIVE_SIGNATURE: &str = "ReceiveSignature";
pub const RECEIVE_COMMIT: &str = "ReceiveCommit";

pub const EXPAND_WINDOW: &str = "ExpandWindow";
pub const STOP_ROUND: &str = "StopRound";

pub const SUBMIT_TRANSACTION: &str = "SubmitTransaction";
pub const NODE_INACTIVE: &str = "NodeInactive";

pub const START_SYNC: &str = "StartSync";
pub const END_SYNC: &str = "EndSync";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for CommitBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |commit_block_event: &CommitBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                COMMIT_BLOCK,
                secs_since_unix_epoch(commit_block_event.timestamp),
                first_seven_base64_chars(&commit_block_event.block.bytes()),
                commit_block_event.height,
                commit_block_event.signatures
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProposeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |propose_event: &ProposeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                PROPOSE,
                secs_since_unix_epoch(propose_event.timestamp),
                first_seven_base64_chars(&propose_event.block.bytes()),
                propose_event.height,
                propose_event.transactions,
                propose_event.window_end
            )
        };
        Box::new(logger)
    }
}

impl Logger for SignBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |sign_block_event: &SignBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                SIGN_BLOCK,
                secs_since_unix_epoch(sign_block_event.timestamp),
                first_seven_base64_chars(&sign_block_event.proposer.to_bytes()),
                first_seven_base64_chars(&sign_block_event.block.bytes()),
                sign_block_event.height
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveSignatureEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_signature_event: &ReceiveSignatureEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}",
                RECEIVE_SIGNATURE,
                secs_since_unix_epoch(receive_signature_event.timestamp),
                first_seven_base64_chars(&receive_signature_event.origin.to_bytes()),
                first_seven_base64_chars(&receive_signature_event.block.bytes()),
                receive_signature_event.classification
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveCommitEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_commit_event: &ReceiveCommitEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                RECEIVE_COMMIT,
                secs_since_unix_epoch(receive_commit_event.timestamp),
                first_seven_base64_chars(&receive_commit_event.origin.to_bytes()),
                first_seven_base64_chars(&receive_commit_event.block.bytes()),
                receive_commit_event.height
            )
        };
        Box::new(logger)
    }
}

impl Logger for ExpandWindowEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |expand_window_event: &ExpandWindowEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                EXPAND_WINDOW,
                secs_since_unix_epoch(expand_window_event.timestamp),
                first_seven_base64_chars(&expand_window_event.block.bytes()),
                expand_window_event.window_end,
                expand_window_event.ring_len
            )
        };
        Box::new(logger)
    }
}

impl Logger for StopRoundEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |stop_round_event: &StopRoundEvent| {
            log::warn!(
                "{}, {}, {}, {}, {}",
                STOP_ROUND,
                secs_since_unix_epoch(stop_round_event.timestamp),
                first_seven_base64_chars(&stop_round_event.block.bytes()),
                stop_round_event.height,
                stop_round_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for SubmitTransactionEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |submit_transaction_event: &SubmitTransactionEvent| {
            log::info!(
                "{}, {}, {}, {}",
                SUBMIT_TRANSACTION,
                secs_since_unix_epoch(submit_transaction_event.timestamp),
                first_seven_base64_chars(&submit_transaction_event.transaction.bytes()),
                match submit_transaction_event.rejection {
                    Some(rejection) => format!("{:?}", rejection),
                    None => String::from("Accepted"),
                }
            )
        };
        Box::new(logger)
    }
}

impl Logger for NodeInactiveEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |node_inactive_event: &NodeInactiveEvent| {
            log::error!(
                "{}, {}, {}",
                NODE_INACTIVE,
                secs_since_unix_epoch(node_inactive_event.timestamp),
                node_inactive_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for StartSyncEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |start_sync_event: &StartSyncEvent| {
            log::info!(
                "{}, {}, {}, {}",
                START_SYNC,
                secs_since_unix_epoch(start_sync_event.timestamp),
                first_seven_base64_chars(&start_sync_event.peer.to_bytes()),
                start_sync_event.start_height
            )
        };
        Box::new(logger)
    }
}

impl Logger for EndSyncEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |end_sync_event: &EndSyncEvent| {
            log::info!(
                "{}, {}, {}, {}",
                END_SYNC,
                secs_since_unix_epoch(end_sync_event.timestamp),
                first_seven_base64_chars(&end_sync_event.peer.to_bytes()),
                end_sync_event.blocks_synced
            )
        };
        Box::new(logger)
    }
}

pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Events are stamped with SystemTime::now(), so a time before the epoch means a misconfigured host
// clock. Log 0 rather than bringing down the event bus.
fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
