/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for receiving messages from the P2P network.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Instant,
};

use ed25519_dalek::VerifyingKey;

use crate::{
    block_sync::messages::{BlockSyncMessage, BlockSyncRequest, BlockSyncResponse},
    sumeragi::messages::ConsensusMessage,
};

use super::{messages::Message, network::Network};

/// Spawn the poller thread, which polls the [`Network`] for messages and distributes them into receiver
/// handles.
///
/// The kinds of messages that the poller polls are:
/// 1. Consensus messages (processed by the [algorithm](crate::algorithm) thread),
/// 2. Block sync requests (processed by the [block sync server](crate::block_sync::server)), and
/// 3. Block sync responses (processed by the algorithm thread's block sync client).
///
/// Since the poller forwards messages in the order `recv` returns them, the FIFO order of messages from
/// any single peer is preserved on every channel.
pub(crate) fn start_polling<N: Network + 'static>(
    mut network: N,
    shutdown_signal: Receiver<()>,
) -> (
    JoinHandle<()>,
    Receiver<(VerifyingKey, ConsensusMessage)>,
    Receiver<(VerifyingKey, BlockSyncRequest)>,
    Receiver<(VerifyingKey, BlockSyncResponse)>,
) {
    let (to_consensus_msg_receiver, consensus_msg_receiver) = mpsc::channel();
    let (to_sync_request_receiver, sync_request_receiver) = mpsc::channel();
    let (to_sync_response_receiver, sync_response_receiver) = mpsc::channel();

    let poller_thread = thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("Poller thread disconnected from main thread")
            }
        }

        if let Some((origin, msg)) = network.recv() {
            match msg {
                Message::ConsensusMessage(c_msg) => {
                    let _ = to_consensus_msg_receiver.send((origin, c_msg));
                }
                Message::BlockSyncMessage(s_msg) => match s_msg {
                    BlockSyncMessage::BlockSyncRequest(s_req) => {
                        let _ = to_sync_request_receiver.send((origin, s_req));
                    }
                    BlockSyncMessage::BlockSyncResponse(s_res) => {
                        let _ = to_sync_response_receiver.send((origin, s_res));
                    }
                },
            }
        } else {
            thread::yield_now()
        }
    });

    (
        poller_thread,
        consensus_msg_receiver,
        sync_request_receiver,
        sync_response_receiver,
    )
}

/// A receiving end for consensus messages.
pub(crate) struct ConsensusMessageStub {
    receiver: Receiver<(VerifyingKey, ConsensusMessage)>,
}

impl ConsensusMessageStub {
    pub(crate) fn new(receiver: Receiver<(VerifyingKey, ConsensusMessage)>) -> ConsensusMessageStub {
        ConsensusMessageStub { receiver }
    }

    /// Receive the next consensus message, waiting until `deadline` at the latest.
    pub(crate) fn recv(
        &self,
        deadline: Instant,
    ) -> Result<(VerifyingKey, ConsensusMessage), ReceiveError> {
        let now = Instant::now();
        if now >= deadline {
            return match self.receiver.try_recv() {
                Ok(msg) => Ok(msg),
                Err(TryRecvError::Empty) => Err(ReceiveError::Timeout),
                Err(TryRecvError::Disconnected) => Err(ReceiveError::Disconnected),
            };
        }
        match self.receiver.recv_timeout(deadline - now) {
            Ok(msg) => Ok(msg),
            Err(RecvTimeoutError::Timeout) => Err(ReceiveError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(ReceiveError::Disconnected),
        }
    }
}

/// A receiving end for sync requests. The [`BlockSyncServerStub::recv_request`] method returns the
/// next request if one is available.
pub(crate) struct BlockSyncServerStub {
    requests: Receiver<(VerifyingKey, BlockSyncRequest)>,
}

impl BlockSyncServerStub {
    pub(crate) fn new(requests: Receiver<(VerifyingKey, BlockSyncRequest)>) -> BlockSyncServerStub {
        BlockSyncServerStub { requests }
    }

    pub(crate) fn recv_request(
        &self,
        deadline: Instant,
    ) -> Result<(VerifyingKey, BlockSyncRequest), ReceiveError> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match self.requests.recv_timeout(timeout) {
            Ok(request) => Ok(request),
            Err(RecvTimeoutError::Timeout) => Err(ReceiveError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(ReceiveError::Disconnected),
        }
    }
}

/// A receiving end for sync responses, drained by the algorithm thread between consensus messages.
pub(crate) struct BlockSyncClientStub {
    responses: Receiver<(VerifyingKey, BlockSyncResponse)>,
}

impl BlockSyncClientStub {
    pub(crate) fn new(responses: Receiver<(VerifyingKey, BlockSyncResponse)>) -> BlockSyncClientStub {
        BlockSyncClientStub { responses }
    }

    pub(crate) fn try_recv_response(
        &self,
    ) -> Result<(VerifyingKey, BlockSyncResponse), ReceiveError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(response),
            Err(TryRecvError::Empty) => Err(ReceiveError::Timeout),
            Err(TryRecvError::Disconnected) => Err(ReceiveError::Disconnected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiveError {
    Timeout,
    Disconnected,
}
