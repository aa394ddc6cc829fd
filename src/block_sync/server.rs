/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Implements the [`BlockSyncServer`], which answers block sync requests from lagging peers.
//!
//! The server runs on its own thread with its own clone of the [`CommitSink`], so serving sync
//! requests never delays the consensus core. It responds to each request with up to `limit` committed
//! blocks starting from the requested height, where `limit` is the smaller of the requester's limit and
//! the server's own configured limit.

use std::{
    sync::mpsc::{Receiver, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    ledger::CommitSink,
    networking::{
        network::Network,
        receiving::{BlockSyncServerStub, ReceiveError},
        sending::RingBroadcaster,
    },
};

use super::messages::{BlockSyncRequest, BlockSyncResponse};

pub(crate) struct BlockSyncServer<N: Network + 'static, S: CommitSink> {
    config: BlockSyncServerConfiguration,
    commit_sink: S,
    receiver: BlockSyncServerStub,
    sender: RingBroadcaster<N>,
    shutdown_signal: Receiver<()>,
}

/// Immutable parameters that define the behaviour of the [`BlockSyncServer`].
#[derive(Clone, Copy)]
pub(crate) struct BlockSyncServerConfiguration {
    pub(crate) request_limit: u32,
    pub(crate) poll_interval: Duration,
}

impl<N: Network + 'static, S: CommitSink> BlockSyncServer<N, S> {
    pub(crate) fn new(
        config: BlockSyncServerConfiguration,
        commit_sink: S,
        receiver: BlockSyncServerStub,
        sender: RingBroadcaster<N>,
        shutdown_signal: Receiver<()>,
    ) -> Self {
        Self {
            config,
            commit_sink,
            receiver,
            sender,
            shutdown_signal,
        }
    }

    pub(crate) fn start(mut self) -> JoinHandle<()> {
        thread::spawn(move || loop {
            match self.shutdown_signal.try_recv() {
                Ok(()) => return,
                Err(TryRecvError::Empty) => (),
                Err(TryRecvError::Disconnected) => {
                    panic!("Block sync server thread disconnected from main thread")
                }
            }

            match self
                .receiver
                .recv_request(Instant::now() + self.config.poll_interval)
            {
                Ok((origin, request)) => {
                    let response = serve(&self.commit_sink, &request, self.config.request_limit);
                    log::debug!(
                        "Serving {} blocks from height {} to a sync request",
                        response.blocks.len(),
                        request.start_height
                    );
                    self.sender.unicast(origin, response);
                }
                Err(ReceiveError::Timeout) => (),
                // The poller is gone, so no more requests will come. Wait for the shutdown signal.
                Err(ReceiveError::Disconnected) => thread::sleep(self.config.poll_interval),
            }
        })
    }
}

/// Build the response to `request` from the blocks committed in `commit_sink`.
pub(crate) fn serve<S: CommitSink>(
    commit_sink: &S,
    request: &BlockSyncRequest,
    server_limit: u32,
) -> BlockSyncResponse {
    let limit = request.limit.min(server_limit);
    BlockSyncResponse::new(commit_sink.blocks_from(request.start_height, limit))
}
