/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The algorithm thread, which drives the [`Sumeragi`] state machine.
//!
//! The thread runs a loop that serializes every input to the state machine, so round state is never
//! touched by two threads at once. Each iteration:
//! 1. Checks for the shutdown signal.
//! 2. Waits for at most one poll interval for a consensus message, and hands it to
//!    [`on_receive_msg`](Sumeragi::on_receive_msg).
//! 3. Hands every block sync response that has arrived to
//!    [`on_receive_sync_response`](Sumeragi::on_receive_sync_response).
//! 4. Calls [`on_tick`](Sumeragi::on_tick) to act on expired deadlines.
//! 5. Calls [`propose`](Sumeragi::propose) to start a round if this node is due to.
//!
//! Errors returned by the state machine are logged here. A fatal error has already taken the node out
//! of consensus by the time it reaches this loop, so the loop carries on and lets block sync bring it
//! back.

use std::{
    sync::mpsc::{Receiver, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    ledger::CommitSink,
    networking::{
        network::Network,
        receiving::{BlockSyncClientStub, ConsensusMessageStub, ReceiveError},
    },
    sumeragi::{Sumeragi, SumeragiError},
};

pub(crate) struct Algorithm<N: Network + 'static, S: CommitSink> {
    sumeragi: Sumeragi<N, S>,
    consensus_msgs: ConsensusMessageStub,
    block_sync_responses: BlockSyncClientStub,
    poll_interval: Duration,
    shutdown_signal: Receiver<()>,
}

impl<N: Network + 'static, S: CommitSink> Algorithm<N, S> {
    pub(crate) fn new(
        sumeragi: Sumeragi<N, S>,
        consensus_msgs: ConsensusMessageStub,
        block_sync_responses: BlockSyncClientStub,
        poll_interval: Duration,
        shutdown_signal: Receiver<()>,
    ) -> Self {
        Self {
            sumeragi,
            consensus_msgs,
            block_sync_responses,
            poll_interval,
            shutdown_signal,
        }
    }

    pub(crate) fn start(mut self) -> JoinHandle<()> {
        thread::spawn(move || loop {
            match self.shutdown_signal.try_recv() {
                Ok(()) => return,
                Err(TryRecvError::Empty) => (),
                Err(TryRecvError::Disconnected) => {
                    panic!("Algorithm thread disconnected from main thread")
                }
            }

            self.execute_iteration();
        })
    }

    fn execute_iteration(&mut self) {
        // 1. Consensus messages.
        match self
            .consensus_msgs
            .recv(Instant::now() + self.poll_interval)
        {
            Ok((origin, msg)) => log_error(self.sumeragi.on_receive_msg(origin, msg)),
            Err(ReceiveError::Timeout) => (),
            Err(ReceiveError::Disconnected) => thread::sleep(self.poll_interval),
        }

        // 2. Block sync responses.
        while let Ok((origin, response)) = self.block_sync_responses.try_recv_response() {
            log_error(self.sumeragi.on_receive_sync_response(origin, response));
        }

        // 3. Deadlines.
        log_error(self.sumeragi.on_tick());

        // 4. New rounds.
        log_error(self.sumeragi.propose().map(|_| ()));
    }
}

fn log_error(result: Result<(), SumeragiError>) {
    match result {
        Ok(()) => (),
        Err(SumeragiError::Recoverable(reason)) => log::warn!("Round lost: {}", reason),
        Err(SumeragiError::Fatal(err)) => log::error!("Node left consensus: {}", err),
    }
}
