/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The event bus thread, which fires the handlers registered for each [event](crate::events).
//!
//! Handlers are run one at a time in the order events were published, on a thread of their own, so a
//! slow handler delays other handlers but never the consensus core.

use crate::events::*;
use crate::logging::Logger;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

pub(crate) struct EventHandlers {
    pub(crate) commit_block_handlers: Vec<HandlerPtr<CommitBlockEvent>>,
    pub(crate) propose_handlers: Vec<HandlerPtr<ProposeEvent>>,
    pub(crate) sign_block_handlers: Vec<HandlerPtr<SignBlockEvent>>,
    pub(crate) receive_signature_handlers: Vec<HandlerPtr<ReceiveSignatureEvent>>,
    pub(crate) receive_commit_handlers: Vec<HandlerPtr<ReceiveCommitEvent>>,
    pub(crate) expand_window_handlers: Vec<HandlerPtr<ExpandWindowEvent>>,
    pub(crate) stop_round_handlers: Vec<HandlerPtr<StopRoundEvent>>,
    pub(crate) submit_transaction_handlers: Vec<HandlerPtr<SubmitTransactionEvent>>,
    pub(crate) node_inactive_handlers: Vec<HandlerPtr<NodeInactiveEvent>>,
    pub(crate) start_sync_handlers: Vec<HandlerPtr<StartSyncEvent>>,
    pub(crate) end_sync_handlers: Vec<HandlerPtr<EndSyncEvent>>,
}

/// The optional handler a user registered for each event type.
#[derive(Default)]
pub(crate) struct UserHandlers {
    pub(crate) on_commit_block: Option<HandlerPtr<CommitBlockEvent>>,
    pub(crate) on_propose: Option<HandlerPtr<ProposeEvent>>,
    pub(crate) on_sign_block: Option<HandlerPtr<SignBlockEvent>>,
    pub(crate) on_receive_signature: Option<HandlerPtr<ReceiveSignatureEvent>>,
    pub(crate) on_receive_commit: Option<HandlerPtr<ReceiveCommitEvent>>,
    pub(crate) on_expand_window: Option<HandlerPtr<ExpandWindowEvent>>,
    pub(crate) on_stop_round: Option<HandlerPtr<StopRoundEvent>>,
    pub(crate) on_submit_transaction: Option<HandlerPtr<SubmitTransactionEvent>>,
    pub(crate) on_node_inactive: Option<HandlerPtr<NodeInactiveEvent>>,
    pub(crate) on_start_sync: Option<HandlerPtr<StartSyncEvent>>,
    pub(crate) on_end_sync: Option<HandlerPtr<EndSyncEvent>>,
}

impl EventHandlers {
    /// Collect the handlers for every event type: the default logger first if `log_events`, then the
    /// user's handler if one was registered.
    pub(crate) fn new(log_events: bool, user_handlers: UserHandlers) -> EventHandlers {
        fn handlers_for<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
            let mut handlers = Vec::new();
            if log_events {
                handlers.push(T::get_logger());
            }
            handlers.extend(user_handler);
            handlers
        }

        EventHandlers {
            commit_block_handlers: handlers_for(log_events, user_handlers.on_commit_block),
            propose_handlers: handlers_for(log_events, user_handlers.on_propose),
            sign_block_handlers: handlers_for(log_events, user_handlers.on_sign_block),
            receive_signature_handlers: handlers_for(log_events, user_handlers.on_receive_signature),
            receive_commit_handlers: handlers_for(log_events, user_handlers.on_receive_commit),
            expand_window_handlers: handlers_for(log_events, user_handlers.on_expand_window),
            stop_round_handlers: handlers_for(log_events, user_handlers.on_stop_round),
            submit_transaction_handlers: handlers_for(log_events, user_handlers.on_submit_transaction),
            node_inactive_handlers: handlers_for(log_events, user_handlers.on_node_inactive),
            start_sync_handlers: handlers_for(log_events, user_handlers.on_start_sync),
            end_sync_handlers: handlers_for(log_events, user_handlers.on_end_sync),
        }
    }

    /// Whether no handler at all is registered, in which case the event bus thread is not started.
    pub(crate) fn is_empty(&self) -> bool {
        self.commit_block_handlers.is_empty()
            && self.propose_handlers.is_empty()
            && self.sign_block_handlers.is_empty()
            && self.receive_signature_handlers.is_empty()
            && self.receive_commit_handlers.is_empty()
            && self.expand_window_handlers.is_empty()
            && self.stop_round_handlers.is_empty()
            && self.submit_transaction_handlers.is_empty()
            && self.node_inactive_handlers.is_empty()
            && self.start_sync_handlers.is_empty()
            && self.end_sync_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::CommitBlock(commit_block_event) =>
                self.commit_block_handlers.iter().for_each(|handler| handler(&commit_block_event)),

            Event::Propose(propose_event) =>
                self.propose_handlers.iter().for_each(|handler| handler(&propose_event)),

            Event::SignBlock(sign_block_event) =>
                self.sign_block_handlers.iter().for_each(|handler| handler(&sign_block_event)),

            Event::ReceiveSignature(receive_signature_event) =>
                self.receive_signature_handlers.iter().for_each(|handler| handler(&receive_signature_event)),

            Event::ReceiveCommit(receive_commit_event) =>
                self.receive_commit_handlers.iter().for_each(|handler| handler(&receive_commit_event)),

            Event::ExpandWindow(expand_window_event) =>
                self.expand_window_handlers.iter().for_each(|handler| handler(&expand_window_event)),

            Event::StopRound(stop_round_event) =>
                self.stop_round_handlers.iter().for_each(|handler| handler(&stop_round_event)),

            Event::SubmitTransaction(submit_transaction_event) =>
                self.submit_transaction_handlers.iter().for_each(|handler| handler(&submit_transaction_event)),

            Event::NodeInactive(node_inactive_event) =>
                self.node_inactive_handlers.iter().for_each(|handler| handler(&node_inactive_event)),

            Event::StartSync(start_sync_event) =>
                self.start_sync_handlers.iter().for_each(|handler| handler(&start_sync_event)),

            Event::EndSync(end_sync_event) =>
                self.end_sync_handlers.iter().for_each(|handler| handler(&end_sync_event)),
        }
    }
}

pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("event_bus thread disconnected from main thread")
            }
        }

        match event_subscriber.recv_timeout(poll_interval) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            // Every publisher is gone. Wait for the shutdown signal.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(poll_interval),
        }
    })
}
