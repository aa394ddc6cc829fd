use std::sync::{Arc, Mutex};

use sumeragi::{
    ledger::{CommitError, CommitSink, InMemoryLedger},
    types::{block::Block, crypto_primitives::Signature, data_types::BlockHeight},
};

/// An [`InMemoryLedger`] whose next append can be made to fail.
#[derive(Clone)]
pub(crate) struct TestLedger {
    inner: InMemoryLedger,
    next_failure: Arc<Mutex<Option<CommitError>>>,
    appends: Arc<Mutex<usize>>,
}

impl TestLedger {
    pub(crate) fn new() -> TestLedger {
        TestLedger {
            inner: InMemoryLedger::new(16, 4).unwrap(),
            next_failure: Arc::new(Mutex::new(None)),
            appends: Arc::new(Mutex::new(0)),
        }
    }

    pub(crate) fn fail_next_append(&self, error: CommitError) {
        *self.next_failure.lock().unwrap() = Some(error);
    }

    /// Number of calls to `append_block`, successful or not.
    pub(crate) fn appends(&self) -> usize {
        *self.appends.lock().unwrap()
    }

    pub(crate) fn blocks(&self) -> Vec<Block> {
        self.inner.blocks()
    }
}

impl CommitSink for TestLedger {
    fn append_block(&mut self, block: &Block, signatures: &[Signature]) -> Result<(), CommitError> {
        *self.appends.lock().unwrap() += 1;
        if let Some(error) = self.next_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.inner.append_block(block, signatures)
    }

    fn height(&self) -> Option<BlockHeight> {
        self.inner.height()
    }

    fn last_block(&self) -> Option<Block> {
        self.inner.last_block()
    }

    fn blocks_from(&self, height: BlockHeight, limit: u32) -> Vec<Block> {
        self.inner.blocks_from(height, limit)
    }
}
