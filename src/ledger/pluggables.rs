//! Trait for pluggable chain persistence.

use std::fmt::{self, Display, Formatter};

use crate::types::{
    block::Block,
    crypto_primitives::Signature,
    data_types::BlockHeight,
};

/// Persists finalized blocks and advances chain height.
///
/// Clones must refer to the same underlying chain: the node hands one clone to the consensus core and
/// another to the block sync server.
pub trait CommitSink: Clone + Send + 'static {
    /// Append `block`, finalized by `signatures`, as the new tip of the chain.
    fn append_block(&mut self, block: &Block, signatures: &[Signature]) -> Result<(), CommitError>;

    /// Height of the tip, or `None` if nothing has been committed yet.
    fn height(&self) -> Option<BlockHeight>;

    /// The tip, including the signatures it was committed with.
    fn last_block(&self) -> Option<Block>;

    /// Up to `limit` committed blocks, starting at `height` and in ascending order of height.
    fn blocks_from(&self, height: BlockHeight, limit: u32) -> Vec<Block>;

    /// Height the next committed block must have.
    fn next_height(&self) -> BlockHeight {
        match self.height() {
            Some(height) => height + 1,
            None => BlockHeight::new(0),
        }
    }
}

/// Failure to append a block.
///
/// A `Rejected` append loses the round but leaves the chain intact. A `Corrupted` chain cannot be
/// trusted any more, and takes the node out of consensus until it has resynchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    Rejected(String),
    Corrupted(String),
}

impl CommitError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommitError::Corrupted(_))
    }
}

impl Display for CommitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::Rejected(reason) => write!(f, "append rejected: {}", reason),
            CommitError::Corrupted(reason) => write!(f, "chain state corrupted: {}", reason),
        }
    }
}
