/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for structured messages that are sent between peers as part of the block sync protocol.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{block::Block, data_types::BlockHeight};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum BlockSyncMessage {
    BlockSyncRequest(BlockSyncRequest),
    BlockSyncResponse(BlockSyncResponse),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockSyncRequest {
    pub start_height: BlockHeight,
    pub limit: u32,
}

/// Committed blocks, each carrying the signatures it was committed with.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockSyncResponse {
    pub blocks: Vec<Block>,
}

impl BlockSyncResponse {
    pub fn new(blocks: Vec<Block>) -> BlockSyncResponse {
        BlockSyncResponse { blocks }
    }
}
