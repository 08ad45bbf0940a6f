//! Blockchain implementation
//!
//! The ordered, in-memory block sequence. `blocks[0]` is always the genesis
//! block; every later block links to its predecessor by hash.

use crate::core::block::Block;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Blockchain-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    #[error("Block {0} hash does not match its contents")]
    InvalidHash(u64),
    #[error("Block {0} does not link to its predecessor")]
    BrokenLink(u64),
    #[error("Block {0} merkle root does not match its transactions")]
    InvalidMerkleRoot(u64),
    #[error("Block {0} contains tampered transaction {1}")]
    InvalidTransactionHash(u64, String),
    #[error("Block at position {0} has a mismatched index")]
    InvalidBlockIndex(u64),
    #[error("Chain has no blocks")]
    EmptyChain,
}

/// The main blockchain structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blockchain {
    blocks: Vec<Block>,
}

impl Blockchain {
    /// Create a new blockchain with the genesis block
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Wrap an already ordered block list. The list is not validated here.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, BlockchainError> {
        if blocks.is_empty() {
            return Err(BlockchainError::EmptyChain);
        }
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get the latest block
    pub fn latest_block(&self) -> &Block {
        // never empty: constructors guarantee genesis and pop keeps it
        &self.blocks[self.blocks.len() - 1]
    }

    /// Get a block by index
    pub fn get_block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    /// Get a block by hash
    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == hash)
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get blockchain height (index of the latest block)
    pub fn height(&self) -> u64 {
        self.latest_block().index
    }

    /// Index the next block must carry
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Append a mined block. Linking is checked by `validate`, not here.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Remove the latest block. The genesis block is never removed.
    pub fn pop(&mut self) -> Option<Block> {
        if self.blocks.len() > 1 {
            self.blocks.pop()
        } else {
            None
        }
    }

    /// Validate the entire chain, stopping at the first bad block
    pub fn validate(&self) -> Result<(), BlockchainError> {
        for (position, pair) in self.blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = position as u64 + 1;

            if current.index != index {
                return Err(BlockchainError::InvalidBlockIndex(index));
            }

            if !current.verify_hash() {
                return Err(BlockchainError::InvalidHash(index));
            }

            if current.prev_hash != previous.hash {
                return Err(BlockchainError::BrokenLink(index));
            }

            if let Some(tx) = current.transactions.iter().find(|tx| !tx.verify_hash()) {
                return Err(BlockchainError::InvalidTransactionHash(index, tx.hash.clone()));
            }

            if !current.validate_transactions() {
                return Err(BlockchainError::InvalidMerkleRoot(index));
            }
        }

        Ok(())
    }

    /// Validate the entire chain, logging the first failure
    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Chain validation failed: {}", e);
                false
            }
        }
    }

    /// Balance of `address` from a full scan of every committed transaction
    pub fn balance(&self, address: &str) -> f64 {
        self.blocks
            .iter()
            .flat_map(|block| &block.transactions)
            .fold(0.0, |balance, tx| tx.apply_to_balance(address, balance))
    }

    /// Get chain statistics
    pub fn stats(&self) -> ChainStats {
        let total_transactions: usize = self.blocks.iter().map(|b| b.transactions.len()).sum();

        ChainStats {
            height: self.height(),
            total_blocks: self.blocks.len() as u64,
            total_transactions: total_transactions as u64,
            latest_hash: self.latest_block().hash.clone(),
        }
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

/// Chain statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    pub height: u64,
    pub total_blocks: u64,
    pub total_transactions: u64,
    pub latest_hash: String,
}
