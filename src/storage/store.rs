//! Durable storage interface
//!
//! The ledger keeps its in-memory chain authoritative and mirrors every
//! committed block into a [`LedgerStore`]. A store must persist a block and
//! its derived rows (transactions, balance index, chain state) as one unit.

use crate::core::block::Block;
use serde::Serialize;
use std::io;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Aggregate figures maintained by the store alongside the blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    /// Hash of the latest stored block, empty when nothing is stored
    pub latest_block_hash: String,
    pub latest_block_index: u64,
    pub total_blocks: u64,
    pub total_transactions: u64,
    /// Addresses present in the balance index
    pub total_addresses: u64,
    /// Unix time of the last write
    pub last_updated: i64,
}

/// Row-oriented persistence for committed blocks
pub trait LedgerStore: Send + Sync {
    /// Persist a block with all derived rows atomically
    fn save_block(&self, block: &Block) -> Result<(), StorageError>;

    /// Every stored block in index order
    fn load_full_chain(&self) -> Result<Vec<Block>, StorageError>;

    fn latest_block(&self) -> Result<Option<Block>, StorageError>;

    fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, StorageError>;

    fn block_by_index(&self, index: u64) -> Result<Option<Block>, StorageError>;

    /// Indexed balance; unknown addresses have balance 0
    fn address_balance(&self, address: &str) -> Result<f64, StorageError>;

    fn aggregate_stats(&self) -> Result<StoreStats, StorageError>;
}
