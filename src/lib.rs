//! Chain-Ledger: a single-node ledger integrity engine in Rust
//!
//! This crate provides:
//! - Merkle tree transaction commitment with inclusion proofs
//! - Hash-linked blocks admitted by proof of work
//! - Thread-safe transaction pools with multi-signature and time-lock support
//! - A persistent ledger over SQLite with rollback, recovery and sync
//! - JSON chain snapshots with rotating backups
//!
//! # Example
//!
//! ```rust
//! use chain_ledger::core::{Ledger, LedgerConfig, Transaction};
//! use chain_ledger::storage::SqliteStore;
//!
//! let config = LedgerConfig::default().with_difficulty(2);
//! let store = SqliteStore::open_in_memory().unwrap();
//! let mut ledger = Ledger::open(config, store).unwrap();
//!
//! ledger.add_transaction(Transaction::new("alice", "bob", 10.0, 0.1)).unwrap();
//! let (block, stats) = ledger.mine_pending_transactions().unwrap();
//! println!("Mined block {} in {}ms", block.index, stats.time_ms);
//!
//! assert_eq!(ledger.get_balance("bob"), 10.0);
//! assert!(ledger.is_chain_valid());
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod storage;

// Re-export commonly used types
pub use core::{
    Block, Blockchain, EnhancedTransaction, Ledger, LedgerConfig, LedgerError, Transaction,
};
pub use crypto::{MerkleProof, MerkleTree};
pub use mining::{EnhancedPool, Miner, TransactionPool};
pub use storage::{LedgerStore, SqliteStore};
